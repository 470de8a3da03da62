//! Typed game events, queued per kind until delivery.
//!
//! Engines push [`GameEvent`]s while a poll or an action runs; the
//! [`EventBus`] buffers them per kind and hands them to passive listeners
//! (UI notifications, sound cues, analytics) when [`EventBus::deliver`] is
//! called.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::crop::CropKind;
use crate::fixed::Millis;
use crate::id::{BuildingId, LoanId, OfferId, PlayerId, ProcessId};
use crate::resource::Resource;
use std::collections::VecDeque;
use township_spatial::GridPosition;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Something that happened in the town.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    // -- Placement and construction --
    BuildingPlaced {
        building: BuildingId,
        owner: PlayerId,
        at: Millis,
    },
    FarmlandPlaced {
        farm: BuildingId,
        tiles: u32,
        at: Millis,
    },
    /// `tile` is set for a farmland tile of the farm `building`.
    ConstructionCompleted {
        building: BuildingId,
        tile: Option<GridPosition>,
        at: Millis,
    },
    DemolitionStarted {
        building: BuildingId,
        tile: Option<GridPosition>,
        at: Millis,
    },
    DemolitionCompleted {
        building: BuildingId,
        tile: Option<GridPosition>,
        at: Millis,
    },

    // -- Farming and production --
    CropReady {
        farm: BuildingId,
        position: GridPosition,
        crop: CropKind,
    },
    ProcessStarted {
        process: ProcessId,
        building: BuildingId,
        quantity: u32,
    },
    ProcessCompleted {
        process: ProcessId,
        building: BuildingId,
        output: Resource,
        quantity: u32,
    },

    // -- Economy --
    TickSettled {
        at: Millis,
        rent_paid: u64,
        salaries_paid: u64,
        rents_skipped: u32,
    },
    RentSkipped {
        house: BuildingId,
        tenant: PlayerId,
    },
    EmploymentChanged {
        player: PlayerId,
        workplace: Option<BuildingId>,
    },
    HomeChanged {
        player: PlayerId,
        home: Option<BuildingId>,
    },

    // -- Market and bank --
    OfferCreated {
        offer: OfferId,
        seller: PlayerId,
    },
    OfferAccepted {
        offer: OfferId,
        buyer: PlayerId,
    },
    OfferCancelled {
        offer: OfferId,
    },
    LoanIssued {
        loan: LoanId,
        borrower: PlayerId,
        amount: u64,
    },
    LoanSettled {
        loan: LoanId,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BuildingPlaced,
    FarmlandPlaced,
    ConstructionCompleted,
    DemolitionStarted,
    DemolitionCompleted,
    CropReady,
    ProcessStarted,
    ProcessCompleted,
    TickSettled,
    RentSkipped,
    EmploymentChanged,
    HomeChanged,
    OfferCreated,
    OfferAccepted,
    OfferCancelled,
    LoanIssued,
    LoanSettled,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 17;

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::BuildingPlaced { .. } => EventKind::BuildingPlaced,
            GameEvent::FarmlandPlaced { .. } => EventKind::FarmlandPlaced,
            GameEvent::ConstructionCompleted { .. } => EventKind::ConstructionCompleted,
            GameEvent::DemolitionStarted { .. } => EventKind::DemolitionStarted,
            GameEvent::DemolitionCompleted { .. } => EventKind::DemolitionCompleted,
            GameEvent::CropReady { .. } => EventKind::CropReady,
            GameEvent::ProcessStarted { .. } => EventKind::ProcessStarted,
            GameEvent::ProcessCompleted { .. } => EventKind::ProcessCompleted,
            GameEvent::TickSettled { .. } => EventKind::TickSettled,
            GameEvent::RentSkipped { .. } => EventKind::RentSkipped,
            GameEvent::EmploymentChanged { .. } => EventKind::EmploymentChanged,
            GameEvent::HomeChanged { .. } => EventKind::HomeChanged,
            GameEvent::OfferCreated { .. } => EventKind::OfferCreated,
            GameEvent::OfferAccepted { .. } => EventKind::OfferAccepted,
            GameEvent::OfferCancelled { .. } => EventKind::OfferCancelled,
            GameEvent::LoanIssued { .. } => EventKind::LoanIssued,
            GameEvent::LoanSettled { .. } => EventKind::LoanSettled,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventLog: bounded per-kind queue
// ---------------------------------------------------------------------------

/// Undelivered events of one kind, oldest first. Holds at most `limit`
/// events; a burst beyond that (a large drag, a busy tick) keeps the newest.
#[derive(Debug)]
pub struct EventLog {
    pending: VecDeque<GameEvent>,
    limit: usize,
    emitted: u64,
}

impl EventLog {
    /// A limit of 0 is raised to 1.
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            pending: VecDeque::with_capacity(limit.min(64)),
            limit,
            emitted: 0,
        }
    }

    pub fn record(&mut self, event: GameEvent) {
        if self.pending.len() == self.limit {
            self.pending.pop_front();
        }
        self.pending.push_back(event);
        self.emitted += 1;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Events ever recorded, delivered or not.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &GameEvent> + '_ {
        self.pending.iter()
    }

    fn take_pending(&mut self) -> VecDeque<GameEvent> {
        std::mem::take(&mut self.pending)
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&GameEvent)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&GameEvent) -> bool>;

/// Priority level for listeners. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct ListenerEntry {
    listener: PassiveListener,
    priority: ListenerPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("priority", &self.priority)
            .field("filtered", &self.filter.is_some())
            .field("insertion_order", &self.insertion_order)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One event log per kind, listener lists, and suppression flags.
pub struct EventBus {
    logs: [Option<EventLog>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    default_capacity: usize,
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("logs", &self.logs)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a bus keeping at most `default_capacity` undelivered events
    /// per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            logs: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: std::array::from_fn(|_| Vec::new()),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Suppressed kinds are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.logs[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-op if its kind is suppressed.
    pub fn emit(&mut self, event: GameEvent) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let limit = self.default_capacity;
        self.logs[idx]
            .get_or_insert_with(|| EventLog::with_limit(limit))
            .record(event);
    }

    pub fn emit_all(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Register a listener with Normal priority and no filter.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, ListenerPriority::Normal, None, listener);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: ListenerPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        let list = &mut self.listeners[kind.index()];
        list.push(ListenerEntry {
            listener,
            priority,
            filter,
            insertion_order: order,
        });
        list.sort_by_key(|entry| (entry.priority, entry.insertion_order));
    }

    /// Hand every pending event to its listeners, oldest first. Delivered
    /// events leave the logs; the emitted counts stay.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(log) = self.logs[idx].as_mut() else {
                continue;
            };
            if log.is_empty() {
                continue;
            }
            let events = log.take_pending();

            for entry in &mut self.listeners[idx] {
                for event in &events {
                    if let Some(ref filter) = entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }
        }
    }

    pub fn log(&self, kind: EventKind) -> Option<&EventLog> {
        self.logs[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.log(kind).map_or(0, EventLog::len)
    }

    /// Events ever emitted for a kind, including ones already delivered or
    /// pushed out by newer ones.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.log(kind).map_or(0, EventLog::emitted)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn offer_id() -> OfferId {
        SlotMap::<OfferId, ()>::with_key().insert(())
    }

    fn settled(at: Millis) -> GameEvent {
        GameEvent::TickSettled {
            at,
            rent_paid: 0,
            salaries_paid: 0,
            rents_skipped: 0,
        }
    }

    fn settled_at(event: &GameEvent) -> Millis {
        match event {
            GameEvent::TickSettled { at, .. } => *at,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn log_keeps_the_newest_events_of_a_burst() {
        let mut log = EventLog::with_limit(3);
        for at in 0..5 {
            log.record(settled(at));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.emitted(), 5);
        let ats: Vec<Millis> = log.iter().map(settled_at).collect();
        assert_eq!(ats, vec![2, 3, 4]);
    }

    #[test]
    fn zero_limit_still_keeps_the_latest() {
        let mut log = EventLog::with_limit(0);
        log.record(settled(1));
        log.record(settled(2));
        assert_eq!(log.iter().map(settled_at).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn suppressed_kind_is_not_buffered() {
        let mut bus = EventBus::new(4);
        bus.suppress(EventKind::TickSettled);
        bus.emit(settled(0));
        assert!(bus.log(EventKind::TickSettled).is_none());
        assert_eq!(bus.total_emitted(EventKind::TickSettled), 0);
        assert!(bus.is_suppressed(EventKind::TickSettled));
    }

    #[test]
    fn kinds_are_independent() {
        let mut bus = EventBus::new(4);
        bus.emit(settled(0));
        bus.emit(GameEvent::OfferCancelled { offer: offer_id() });
        assert_eq!(bus.buffered_count(EventKind::TickSettled), 1);
        assert_eq!(bus.buffered_count(EventKind::OfferCancelled), 1);
        assert_eq!(bus.buffered_count(EventKind::LoanIssued), 0);
    }

    #[test]
    fn deliver_runs_listeners_and_clears() {
        let mut bus = EventBus::new(4);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        bus.on_passive(
            EventKind::TickSettled,
            Box::new(move |e| s.borrow_mut().push(e.clone())),
        );
        bus.emit(settled(7));
        bus.deliver();

        assert_eq!(*seen.borrow(), vec![settled(7)]);
        assert_eq!(bus.buffered_count(EventKind::TickSettled), 0);
        assert_eq!(bus.total_emitted(EventKind::TickSettled), 1);

        bus.deliver();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn priorities_order_listeners() {
        let mut bus = EventBus::new(4);
        let order = Rc::new(RefCell::new(Vec::new()));
        for (priority, name) in [
            (ListenerPriority::Post, "post"),
            (ListenerPriority::Normal, "normal"),
            (ListenerPriority::Pre, "pre"),
        ] {
            let o = order.clone();
            bus.on_passive_filtered(
                EventKind::TickSettled,
                priority,
                None,
                Box::new(move |_| o.borrow_mut().push(name)),
            );
        }
        bus.emit(settled(0));
        bus.deliver();
        assert_eq!(*order.borrow(), vec!["pre", "normal", "post"]);
    }

    #[test]
    fn filter_blocks_non_matching() {
        let mut bus = EventBus::new(8);
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let late: EventFilter =
            Box::new(|e: &GameEvent| matches!(e, GameEvent::TickSettled { at, .. } if *at >= 10));
        bus.on_passive_filtered(
            EventKind::TickSettled,
            ListenerPriority::Normal,
            Some(late),
            Box::new(move |_| *c.borrow_mut() += 1),
        );
        bus.emit(settled(5));
        bus.emit(settled(10));
        bus.emit(settled(20));
        bus.deliver();
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn kind_count_matches_enum() {
        assert_eq!(EventKind::LoanSettled as usize + 1, EVENT_KIND_COUNT);
    }
}
