//! Placement mode: ghost previews and cancellable drags.
//!
//! A [`PlacementSession`] tracks what the player is about to place. Nothing
//! here touches the world; the session only produces a
//! [`PlacementRequest`] when the player confirms, and [`PlacementSession::cancel`]
//! discards every in-progress ghost or drag.

use crate::drag::tiles_in_drag;
use crate::{BuildingFootprint, GridPosition, Rotation};
use serde::{Deserialize, Serialize};

/// The state of a placement session. `T` is the caller's tool type
/// (building definition, road, farmland...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementMode<T> {
    /// Not placing anything.
    Idle,
    /// A single footprint follows the cursor.
    Single {
        tool: T,
        footprint: BuildingFootprint,
        rotation: Rotation,
        hover: Option<GridPosition>,
    },
    /// A drag tool is selected but the button is not held.
    DragArmed { tool: T, hover: Option<GridPosition> },
    /// A drag is in progress between `start` and `current`.
    Dragging {
        tool: T,
        start: GridPosition,
        current: GridPosition,
    },
}

/// A confirmed placement, handed to the simulation for validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementRequest<T> {
    Single {
        tool: T,
        origin: GridPosition,
        rotation: Rotation,
    },
    Drag {
        tool: T,
        start: GridPosition,
        end: GridPosition,
    },
}

/// One cell of a ghost preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostCell {
    pub position: GridPosition,
    pub valid: bool,
}

/// The cells a pending placement would cover, each flagged for validity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GhostPreview {
    pub cells: Vec<GhostCell>,
}

impl GhostPreview {
    /// True when every cell is valid.
    pub fn all_valid(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|c| c.valid)
    }

    pub fn valid_count(&self) -> usize {
        self.cells.iter().filter(|c| c.valid).count()
    }
}

/// Holds the placement mode between input events.
#[derive(Debug, Clone)]
pub struct PlacementSession<T> {
    mode: PlacementMode<T>,
}

impl<T> Default for PlacementSession<T> {
    fn default() -> Self {
        Self {
            mode: PlacementMode::Idle,
        }
    }
}

impl<T: Clone> PlacementSession<T> {
    pub fn new() -> Self {
        Self {
            mode: PlacementMode::Idle,
        }
    }

    pub fn mode(&self) -> &PlacementMode<T> {
        &self.mode
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.mode, PlacementMode::Idle)
    }

    /// Select a single-footprint tool.
    pub fn select(&mut self, tool: T, footprint: BuildingFootprint) {
        self.mode = PlacementMode::Single {
            tool,
            footprint,
            rotation: Rotation::None,
            hover: None,
        };
    }

    /// Select a drag tool (roads, farmland).
    pub fn select_drag(&mut self, tool: T) {
        self.mode = PlacementMode::DragArmed { tool, hover: None };
    }

    /// Rotate the ghost of a single-footprint tool. No-op otherwise.
    pub fn rotate(&mut self) {
        if let PlacementMode::Single { rotation, .. } = &mut self.mode {
            *rotation = rotation.rotate_cw();
        }
    }

    /// Move the cursor.
    pub fn hover(&mut self, pos: GridPosition) {
        match &mut self.mode {
            PlacementMode::Idle => {}
            PlacementMode::Single { hover, .. } | PlacementMode::DragArmed { hover, .. } => {
                *hover = Some(pos);
            }
            PlacementMode::Dragging { current, .. } => *current = pos,
        }
    }

    /// Press at `pos`. Starts a drag for drag tools; confirms a single
    /// placement immediately.
    pub fn press(&mut self, pos: GridPosition) -> Option<PlacementRequest<T>> {
        match &self.mode {
            PlacementMode::Single { tool, rotation, .. } => Some(PlacementRequest::Single {
                tool: tool.clone(),
                origin: pos,
                rotation: *rotation,
            }),
            PlacementMode::DragArmed { tool, .. } => {
                self.mode = PlacementMode::Dragging {
                    tool: tool.clone(),
                    start: pos,
                    current: pos,
                };
                None
            }
            PlacementMode::Idle | PlacementMode::Dragging { .. } => None,
        }
    }

    /// Release at `pos`. Ends a drag and returns its request; the tool stays
    /// selected for the next drag.
    pub fn release(&mut self, pos: GridPosition) -> Option<PlacementRequest<T>> {
        let PlacementMode::Dragging { tool, start, .. } = &self.mode else {
            return None;
        };
        let request = PlacementRequest::Drag {
            tool: tool.clone(),
            start: *start,
            end: pos,
        };
        self.mode = PlacementMode::DragArmed {
            tool: tool.clone(),
            hover: Some(pos),
        };
        Some(request)
    }

    /// Leave placement mode, discarding any ghost or drag in progress.
    pub fn cancel(&mut self) {
        self.mode = PlacementMode::Idle;
    }

    /// Ghost cells for the current mode. `is_valid` decides per cell.
    pub fn ghost<F>(&self, is_valid: F) -> GhostPreview
    where
        F: Fn(GridPosition) -> bool,
    {
        let positions: Vec<GridPosition> = match &self.mode {
            PlacementMode::Idle => Vec::new(),
            PlacementMode::Single {
                footprint,
                rotation,
                hover,
                ..
            } => match hover {
                Some(origin) => footprint.rotated(*rotation).tiles(*origin).collect(),
                None => Vec::new(),
            },
            PlacementMode::DragArmed { hover, .. } => hover.iter().copied().collect(),
            PlacementMode::Dragging { start, current, .. } => {
                tiles_in_drag(*start, *current).unwrap_or_default()
            }
        };

        GhostPreview {
            cells: positions
                .into_iter()
                .map(|position| GhostCell {
                    position,
                    valid: is_valid(position),
                })
                .collect(),
        }
    }
}
