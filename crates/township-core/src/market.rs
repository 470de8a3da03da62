//! Peer-to-peer barter offers.
//!
//! Offers hold nothing in escrow: the seller's holdings are checked when the
//! offer is made and again when it is accepted.

use crate::error::GameError;
use crate::event::GameEvent;
use crate::fixed::Millis;
use crate::id::{OfferId, PlayerId};
use crate::ledger::TransactionKind;
use crate::player::Player;
use crate::resource::Asset;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOffer {
    pub seller: PlayerId,
    pub seller_name: String,
    pub selling: Asset,
    pub selling_quantity: u64,
    pub buying: Asset,
    pub buying_quantity: u64,
    pub created_at: Millis,
}

fn shortfall(asset: Asset) -> GameError {
    match asset {
        Asset::Money => GameError::InsufficientFunds,
        Asset::Resource(r) => GameError::InsufficientResource(r),
    }
}

fn holds(player: &Player, asset: Asset, quantity: u64) -> bool {
    match asset {
        Asset::Money => player.money >= quantity,
        Asset::Resource(r) => player.inventory.quantity(r) as u64 >= quantity,
    }
}

fn take(player: &mut Player, asset: Asset, quantity: u64) -> Result<(), GameError> {
    match asset {
        Asset::Money => player.debit(quantity),
        Asset::Resource(r) => {
            let q = u32::try_from(quantity).map_err(|_| GameError::InsufficientResource(r))?;
            if player.inventory.try_remove(r, q) {
                Ok(())
            } else {
                Err(GameError::InsufficientResource(r))
            }
        }
    }
}

fn give(player: &mut Player, asset: Asset, quantity: u64) {
    match asset {
        Asset::Money => player.credit(quantity),
        Asset::Resource(r) => player
            .inventory
            .add(r, u32::try_from(quantity).unwrap_or(u32::MAX)),
    }
}

/// Post an offer to sell `selling_quantity` of `selling` for
/// `buying_quantity` of `buying`.
pub fn create_offer(
    state: &mut GameState,
    seller: PlayerId,
    selling: Asset,
    selling_quantity: u64,
    buying: Asset,
    buying_quantity: u64,
    events: &mut Vec<GameEvent>,
) -> Result<OfferId, GameError> {
    if selling_quantity == 0 || buying_quantity == 0 {
        return Err(GameError::InvalidAmount);
    }
    if selling == buying {
        return Err(GameError::InvalidOfferSelfTrade);
    }
    let p = state.player(seller)?;
    if !holds(p, selling, selling_quantity) {
        return Err(shortfall(selling));
    }
    let offer = MarketOffer {
        seller,
        seller_name: p.name.clone(),
        selling,
        selling_quantity,
        buying,
        buying_quantity,
        created_at: state.now,
    };
    let id = state.offers.insert(offer);
    debug!(offer = ?id, %selling, selling_quantity, %buying, buying_quantity, "offer created");
    events.push(GameEvent::OfferCreated { offer: id, seller });
    Ok(id)
}

/// Swap both sides of an offer and remove it.
pub fn accept_offer(
    state: &mut GameState,
    offer_id: OfferId,
    buyer: PlayerId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let offer = state.offers.get(offer_id).ok_or(GameError::UnknownOffer)?.clone();
    if offer.seller == buyer {
        return Err(GameError::InvalidOfferSelfTrade);
    }
    if !holds(state.player(buyer)?, offer.buying, offer.buying_quantity) {
        return Err(shortfall(offer.buying));
    }
    if !holds(state.player(offer.seller)?, offer.selling, offer.selling_quantity) {
        return Err(shortfall(offer.selling));
    }

    take(state.player_mut(offer.seller)?, offer.selling, offer.selling_quantity)?;
    take(state.player_mut(buyer)?, offer.buying, offer.buying_quantity)?;
    give(state.player_mut(buyer)?, offer.selling, offer.selling_quantity);
    give(state.player_mut(offer.seller)?, offer.buying, offer.buying_quantity);

    let now = state.now;
    let buyer_name = state.player(buyer)?.name.clone();
    if offer.selling == Asset::Money {
        state.ledger.record(
            offer.seller,
            TransactionKind::Expense,
            format!("Market: paid {buyer_name}"),
            offer.selling_quantity,
            now,
        );
        state.ledger.record(
            buyer,
            TransactionKind::Income,
            format!("Market: received from {}", offer.seller_name),
            offer.selling_quantity,
            now,
        );
    }
    if offer.buying == Asset::Money {
        state.ledger.record(
            buyer,
            TransactionKind::Expense,
            format!("Market: paid {}", offer.seller_name),
            offer.buying_quantity,
            now,
        );
        state.ledger.record(
            offer.seller,
            TransactionKind::Income,
            format!("Market: received from {buyer_name}"),
            offer.buying_quantity,
            now,
        );
    }

    state.offers.remove(offer_id);
    debug!(offer = ?offer_id, ?buyer, "offer accepted");
    events.push(GameEvent::OfferAccepted {
        offer: offer_id,
        buyer,
    });
    Ok(())
}

pub fn cancel_offer(
    state: &mut GameState,
    offer_id: OfferId,
    player: PlayerId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let offer = state.offers.get(offer_id).ok_or(GameError::UnknownOffer)?;
    if offer.seller != player {
        return Err(GameError::NotOwner);
    }
    state.offers.remove(offer_id);
    events.push(GameEvent::OfferCancelled { offer: offer_id });
    Ok(())
}
