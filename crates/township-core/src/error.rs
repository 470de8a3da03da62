//! Rejection reasons for player actions.
//!
//! Every variant is recoverable: the action that produced it changed
//! nothing, and the UI shows the message as a transient notification.

use crate::resource::Resource;
use township_spatial::{GridPosition, SpatialError};

/// Why a player action was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("cell ({}, {}) is occupied", .0.x, .0.y)]
    CellOccupied(GridPosition),
    #[error("tile ({}, {}) is not adjacent to the farm", .0.x, .0.y)]
    NotAdjacent(GridPosition),
    #[error("no valid tile in the selection")]
    NoValidTiles,
    #[error("cell ({}, {}) is off the map", .0.x, .0.y)]
    OutOfBounds(GridPosition),
    #[error("selection covers {cells} cells, at most {max} allowed")]
    SelectionTooLarge { cells: u64, max: u64 },
    #[error("not enough money")]
    InsufficientFunds,
    #[error("not enough {0}")]
    InsufficientResource(Resource),
    #[error("not enough input in stock")]
    InsufficientInput,
    #[error("the building has no employees")]
    InsufficientEmployees,
    #[error("no free place left")]
    CapacityFull,
    #[error("already employed")]
    AlreadyEmployed,
    #[error("already renting a home")]
    AlreadyRenting,
    #[error("not employed here")]
    NotEmployed,
    #[error("not renting here")]
    NotRenting,
    #[error("cannot trade with yourself or the same asset on both sides")]
    InvalidOfferSelfTrade,
    #[error("loan exceeds the lender's limit of {max}")]
    LoanLimitExceeded { max: u64 },
    #[error("cannot borrow from your own bank")]
    SelfLending,
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("only the owner can do this")]
    NotOwner,
    #[error("still under construction")]
    UnderConstruction,
    #[error("already being demolished")]
    AlreadyDemolishing,
    #[error("this building does not support that")]
    Unsupported,
    #[error("the crop is not ready")]
    CropNotReady,
    #[error("the tile already has a crop")]
    TileNotEmpty,
    #[error("unknown player")]
    UnknownPlayer,
    #[error("unknown building")]
    UnknownBuilding,
    #[error("no farmland tile at ({}, {})", .0.x, .0.y)]
    UnknownTile(GridPosition),
    #[error("unknown offer")]
    UnknownOffer,
    #[error("unknown loan")]
    UnknownLoan,
    #[error("unknown building type '{0}'")]
    UnknownDefinition(String),
}

impl From<SpatialError> for GameError {
    fn from(err: SpatialError) -> Self {
        match err {
            SpatialError::Occupied(pos) => GameError::CellOccupied(pos),
            SpatialError::OutOfBounds(pos) => GameError::OutOfBounds(pos),
            SpatialError::DragTooLarge { cells, max } => GameError::SelectionTooLarge { cells, max },
            // Keys are fresh slotmap ids; a double insert means the cell is taken.
            SpatialError::AlreadyPlaced | SpatialError::NotPlaced => GameError::Unsupported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_missing_resource() {
        let err = GameError::InsufficientResource(Resource::Brick);
        assert_eq!(err.to_string(), "not enough brick");
    }

    #[test]
    fn occupied_message_has_coordinates() {
        let err = GameError::CellOccupied(GridPosition::new(3, -1));
        assert_eq!(err.to_string(), "cell (3, -1) is occupied");
    }

    #[test]
    fn spatial_errors_map_to_rejections() {
        let far = GridPosition::new(i32::MAX, 0);
        assert_eq!(GameError::from(SpatialError::OutOfBounds(far)), GameError::OutOfBounds(far));
        assert_eq!(
            GameError::from(SpatialError::DragTooLarge { cells: 5_000, max: 4_096 }),
            GameError::SelectionTooLarge { cells: 5_000, max: 4_096 }
        );
    }
}
