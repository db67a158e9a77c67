//! Error taxonomy for the tick engine

use shared::Coordinate;
use thiserror::Error;

pub type PlayerId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Rejected construction parameters; fatal at startup
    #[error("invalid engine configuration: {0}")]
    Configuration(String),

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("player {0} is already registered and still in play")]
    DuplicatePlayer(PlayerId),

    #[error("player {0} is still in play and cannot be removed")]
    PlayerInPlay(PlayerId),

    /// No empty cell left for food
    #[error("no empty cell available for food")]
    SpawnFailure,

    #[error("cell {0} is not empty")]
    CellOccupied(Coordinate),

    /// A food-flagged cell has no entry in the active food list
    #[error("no active food at {0}")]
    FoodConsistency(Coordinate),

    #[error("coordinate {0} lies outside the grid")]
    OutOfBounds(Coordinate),

    #[error("failed to deliver diff to listener: {0}")]
    ListenerNotification(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
