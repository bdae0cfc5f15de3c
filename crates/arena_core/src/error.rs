//! Error types for the arena simulation.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// No map with this id in the catalog.
    #[error("Unknown map: {0}")]
    UnknownMap(String),

    /// No weapon with this id in the catalog.
    #[error("Unknown weapon: {0}")]
    UnknownWeapon(String),

    /// No enemy type with this id in the catalog.
    #[error("Unknown enemy type: {0}")]
    UnknownEnemy(String),

    /// An enemy definition names a behavior that was never registered.
    #[error("Unknown enemy behavior: {0}")]
    UnknownBehavior(String),

    /// A catalog failed validation.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// The lobby cannot take another player.
    #[error("Lobby is full ({max} players)")]
    LobbyFull {
        /// Maximum number of players in a match.
        max: usize,
    },

    /// Per-slot operation on a slot that does not exist.
    #[error("No player in slot {0}")]
    InvalidSlot(usize),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
