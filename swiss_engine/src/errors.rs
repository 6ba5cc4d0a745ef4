//! Error types for the Swiss engine.

use std::fmt;

use thiserror::Error;

use crate::coordinator::Operation;
use crate::tournament::models::{
    ComponentStatus, ComponentType, MatchId, PlayerId, RoundStatus, TournamentId,
    TournamentStatus,
};

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// A rejected state-machine edge, carrying the entity it applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Tournament {
        from: TournamentStatus,
        to: TournamentStatus,
    },
    Component {
        from: ComponentStatus,
        to: ComponentStatus,
    },
    Round {
        from: RoundStatus,
        to: RoundStatus,
    },
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Tournament { from, to } => write!(f, "tournament {from} -> {to}"),
            Transition::Component { from, to } => write!(f, "component {from} -> {to}"),
            Transition::Round { from, to } => write!(f, "round {from} -> {to}"),
        }
    }
}

/// Domain errors raised by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Lifecycle call made from a disallowed status
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(Transition),

    /// Not enough active registrations to start
    #[error("Insufficient players: need {needed}, have {current}")]
    InsufficientPlayers { needed: usize, current: usize },

    /// No legal pairing could be produced for the round
    #[error("Pairing impossible for round {round_number}: {reason}")]
    PairingImpossible { round_number: u32, reason: String },

    /// Winner is neither of the match's players
    #[error("Invalid result for match {match_id}: {winner_id} is not a player in this match")]
    InvalidResultSubmission {
        match_id: MatchId,
        winner_id: PlayerId,
    },

    /// The match already carries a result
    #[error("Result already recorded for match {0}")]
    ResultAlreadyRecorded(MatchId),

    /// Pairing requested for a component type the engine does not pair
    #[error("Unsupported component type: {0}")]
    UnsupportedComponent(ComponentType),

    /// Round cannot be closed while matches are still being played
    #[error("Round {round_number} is not complete ({pending} match(es) without a result)")]
    RoundIncomplete { round_number: u32, pending: usize },

    /// Registration attempted while the tournament does not accept players
    #[error("Registration is closed (tournament is {0})")]
    RegistrationClosed(TournamentStatus),

    /// Active registrations already at the configured cap
    #[error("Tournament is full ({max} players)")]
    TournamentFull { max: usize },

    #[error("Player already registered: {0}")]
    AlreadyRegistered(PlayerId),

    #[error("Player already dropped: {0}")]
    AlreadyDropped(PlayerId),

    /// Another pairing/advancement holds the tournament
    #[error("Tournament {tournament_id} is busy with {operation}")]
    OperationInProgress {
        tournament_id: TournamentId,
        operation: Operation,
    },

    /// Component configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Get a message that is safe to show to players.
    ///
    /// Identifiers are redacted; everything else is already user-facing.
    pub fn client_message(&self) -> String {
        match self {
            EngineError::InvalidResultSubmission { .. } => {
                "Winner must be one of the two players in the match".to_string()
            }
            EngineError::ResultAlreadyRecorded(_) => "Result already recorded".to_string(),
            EngineError::AlreadyRegistered(_) => "Player already registered".to_string(),
            EngineError::AlreadyDropped(_) => "Player already dropped".to_string(),
            EngineError::OperationInProgress { operation, .. } => {
                format!("Tournament is busy ({operation}), try again")
            }
            _ => self.to_string(),
        }
    }
}

/// Configuration errors, raised when a component config is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown key, wrong type or unknown tiebreaker name
    #[error("Malformed component config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed but semantically invalid
    #[error("Invalid component config: {0}")]
    Invalid(String),
}
