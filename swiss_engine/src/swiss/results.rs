//! Match result submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::tournament::models::{Match, PlayerId};

/// A reported match result
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub player1_wins: u32,
    pub player2_wins: u32,
    #[serde(default)]
    pub draws: u32,
    /// None for a drawn match
    pub winner_id: Option<PlayerId>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ResultSubmission {
    pub fn new(player1_wins: u32, player2_wins: u32, draws: u32, winner_id: Option<PlayerId>) -> Self {
        Self {
            player1_wins,
            player2_wins,
            draws,
            winner_id,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Record a result on `current`, returning the updated match.
///
/// Only the game counts, `end_time` and (when given) `notes` change. A match
/// takes exactly one result; byes arrive already reported. Standings are not
/// recomputed here.
pub fn submit_result(
    current: &Match,
    submission: &ResultSubmission,
    at: DateTime<Utc>,
) -> EngineResult<Match> {
    if let Some(winner_id) = submission.winner_id {
        if !current.involves(winner_id) {
            log::error!(
                "Rejected result for match {}: {} is not seated in it",
                current.id,
                winner_id
            );
            return Err(EngineError::InvalidResultSubmission {
                match_id: current.id,
                winner_id,
            });
        }
    }

    if current.is_reported() {
        return Err(EngineError::ResultAlreadyRecorded(current.id));
    }

    let mut updated = current.clone();
    updated.player1_wins = submission.player1_wins;
    updated.player2_wins = submission.player2_wins;
    updated.draws = submission.draws;
    updated.end_time = Some(at);
    if let Some(notes) = &submission.notes {
        updated.notes = Some(notes.clone());
    }

    log::info!(
        "Round {} table {}: result {}-{}-{} recorded for match {}",
        updated.round_number,
        updated.table_number.map_or_else(|| "-".to_string(), |t| t.to_string()),
        updated.player1_wins,
        updated.player2_wins,
        updated.draws,
        updated.id
    );

    Ok(updated)
}
