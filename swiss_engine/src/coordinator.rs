//! Per-tournament operation guard.
//!
//! Pairing a round or advancing it changes tournament-wide state (round
//! numbers, the match set, statuses). Two such calls racing on the same
//! tournament would pair a round twice or create the same round number twice,
//! so the hosting service holds a [`TournamentLocks`] and wraps every mutating
//! call in an [`OperationGuard`]. The engine functions themselves stay
//! synchronous and lock-free.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::tournament::models::TournamentId;

/// Tournament-wide mutating operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Start,
    Pairing,
    SubmitResult,
    AdvanceRound,
    End,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Start => write!(f, "start"),
            Operation::Pairing => write!(f, "pairing"),
            Operation::SubmitResult => write!(f, "submit_result"),
            Operation::AdvanceRound => write!(f, "advance_round"),
            Operation::End => write!(f, "end"),
        }
    }
}

/// Registry of in-flight operations, at most one per tournament.
///
/// Cheap to clone; clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct TournamentLocks {
    in_flight: Arc<Mutex<HashMap<TournamentId, Operation>>>,
}

impl TournamentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `tournament_id` for `operation`.
    ///
    /// Fails with [`EngineError::OperationInProgress`] (naming the operation
    /// holding it) instead of waiting.
    pub fn try_acquire(
        &self,
        tournament_id: TournamentId,
        operation: Operation,
    ) -> EngineResult<OperationGuard> {
        let mut in_flight = self.lock();

        if let Some(&held) = in_flight.get(&tournament_id) {
            log::warn!(
                "Tournament {}: {} rejected while {} is in progress",
                tournament_id,
                operation,
                held
            );
            return Err(EngineError::OperationInProgress {
                tournament_id,
                operation: held,
            });
        }

        in_flight.insert(tournament_id, operation);
        log::debug!("Tournament {}: {} acquired", tournament_id, operation);

        Ok(OperationGuard {
            locks: self.clone(),
            tournament_id,
            operation,
        })
    }

    /// Operation currently holding `tournament_id`
    pub fn current(&self, tournament_id: TournamentId) -> Option<Operation> {
        self.lock().get(&tournament_id).copied()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TournamentId, Operation>> {
        // The map stays consistent even if a holder panicked mid-operation
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held while an operation runs; releases the tournament on drop
#[derive(Debug)]
pub struct OperationGuard {
    locks: TournamentLocks,
    tournament_id: TournamentId,
    operation: Operation,
}

impl OperationGuard {
    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.locks.lock().remove(&self.tournament_id);
        log::debug!(
            "Tournament {}: {} released",
            self.tournament_id,
            self.operation
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use uuid::Uuid;

    #[test]
    fn test_second_operation_rejected() {
        let locks = TournamentLocks::new();
        let tournament = Uuid::new_v4();

        let guard = locks.try_acquire(tournament, Operation::Pairing).unwrap();
        assert_eq!(guard.operation(), Operation::Pairing);

        let err = locks.try_acquire(tournament, Operation::AdvanceRound).unwrap_err();
        assert!(matches!(
            err,
            EngineError::OperationInProgress { operation: Operation::Pairing, .. }
        ));
        assert_eq!(locks.current(tournament), Some(Operation::Pairing));
    }

    #[test]
    fn test_released_on_drop() {
        let locks = TournamentLocks::new();
        let tournament = Uuid::new_v4();
        {
            let _guard = locks.try_acquire(tournament, Operation::Start).unwrap();
        }
        assert_eq!(locks.current(tournament), None);
        assert!(locks.try_acquire(tournament, Operation::Pairing).is_ok());
    }

    #[test]
    fn test_tournaments_independent() {
        let locks = TournamentLocks::new();
        let _a = locks.try_acquire(Uuid::new_v4(), Operation::Pairing).unwrap();
        assert!(locks.try_acquire(Uuid::new_v4(), Operation::Pairing).is_ok());
    }

    #[test]
    fn test_one_winner_across_threads() {
        let locks = TournamentLocks::new();
        let tournament = Uuid::new_v4();
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    // Keep the guard alive until every thread has tried
                    let guard = locks.try_acquire(tournament, Operation::AdvanceRound).ok();
                    barrier.wait();
                    guard.is_some()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
    }
}
