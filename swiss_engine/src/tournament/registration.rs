//! Player registration and drops.

use chrono::{DateTime, Utc};

use super::models::{PlayerId, PlayerStatus, Tournament, TournamentRegistration, TournamentStatus};
use crate::errors::{EngineError, EngineResult};

/// Next per-tournament player number; dropped registrations keep theirs
pub fn next_sequence_id(existing: &[TournamentRegistration]) -> u32 {
    existing.iter().map(|r| r.sequence_id).max().unwrap_or(0) + 1
}

/// Register `player_id` for `tournament`.
///
/// Players joining a tournament already IN_PROGRESS enter as LATE_ENTRY and
/// are paired from the next round on.
pub fn register_player(
    tournament: &Tournament,
    player_id: PlayerId,
    existing: &[TournamentRegistration],
    at: DateTime<Utc>,
) -> EngineResult<TournamentRegistration> {
    let status = match tournament.status {
        TournamentStatus::RegistrationOpen => PlayerStatus::Active,
        TournamentStatus::InProgress => PlayerStatus::LateEntry,
        other => return Err(EngineError::RegistrationClosed(other)),
    };

    if existing.iter().any(|r| r.player_id == player_id) {
        return Err(EngineError::AlreadyRegistered(player_id));
    }

    if let Some(max) = tournament.registration.max_players {
        let seated = existing.iter().filter(|r| r.is_pairable()).count();
        if seated >= max {
            return Err(EngineError::TournamentFull { max });
        }
    }

    let mut registration =
        TournamentRegistration::new(tournament.id, player_id, next_sequence_id(existing), at);
    registration.status = status;

    log::info!(
        "Player {} registered for tournament {} as #{} ({})",
        player_id,
        tournament.id,
        registration.sequence_id,
        status
    );

    Ok(registration)
}

/// Drop a player. The registration stays so their history keeps counting.
pub fn drop_player(
    registration: &TournamentRegistration,
    at: DateTime<Utc>,
) -> EngineResult<TournamentRegistration> {
    if registration.status == PlayerStatus::Dropped {
        return Err(EngineError::AlreadyDropped(registration.player_id));
    }

    let mut dropped = registration.clone();
    dropped.status = PlayerStatus::Dropped;
    dropped.drop_time = Some(at);

    log::info!(
        "Player #{} ({}) dropped from tournament {}",
        registration.sequence_id,
        registration.player_id,
        registration.tournament_id
    );

    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn open_tournament() -> Tournament {
        Tournament::new("League Night", Utc::now()).with_status(TournamentStatus::RegistrationOpen)
    }

    #[test]
    fn test_sequence_ids() {
        let tournament = open_tournament();
        let mut existing = Vec::new();
        for _ in 0..3 {
            let reg = register_player(&tournament, Uuid::new_v4(), &existing, Utc::now()).unwrap();
            existing.push(reg);
        }
        let numbers: Vec<u32> = existing.iter().map(|r| r.sequence_id).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(next_sequence_id(&[]), 1);
    }

    #[test]
    fn test_numbers_not_reused_after_drop() {
        let tournament = open_tournament();
        let first = register_player(&tournament, Uuid::new_v4(), &[], Utc::now()).unwrap();
        let dropped = drop_player(&first, Utc::now()).unwrap();
        let second = register_player(&tournament, Uuid::new_v4(), &[dropped], Utc::now()).unwrap();
        assert_eq!(second.sequence_id, 2);
    }

    #[test]
    fn test_duplicate_rejected() {
        let tournament = open_tournament();
        let player = Uuid::new_v4();
        let first = register_player(&tournament, player, &[], Utc::now()).unwrap();
        let err = register_player(&tournament, player, &[first], Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyRegistered(id) if id == player));
    }

    #[test]
    fn test_full() {
        let tournament = open_tournament().with_max_players(1);
        let first = register_player(&tournament, Uuid::new_v4(), &[], Utc::now()).unwrap();
        let err = register_player(&tournament, Uuid::new_v4(), &[first.clone()], Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::TournamentFull { max: 1 }));

        // A dropped player frees the seat
        let dropped = drop_player(&first, Utc::now()).unwrap();
        assert!(register_player(&tournament, Uuid::new_v4(), &[dropped], Utc::now()).is_ok());
    }

    #[test]
    fn test_closed_statuses() {
        for status in [
            TournamentStatus::Draft,
            TournamentStatus::RegistrationClosed,
            TournamentStatus::Completed,
            TournamentStatus::Cancelled,
        ] {
            let tournament = Tournament::new("Closed", Utc::now()).with_status(status);
            let err = register_player(&tournament, Uuid::new_v4(), &[], Utc::now()).unwrap_err();
            assert!(matches!(err, EngineError::RegistrationClosed(s) if s == status));
        }
    }

    #[test]
    fn test_late_entry() {
        let tournament = Tournament::new("Running", Utc::now()).with_status(TournamentStatus::InProgress);
        let reg = register_player(&tournament, Uuid::new_v4(), &[], Utc::now()).unwrap();
        assert_eq!(reg.status, PlayerStatus::LateEntry);
        assert!(reg.is_pairable());
    }

    #[test]
    fn test_drop_twice() {
        let tournament = open_tournament();
        let reg = register_player(&tournament, Uuid::new_v4(), &[], Utc::now()).unwrap();
        let at = Utc::now();
        let dropped = drop_player(&reg, at).unwrap();
        assert_eq!(dropped.status, PlayerStatus::Dropped);
        assert_eq!(dropped.drop_time, Some(at));
        assert!(!dropped.is_pairable());
        assert!(matches!(
            drop_player(&dropped, at),
            Err(EngineError::AlreadyDropped(_))
        ));
    }
}
