//! Tournament lifecycle: starting, advancing rounds and ending.
//!
//! Every operation takes the current values by reference and returns the new
//! ones. Nothing is changed until the caller commits the outcome, so a failed
//! call never leaves a half-applied transition behind.

use chrono::{DateTime, Utc};

use super::models::{
    Component, ComponentStatus, Match, PlayerStatus, Round, RoundStatus, Tournament,
    TournamentRegistration, TournamentStatus,
};
use crate::errors::{EngineError, EngineResult, Transition};

/// Minimum ACTIVE registrations needed to start
pub const MIN_PLAYERS: usize = 2;

/// Result of [`start_tournament`]
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentStart {
    pub tournament: Tournament,
    pub component: Component,
    pub first_round: Round,
}

impl TournamentStart {
    /// Apply the new tournament and component state, returning round 1
    pub fn commit(self, tournament: &mut Tournament, component: &mut Component) -> Round {
        *tournament = self.tournament;
        *component = self.component;
        self.first_round
    }
}

/// Result of [`end_tournament`]
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentEnd {
    pub tournament: Tournament,
    pub component: Component,
}

impl TournamentEnd {
    pub fn commit(self, tournament: &mut Tournament, component: &mut Component) {
        *tournament = self.tournament;
        *component = self.component;
    }
}

/// Result of [`advance_to_next_round`]
#[derive(Debug, Clone, PartialEq)]
pub struct RoundAdvance {
    /// The current round, now COMPLETED
    pub completed: Round,
    /// None once the configured number of rounds has been played
    pub next_round: Option<Round>,
    /// Set when the advance also ended the tournament
    pub end: Option<TournamentEnd>,
}

impl RoundAdvance {
    pub fn is_final(&self) -> bool {
        self.next_round.is_none()
    }

    /// Apply the completed round and the tournament end, if any, returning
    /// the next round.
    ///
    /// The tournament and component are always required so an end produced
    /// by the advance cannot be left behind.
    pub fn commit(
        self,
        round: &mut Round,
        tournament: &mut Tournament,
        component: &mut Component,
    ) -> Option<Round> {
        *round = self.completed;
        if let Some(end) = self.end {
            end.commit(tournament, component);
        }
        self.next_round
    }
}

fn rejected(transition: Transition) -> EngineError {
    log::error!("Rejected transition: {}", transition);
    EngineError::InvalidStateTransition(transition)
}

fn transition(tournament: &Tournament, to: TournamentStatus) -> EngineResult<Tournament> {
    if !tournament.status.can_transition_to(to) {
        return Err(rejected(Transition::Tournament {
            from: tournament.status,
            to,
        }));
    }
    log::info!(
        "Tournament {} ({}): {} -> {}",
        tournament.name,
        tournament.id,
        tournament.status,
        to
    );
    Ok(tournament.clone().with_status(to))
}

/// DRAFT -> REGISTRATION_OPEN
pub fn open_registration(tournament: &Tournament) -> EngineResult<Tournament> {
    transition(tournament, TournamentStatus::RegistrationOpen)
}

/// REGISTRATION_OPEN -> REGISTRATION_CLOSED
pub fn close_registration(tournament: &Tournament) -> EngineResult<Tournament> {
    transition(tournament, TournamentStatus::RegistrationClosed)
}

/// Any non-terminal status -> CANCELLED
pub fn cancel_tournament(tournament: &Tournament, at: DateTime<Utc>) -> EngineResult<Tournament> {
    let mut cancelled = transition(tournament, TournamentStatus::Cancelled)?;
    cancelled.end_time = Some(at);
    Ok(cancelled)
}

/// Start the tournament and open round 1.
///
/// Allowed from DRAFT, REGISTRATION_OPEN and REGISTRATION_CLOSED with a
/// PENDING component and at least [`MIN_PLAYERS`] ACTIVE registrations.
pub fn start_tournament(
    tournament: &Tournament,
    component: &Component,
    registrations: &[TournamentRegistration],
    at: DateTime<Utc>,
) -> EngineResult<TournamentStart> {
    let startable = matches!(
        tournament.status,
        TournamentStatus::Draft
            | TournamentStatus::RegistrationOpen
            | TournamentStatus::RegistrationClosed
    );
    if !startable {
        return Err(rejected(Transition::Tournament {
            from: tournament.status,
            to: TournamentStatus::InProgress,
        }));
    }

    if !component.status.can_transition_to(ComponentStatus::Active) {
        return Err(rejected(Transition::Component {
            from: component.status,
            to: ComponentStatus::Active,
        }));
    }

    let active = registrations
        .iter()
        .filter(|r| r.status == PlayerStatus::Active)
        .count();
    if active < MIN_PLAYERS {
        log::error!(
            "Cannot start tournament {}: need {} players, have {}",
            tournament.id,
            MIN_PLAYERS,
            active
        );
        return Err(EngineError::InsufficientPlayers {
            needed: MIN_PLAYERS,
            current: active,
        });
    }

    let mut started = tournament.clone().with_status(TournamentStatus::InProgress);
    started.start_time = Some(at);

    let mut activated = component.clone();
    activated.status = ComponentStatus::Active;

    let first_round = Round::active(tournament.id, component.id, 1, at);

    log::info!(
        "Tournament {} ({}) started with {} players: {} -> in_progress, round 1 is {}",
        tournament.name,
        tournament.id,
        active,
        tournament.status,
        first_round.id
    );

    Ok(TournamentStart {
        tournament: started,
        component: activated,
        first_round,
    })
}

/// Whether every match of `round` has a result.
///
/// A round already marked COMPLETED is complete; a round without matches
/// never is.
pub fn is_round_complete(round: &Round, matches: &[Match]) -> bool {
    if round.status == RoundStatus::Completed {
        return true;
    }
    let (total, pending) = round_progress(round, matches);
    total > 0 && pending == 0
}

/// (matches in the round, matches without a result)
fn round_progress(round: &Round, matches: &[Match]) -> (usize, usize) {
    matches
        .iter()
        .filter(|m| m.round_id == round.id)
        .fold((0, 0), |(total, pending), m| {
            (total + 1, pending + usize::from(!m.is_reported()))
        })
}

/// Mark `round` COMPLETED once every match has a result
pub fn complete_round(round: &Round, matches: &[Match], at: DateTime<Utc>) -> EngineResult<Round> {
    if round.status != RoundStatus::Active {
        return Err(rejected(Transition::Round {
            from: round.status,
            to: RoundStatus::Completed,
        }));
    }

    let (total, pending) = round_progress(round, matches);
    if total == 0 || pending > 0 {
        return Err(EngineError::RoundIncomplete {
            round_number: round.round_number,
            pending,
        });
    }

    let mut completed = round.clone();
    completed.status = RoundStatus::Completed;
    completed.end_time = Some(at);
    log::info!("Round {} completed ({} matches)", round.round_number, total);
    Ok(completed)
}

/// Close `current` and open the next round.
///
/// Past `max_rounds` no round is opened; if the tournament and component are
/// supplied the tournament is ended in the same outcome.
pub fn advance_to_next_round(
    current: &Round,
    max_rounds: Option<u32>,
    event: Option<(&Tournament, &Component)>,
    at: DateTime<Utc>,
) -> EngineResult<RoundAdvance> {
    if current.status != RoundStatus::Active {
        return Err(rejected(Transition::Round {
            from: current.status,
            to: RoundStatus::Completed,
        }));
    }

    let mut completed = current.clone();
    completed.status = RoundStatus::Completed;
    completed.end_time = Some(at);

    let next_number = current.round_number + 1;

    if let Some(max) = max_rounds.filter(|&max| next_number > max) {
        log::info!(
            "Round {} was the last of {} rounds",
            current.round_number,
            max
        );
        let end = event
            .map(|(tournament, component)| end_tournament(tournament, component, at))
            .transpose()?;
        return Ok(RoundAdvance {
            completed,
            next_round: None,
            end,
        });
    }

    let next_round = Round::active(current.tournament_id, current.component_id, next_number, at);
    log::info!(
        "Advanced from round {} to round {} ({})",
        current.round_number,
        next_number,
        next_round.id
    );

    Ok(RoundAdvance {
        completed,
        next_round: Some(next_round),
        end: None,
    })
}

/// IN_PROGRESS -> COMPLETED, completing the component with it
pub fn end_tournament(
    tournament: &Tournament,
    component: &Component,
    at: DateTime<Utc>,
) -> EngineResult<TournamentEnd> {
    if tournament.status != TournamentStatus::InProgress {
        return Err(rejected(Transition::Tournament {
            from: tournament.status,
            to: TournamentStatus::Completed,
        }));
    }
    if component.status != ComponentStatus::Active {
        log::warn!(
            "Completing component {} of tournament {} from {}",
            component.id,
            tournament.id,
            component.status
        );
    }

    let mut ended = tournament.clone().with_status(TournamentStatus::Completed);
    ended.end_time = Some(at);

    let mut completed = component.clone();
    completed.status = ComponentStatus::Completed;

    log::info!(
        "Tournament {} ({}) completed",
        tournament.name,
        tournament.id
    );

    Ok(TournamentEnd {
        tournament: ended,
        component: completed,
    })
}

/// Whether the tournament has played all its rounds.
///
/// True once the highest round reaches `max_rounds`. Before `min_rounds`
/// it is always false. There is no early finish (e.g. a single undefeated
/// player) yet, so past `min_rounds` without `max_rounds` it stays false.
pub fn should_tournament_end(
    rounds: &[Round],
    _matches: &[Match],
    max_rounds: Option<u32>,
    min_rounds: Option<u32>,
) -> bool {
    let Some(current) = rounds.iter().map(|r| r.round_number).max() else {
        return false;
    };

    if max_rounds.is_some_and(|max| current >= max) {
        return true;
    }

    if min_rounds.is_some_and(|min| current < min) {
        return false;
    }

    false
}

/// Advance automatically once `round` is complete.
///
/// Returns None when the tournament does not auto-advance, is not running,
/// or the round still has matches in progress.
pub fn auto_advance(
    tournament: &Tournament,
    component: &Component,
    round: &Round,
    matches: &[Match],
    at: DateTime<Utc>,
) -> EngineResult<Option<RoundAdvance>> {
    if !tournament.auto_advance_rounds
        || tournament.status != TournamentStatus::InProgress
        || round.status != RoundStatus::Active
        || !is_round_complete(round, matches)
    {
        return Ok(None);
    }

    log::debug!(
        "Round {} complete, auto-advancing tournament {}",
        round.round_number,
        tournament.id
    );
    advance_to_next_round(
        round,
        component.config.max_rounds,
        Some((tournament, component)),
        at,
    )
    .map(Some)
}
