//! Swiss standings calculation.

use std::cmp::Ordering;
use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::tiebreakers::{TiebreakerCalculator, TiebreakerValues};
use crate::config::{ComponentConfig, Tiebreaker};
use crate::tournament::models::{Match, PlayerId, TournamentRegistration};

/// Percentages closer than this compare equal, absorbing float noise from
/// averaging opponents in a different order.
const METRIC_RESOLUTION: f64 = 1e-9;

/// Computed standings entry for one player.
///
/// Derived from the match history on every request; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsEntry {
    pub player: TournamentRegistration,
    /// 1-based, unique within one standings list
    pub rank: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// 3 per win, 1 per draw
    pub match_points: u32,
    pub game_wins: u32,
    pub game_losses: u32,
    pub game_draws: u32,
    pub tiebreakers: TiebreakerValues,
    pub matches_played: u32,
    pub bye_count: u32,
    pub opponents: Vec<PlayerId>,
}

impl StandingsEntry {
    pub fn player_id(&self) -> PlayerId {
        self.player.player_id
    }

    /// 3 per game won, 1 per game drawn
    pub fn game_points(&self) -> u32 {
        self.game_wins * 3 + self.game_draws
    }

    /// Value `metric` sorts on, for the metrics that have one
    pub fn tiebreaker(&self, metric: Tiebreaker) -> Option<f64> {
        match metric {
            Tiebreaker::Omw => Some(self.tiebreakers.omw),
            Tiebreaker::Gw => Some(self.tiebreakers.gw),
            Tiebreaker::Ogw => Some(self.tiebreakers.ogw),
            Tiebreaker::Mw => Some(self.tiebreakers.mw),
            Tiebreaker::MatchWins => Some(f64::from(self.wins)),
            Tiebreaker::GameWins => Some(f64::from(self.game_wins)),
            Tiebreaker::PlayerNumber | Tiebreaker::Random => None,
        }
    }
}

/// Calculate ranked standings.
///
/// Sorted by match points, then the configured tiebreakers in order, then
/// player number (sequence id) so that every rank is distinct. Dropped
/// players are ranked on their history.
pub fn calculate_standings(
    registrations: &[TournamentRegistration],
    matches: &[Match],
    config: &ComponentConfig,
) -> Vec<StandingsEntry> {
    rank_players(registrations, matches, config, &config.tiebreakers)
}

/// Rank `registrations` using an explicit tie-break order
pub(crate) fn rank_players(
    registrations: &[TournamentRegistration],
    matches: &[Match],
    config: &ComponentConfig,
    order: &[Tiebreaker],
) -> Vec<StandingsEntry> {
    let calculator = TiebreakerCalculator::new(matches, registrations, config);

    let mut entries: Vec<StandingsEntry> = registrations
        .iter()
        .map(|registration| {
            let record = calculator.record(registration.player_id);
            StandingsEntry {
                player: registration.clone(),
                rank: 0,
                wins: record.wins,
                losses: record.losses,
                draws: record.draws,
                match_points: record.match_points(),
                game_wins: record.game_wins,
                game_losses: record.game_losses,
                game_draws: record.game_draws,
                tiebreakers: calculator.values(registration.player_id),
                matches_played: record.matches_played,
                bye_count: record.byes,
                opponents: record.opponents,
            }
        })
        .collect();

    let draws = if order.contains(&Tiebreaker::Random) {
        random_draw(registrations, config.tiebreak_seed())
    } else {
        HashMap::new()
    };

    entries.sort_by(|a, b| compare_entries(a, b, order, &draws));

    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.rank = idx as u32 + 1;
    }

    log::debug!(
        "Ranked {} players over {} matches (tiebreakers: {:?})",
        entries.len(),
        matches.len(),
        order
    );

    entries
}

fn compare_entries(
    a: &StandingsEntry,
    b: &StandingsEntry,
    order: &[Tiebreaker],
    draws: &HashMap<PlayerId, usize>,
) -> Ordering {
    b.match_points
        .cmp(&a.match_points)
        .then_with(|| {
            order
                .iter()
                .map(|&metric| compare_metric(a, b, metric, draws))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.player.sequence_id.cmp(&b.player.sequence_id))
        .then_with(|| a.player_id().cmp(&b.player_id()))
}

fn compare_metric(
    a: &StandingsEntry,
    b: &StandingsEntry,
    metric: Tiebreaker,
    draws: &HashMap<PlayerId, usize>,
) -> Ordering {
    match metric {
        Tiebreaker::Omw => descending(a.tiebreakers.omw, b.tiebreakers.omw),
        Tiebreaker::Gw => descending(a.tiebreakers.gw, b.tiebreakers.gw),
        Tiebreaker::Ogw => descending(a.tiebreakers.ogw, b.tiebreakers.ogw),
        Tiebreaker::Mw => descending(a.tiebreakers.mw, b.tiebreakers.mw),
        Tiebreaker::MatchWins => b.wins.cmp(&a.wins),
        Tiebreaker::GameWins => b.game_wins.cmp(&a.game_wins),
        Tiebreaker::PlayerNumber => a.player.sequence_id.cmp(&b.player.sequence_id),
        Tiebreaker::Random => draws.get(&a.player_id()).cmp(&draws.get(&b.player_id())),
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    quantize(b).cmp(&quantize(a))
}

fn quantize(value: f64) -> i64 {
    (value / METRIC_RESOLUTION).round() as i64
}

/// Seeded draw position per player, independent of input order
fn random_draw(registrations: &[TournamentRegistration], seed: u64) -> HashMap<PlayerId, usize> {
    let mut ids: Vec<PlayerId> = registrations.iter().map(|r| r.player_id).collect();
    ids.sort();
    ids.shuffle(&mut StdRng::seed_from_u64(seed));
    ids.into_iter()
        .enumerate()
        .map(|(position, id)| (id, position))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{PlayerStatus, Round};
    use chrono::Utc;
    use uuid::Uuid;

    fn registrations(count: usize) -> Vec<TournamentRegistration> {
        let tournament_id = Uuid::new_v4();
        (0..count)
            .map(|i| TournamentRegistration::new(tournament_id, Uuid::new_v4(), i as u32 + 1, Utc::now()))
            .collect()
    }

    fn result(round: &Round, p1: PlayerId, p2: PlayerId, w1: u32, w2: u32) -> Match {
        let mut m = Match::pairing(round, 1, p1, p2);
        m.player1_wins = w1;
        m.player2_wins = w2;
        m.end_time = Some(Utc::now());
        m
    }

    #[test]
    fn test_empty_history_ranks_by_player_number() {
        let mut regs = registrations(4);
        regs.reverse();
        let standings = calculate_standings(&regs, &[], &ComponentConfig::default());

        let numbers: Vec<u32> = standings.iter().map(|e| e.player.sequence_id).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        let ranks: Vec<u32> = standings.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_match_points_first() {
        let regs = registrations(4);
        let round = Round::active(regs[0].tournament_id, Uuid::new_v4(), 1, Utc::now());
        let matches = vec![
            result(&round, regs[3].player_id, regs[0].player_id, 2, 0),
            result(&round, regs[1].player_id, regs[2].player_id, 1, 1),
        ];
        let standings = calculate_standings(&regs, &matches, &ComponentConfig::default());

        assert_eq!(standings[0].player_id(), regs[3].player_id);
        assert_eq!(standings[0].match_points, 3);
        assert_eq!(standings[1].match_points, 1);
        assert_eq!(standings[2].match_points, 1);
        assert_eq!(standings[3].player_id(), regs[0].player_id);
        assert_eq!(standings[3].losses, 1);
    }

    #[test]
    fn test_bye_counted() {
        let regs = registrations(1);
        let round = Round::active(regs[0].tournament_id, Uuid::new_v4(), 1, Utc::now());
        let matches = vec![Match::bye(&round, regs[0].player_id, 2, 0, Utc::now())];
        let standings = calculate_standings(&regs, &matches, &ComponentConfig::default());

        let entry = &standings[0];
        assert_eq!(entry.wins, 1);
        assert_eq!(entry.bye_count, 1);
        assert_eq!(entry.match_points, 3);
        assert_eq!(entry.game_wins, 2);
        assert_eq!(entry.game_points(), 6);
        assert!(entry.opponents.is_empty());
        assert_eq!(entry.tiebreakers.omw, 0.0);
    }

    #[test]
    fn test_dropped_player_keeps_history() {
        let mut regs = registrations(2);
        regs[0].status = PlayerStatus::Dropped;
        let round = Round::active(regs[0].tournament_id, Uuid::new_v4(), 1, Utc::now());
        let matches = vec![result(&round, regs[0].player_id, regs[1].player_id, 2, 0)];
        let standings = calculate_standings(&regs, &matches, &ComponentConfig::default());

        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].player_id(), regs[0].player_id);
    }

    #[test]
    fn test_player_number_metric_ascending() {
        let regs = registrations(3);
        let config = ComponentConfig::default().with_tiebreakers(vec![Tiebreaker::PlayerNumber]);
        let standings = calculate_standings(&regs, &[], &config);
        assert_eq!(standings[0].player.sequence_id, 1);
        assert_eq!(standings[2].player.sequence_id, 3);
    }

    #[test]
    fn test_random_tiebreak_is_seeded() {
        let regs = registrations(8);
        let mut config = ComponentConfig::default().with_tiebreakers(vec![Tiebreaker::Random]);
        config.random_seed = Some(42);

        let first = calculate_standings(&regs, &[], &config);
        let mut shuffled = regs.clone();
        shuffled.reverse();
        let second = calculate_standings(&shuffled, &[], &config);

        let order = |s: &[StandingsEntry]| s.iter().map(|e| e.player_id()).collect::<Vec<_>>();
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn test_tiebreaker_lookup() {
        let regs = registrations(2);
        let round = Round::active(regs[0].tournament_id, Uuid::new_v4(), 1, Utc::now());
        let matches = vec![result(&round, regs[0].player_id, regs[1].player_id, 2, 1)];
        let standings = calculate_standings(&regs, &matches, &ComponentConfig::default());

        let top = &standings[0];
        assert_eq!(top.tiebreaker(Tiebreaker::MatchWins), Some(1.0));
        assert_eq!(top.tiebreaker(Tiebreaker::GameWins), Some(2.0));
        assert_eq!(top.tiebreaker(Tiebreaker::Mw), Some(1.0));
        assert_eq!(top.tiebreaker(Tiebreaker::Random), None);
    }

    #[test]
    fn test_quantize_absorbs_float_noise() {
        let a = (0.1 + 0.2) / 3.0;
        let b = (0.2 + 0.1) / 3.0 + 1e-15;
        assert_eq!(descending(a, b), Ordering::Equal);
        assert_eq!(descending(0.5, 0.4), Ordering::Less);
    }
}
