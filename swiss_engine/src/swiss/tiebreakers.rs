//! Swiss tiebreaker calculators.
//!
//! Match Win %, Game Win %, Opponent Match Win % and Opponent Game Win %
//! following MTG Swiss rules:
//!
//! - MW% = (match wins + 0.5 * draws) / matches played, floored at `mw_floor`
//! - GW% = game wins / (game wins + game losses), floored at `gw_floor`
//! - OMW% / OGW% = average of each real opponent's floored MW% / GW%
//!
//! A bye is an unopposed match win worth the configured bye game score. It
//! counts towards the player's own MW% and GW% but never contributes an
//! opponent. A player whose only matches are byes has OMW% = OGW% = 0.0.
//!
//! Only reported matches (with an `end_time`) are counted.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ComponentConfig;
use crate::tournament::models::{Match, MatchOutcome, Opponent, PlayerId, TournamentRegistration};

/// Match and game record of one player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Match wins, byes included
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub byes: u32,
    pub game_wins: u32,
    pub game_losses: u32,
    pub game_draws: u32,
    pub matches_played: u32,
    /// Real opponents in match order; repeated if faced more than once
    pub opponents: Vec<PlayerId>,
}

impl PlayerRecord {
    /// 3 per win, 1 per draw
    pub fn match_points(&self) -> u32 {
        self.wins * 3 + self.draws
    }

    fn add(&mut self, outcome: MatchOutcome, games: (u32, u32), game_draws: u32, opponent: Opponent) {
        match outcome {
            MatchOutcome::Win => self.wins += 1,
            MatchOutcome::Loss => self.losses += 1,
            MatchOutcome::Draw => self.draws += 1,
            MatchOutcome::Bye => {
                self.wins += 1;
                self.byes += 1;
            }
        }
        self.game_wins += games.0;
        self.game_losses += games.1;
        self.game_draws += game_draws;
        self.matches_played += 1;
        if let Opponent::Real(id) = opponent {
            self.opponents.push(id);
        }
    }

    /// Unfloored MW%, or None with no matches played
    fn raw_match_win(&self) -> Option<f64> {
        if self.matches_played == 0 {
            return None;
        }
        let points = f64::from(self.wins) + 0.5 * f64::from(self.draws);
        Some(points / f64::from(self.matches_played))
    }
}

/// The four percentage tiebreakers of one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TiebreakerValues {
    pub mw: f64,
    pub gw: f64,
    pub omw: f64,
    pub ogw: f64,
}

/// Tiebreaker calculator over one match history.
///
/// Indexes the history once so the opponent metrics do not rescan the match
/// list for every opponent.
#[derive(Debug)]
pub struct TiebreakerCalculator<'a> {
    config: &'a ComponentConfig,
    records: HashMap<PlayerId, PlayerRecord>,
    registered: HashSet<PlayerId>,
}

impl<'a> TiebreakerCalculator<'a> {
    /// Index `matches` for the players in `registrations`
    pub fn new(
        matches: &[Match],
        registrations: &[TournamentRegistration],
        config: &'a ComponentConfig,
    ) -> Self {
        let mut records: HashMap<PlayerId, PlayerRecord> = HashMap::new();

        for m in matches.iter().filter(|m| m.is_reported()) {
            match m.player2_id {
                None => {
                    let bye = config.bye_points;
                    records.entry(m.player1_id).or_default().add(
                        MatchOutcome::Bye,
                        (bye.wins, 0),
                        bye.draws,
                        Opponent::Bye,
                    );
                }
                Some(player2) => {
                    for (player, opponent) in [(m.player1_id, player2), (player2, m.player1_id)] {
                        if let Some(outcome) = m.outcome_for(player) {
                            records.entry(player).or_default().add(
                                outcome,
                                m.games_for(player),
                                m.draws,
                                Opponent::Real(opponent),
                            );
                        }
                    }
                }
            }
        }

        Self {
            config,
            records,
            registered: registrations.iter().map(|r| r.player_id).collect(),
        }
    }

    /// Record of `player`, empty if they have no reported match
    pub fn record(&self, player: PlayerId) -> PlayerRecord {
        self.records.get(&player).cloned().unwrap_or_default()
    }

    /// Match Win % (0.0 with no matches)
    pub fn match_win_percentage(&self, player: PlayerId) -> f64 {
        self.floored_match_win(player, self.config.mw_floor)
    }

    /// Game Win % (0.0 with no matches, the floor with no decided games)
    pub fn game_win_percentage(&self, player: PlayerId) -> f64 {
        let Some(record) = self.records.get(&player).filter(|r| r.matches_played > 0) else {
            return 0.0;
        };
        let total = record.game_wins + record.game_losses;
        if total == 0 {
            return self.config.gw_floor;
        }
        let pct = f64::from(record.game_wins) / f64::from(total);
        pct.max(self.config.gw_floor)
    }

    /// Opponent Match Win % (0.0 with no real opponents)
    pub fn opponent_match_win_percentage(&self, player: PlayerId) -> f64 {
        self.average_over_opponents(player, |opponent| {
            self.floored_match_win(opponent, self.config.omw_floor)
        })
    }

    /// Opponent Game Win % (0.0 with no real opponents)
    pub fn opponent_game_win_percentage(&self, player: PlayerId) -> f64 {
        self.average_over_opponents(player, |opponent| self.game_win_percentage(opponent))
    }

    /// All four percentages for `player`
    pub fn values(&self, player: PlayerId) -> TiebreakerValues {
        TiebreakerValues {
            mw: self.match_win_percentage(player),
            gw: self.game_win_percentage(player),
            omw: self.opponent_match_win_percentage(player),
            ogw: self.opponent_game_win_percentage(player),
        }
    }

    fn floored_match_win(&self, player: PlayerId, floor: f64) -> f64 {
        self.records
            .get(&player)
            .and_then(PlayerRecord::raw_match_win)
            .map_or(0.0, |pct| pct.max(floor))
    }

    fn average_over_opponents(&self, player: PlayerId, metric: impl Fn(PlayerId) -> f64) -> f64 {
        let Some(record) = self.records.get(&player) else {
            return 0.0;
        };

        // Opponents without a registration are skipped
        let values: Vec<f64> = record
            .opponents
            .iter()
            .filter(|&id| self.registered.contains(id))
            .map(|&id| metric(id))
            .collect();

        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Match Win % of `player` over `matches`
pub fn match_win_percentage(
    player: &TournamentRegistration,
    matches: &[Match],
    registrations: &[TournamentRegistration],
    config: &ComponentConfig,
) -> f64 {
    TiebreakerCalculator::new(matches, registrations, config).match_win_percentage(player.player_id)
}

/// Game Win % of `player` over `matches`
pub fn game_win_percentage(
    player: &TournamentRegistration,
    matches: &[Match],
    registrations: &[TournamentRegistration],
    config: &ComponentConfig,
) -> f64 {
    TiebreakerCalculator::new(matches, registrations, config).game_win_percentage(player.player_id)
}

/// Opponent Match Win % of `player` over `matches`
pub fn opponent_match_win_percentage(
    player: &TournamentRegistration,
    matches: &[Match],
    registrations: &[TournamentRegistration],
    config: &ComponentConfig,
) -> f64 {
    TiebreakerCalculator::new(matches, registrations, config)
        .opponent_match_win_percentage(player.player_id)
}

/// Opponent Game Win % of `player` over `matches`
pub fn opponent_game_win_percentage(
    player: &TournamentRegistration,
    matches: &[Match],
    registrations: &[TournamentRegistration],
    config: &ComponentConfig,
) -> f64 {
    TiebreakerCalculator::new(matches, registrations, config)
        .opponent_game_win_percentage(player.player_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::Round;
    use chrono::Utc;
    use uuid::Uuid;

    struct Fixture {
        round: Round,
        players: Vec<TournamentRegistration>,
        matches: Vec<Match>,
        config: ComponentConfig,
    }

    impl Fixture {
        fn new(count: usize) -> Self {
            let round = Round::active(Uuid::new_v4(), Uuid::new_v4(), 1, Utc::now());
            let players = (0..count)
                .map(|i| {
                    TournamentRegistration::new(round.tournament_id, Uuid::new_v4(), i as u32 + 1, Utc::now())
                })
                .collect();
            Self {
                round,
                players,
                matches: Vec::new(),
                config: ComponentConfig::default(),
            }
        }

        fn id(&self, idx: usize) -> PlayerId {
            self.players[idx].player_id
        }

        fn play(&mut self, p1: usize, p2: usize, w1: u32, w2: u32, draws: u32) {
            let mut m = Match::pairing(&self.round, 1, self.id(p1), self.id(p2));
            m.player1_wins = w1;
            m.player2_wins = w2;
            m.draws = draws;
            m.end_time = Some(Utc::now());
            self.matches.push(m);
        }

        fn bye(&mut self, p: usize) {
            let bye = self.config.bye_points;
            self.matches
                .push(Match::bye(&self.round, self.id(p), bye.wins, bye.draws, Utc::now()));
        }

        fn calc(&self) -> TiebreakerCalculator<'_> {
            TiebreakerCalculator::new(&self.matches, &self.players, &self.config)
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.0001
    }

    #[test]
    fn test_mw_perfect_record() {
        let mut f = Fixture::new(4);
        f.play(0, 1, 2, 0, 0);
        f.play(0, 2, 2, 1, 0);
        f.play(3, 0, 0, 2, 0);
        assert!(approx(f.calc().match_win_percentage(f.id(0)), 1.0));
    }

    #[test]
    fn test_mw_losing_record_above_floor() {
        let mut f = Fixture::new(4);
        f.play(0, 1, 2, 0, 0);
        f.play(0, 2, 0, 2, 0);
        f.play(0, 3, 1, 2, 0);
        assert!(approx(f.calc().match_win_percentage(f.id(0)), 1.0 / 3.0));
    }

    #[test]
    fn test_mw_floor_applied() {
        let mut f = Fixture::new(3);
        f.play(0, 1, 0, 2, 0);
        f.play(0, 2, 0, 2, 0);
        assert!(approx(f.calc().match_win_percentage(f.id(0)), 0.33));
    }

    #[test]
    fn test_mw_draws_count_half() {
        let mut f = Fixture::new(3);
        f.play(0, 1, 1, 1, 1);
        f.play(0, 2, 1, 1, 0);
        assert!(approx(f.calc().match_win_percentage(f.id(0)), 0.5));
    }

    #[test]
    fn test_mw_bye_counts_as_win() {
        let mut f = Fixture::new(1);
        f.bye(0);
        assert!(approx(f.calc().match_win_percentage(f.id(0)), 1.0));
    }

    #[test]
    fn test_no_matches_is_zero() {
        let f = Fixture::new(1);
        let values = f.calc().values(f.id(0));
        assert_eq!(values, TiebreakerValues::default());
    }

    #[test]
    fn test_pending_match_not_counted() {
        let mut f = Fixture::new(2);
        let pending = Match::pairing(&f.round, 1, f.id(0), f.id(1));
        f.matches.push(pending);
        assert_eq!(f.calc().record(f.id(0)).matches_played, 0);
        assert_eq!(f.calc().match_win_percentage(f.id(0)), 0.0);
    }

    #[test]
    fn test_gw_mixed_results() {
        let mut f = Fixture::new(3);
        f.play(0, 1, 2, 1, 0);
        f.play(0, 2, 3, 2, 0);
        // 5 won of 8
        assert!(approx(f.calc().game_win_percentage(f.id(0)), 0.625));
    }

    #[test]
    fn test_gw_floor_applied() {
        let mut f = Fixture::new(2);
        f.play(0, 1, 0, 2, 0);
        assert!(approx(f.calc().game_win_percentage(f.id(0)), 0.33));
    }

    #[test]
    fn test_gw_bye_included() {
        let mut f = Fixture::new(2);
        f.bye(0);
        f.play(0, 1, 2, 1, 0);
        // 2-0 bye plus 2-1 = 4 of 5
        assert!(approx(f.calc().game_win_percentage(f.id(0)), 0.8));
    }

    #[test]
    fn test_gw_zero_decided_games_is_floor() {
        let mut f = Fixture::new(2);
        f.play(0, 1, 0, 0, 3);
        assert!(approx(f.calc().game_win_percentage(f.id(0)), 0.33));
        assert_eq!(f.calc().record(f.id(0)).game_draws, 3);
    }

    #[test]
    fn test_bye_uses_configured_score() {
        let mut f = Fixture::new(2);
        f.config.bye_points.wins = 3;
        // Stored match fields are ignored for byes
        f.matches
            .push(Match::bye(&f.round, f.id(0), 0, 0, Utc::now()));
        f.play(1, 0, 2, 0, 0);
        let record = f.calc().record(f.id(0));
        assert_eq!(record.game_wins, 3);
        assert_eq!(record.game_losses, 2);
        assert_eq!(record.byes, 1);
    }

    #[test]
    fn test_omw_simple_case() {
        // Opponents finish 2-1, 1-2 and 1-2; 1/3 sits just above the floor
        let mut f = Fixture::new(6);
        f.play(0, 1, 2, 0, 0);
        f.play(0, 2, 2, 0, 0);
        f.play(0, 3, 0, 2, 0);
        f.play(1, 4, 2, 0, 0);
        f.play(1, 5, 2, 0, 0);
        f.play(2, 4, 2, 0, 0);
        f.play(2, 5, 0, 2, 0);
        f.play(3, 4, 0, 2, 0);
        f.play(3, 5, 0, 2, 0);
        let expected = (2.0 / 3.0 + 1.0 / 3.0 + 1.0 / 3.0) / 3.0;
        assert!(approx(f.calc().opponent_match_win_percentage(f.id(0)), expected));
    }

    #[test]
    fn test_omw_excludes_byes() {
        let mut f = Fixture::new(2);
        f.bye(0);
        f.play(0, 1, 2, 0, 0);
        // Only opponent is 0-1, floored
        assert!(approx(f.calc().opponent_match_win_percentage(f.id(0)), 0.33));
        assert_eq!(f.calc().record(f.id(0)).opponents, vec![f.id(1)]);
    }

    #[test]
    fn test_only_byes_gives_zero_opponent_metrics() {
        let mut f = Fixture::new(1);
        f.bye(0);
        f.bye(0);
        let calc = f.calc();
        assert_eq!(calc.opponent_match_win_percentage(f.id(0)), 0.0);
        assert_eq!(calc.opponent_game_win_percentage(f.id(0)), 0.0);
    }

    #[test]
    fn test_ogw_simple_case() {
        let mut f = Fixture::new(3);
        f.play(0, 1, 2, 1, 0);
        f.play(0, 2, 2, 0, 0);
        f.play(1, 2, 2, 1, 0);
        // p1 won 3 of 6 games, p2 won 1 of 5 (floored)
        let expected = (0.5 + 0.33) / 2.0;
        assert!(approx(f.calc().opponent_game_win_percentage(f.id(0)), expected));
    }

    #[test]
    fn test_unregistered_opponent_skipped() {
        let mut f = Fixture::new(2);
        let stranger = Uuid::new_v4();
        let mut m = Match::pairing(&f.round, 1, f.id(0), stranger);
        m.player1_wins = 2;
        m.end_time = Some(Utc::now());
        f.matches.push(m);
        assert_eq!(f.calc().opponent_match_win_percentage(f.id(0)), 0.0);
        f.play(0, 1, 2, 0, 0);
        assert!(approx(f.calc().opponent_match_win_percentage(f.id(0)), 0.33));
    }

    #[test]
    fn test_free_functions_match_calculator() {
        let mut f = Fixture::new(3);
        f.play(0, 1, 2, 1, 0);
        f.play(2, 0, 2, 0, 0);
        let calc = f.calc();
        let p = &f.players[0];
        assert_eq!(match_win_percentage(p, &f.matches, &f.players, &f.config), calc.match_win_percentage(p.player_id));
        assert_eq!(game_win_percentage(p, &f.matches, &f.players, &f.config), calc.game_win_percentage(p.player_id));
        assert_eq!(
            opponent_match_win_percentage(p, &f.matches, &f.players, &f.config),
            calc.opponent_match_win_percentage(p.player_id)
        );
        assert_eq!(
            opponent_game_win_percentage(p, &f.matches, &f.players, &f.config),
            calc.opponent_game_win_percentage(p.player_id)
        );
    }
}
