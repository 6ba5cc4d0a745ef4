//! Swiss pairing generation.
//!
//! Round 1 is a random pairing of every pairable player. Later rounds are
//! paired by score bracket:
//!
//! 1. Players are ordered like the standings, using the component's pairing
//!    tie-break order, so each bracket is sorted top to bottom.
//! 2. If the count is odd, the bye goes to the lowest-ranked player who has
//!    not reached `max_byes_per_player` (or a random one from the lowest
//!    eligible bracket with `bye_assignment: random`). Players at the limit
//!    are only considered once everyone is.
//! 3. The top unpaired player takes the nearest unpaired player they have not
//!    faced yet. When a bracket cannot be completed the search backtracks, so
//!    blocked or odd players float down into the next bracket. A branch that
//!    leaves someone without any possible opponent is cut immediately.
//! 4. If the rank-order search runs long, a second pass pairs the most
//!    constrained player first. Only when no rematch-free pairing is found
//!    are rematches allowed. They are reported in
//!    [`RoundPairings::forced_rematches`] and logged.
//!
//! The RNG is injected so tests can pin the seed.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::standings::rank_players;
use crate::config::{ByeAssignment, ComponentConfig};
use crate::errors::{EngineError, EngineResult};
use crate::tournament::models::{
    Component, ComponentType, Match, PlayerId, Round, RoundStatus, TournamentRegistration,
};

/// Upper bound on backtracking steps for one round
const MAX_SEARCH_STEPS: usize = 250_000;

/// Steps the strict rank-order pass may use before the constrained pass
const RANK_SEARCH_STEPS: usize = 50_000;

/// Pairings produced for one round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundPairings {
    /// Unscored matches in table order, followed by the bye (if any)
    pub matches: Vec<Match>,
    /// Player receiving the bye
    pub bye: Option<PlayerId>,
    /// Rematches accepted because no rematch-free pairing existed
    pub forced_rematches: Vec<(PlayerId, PlayerId)>,
    /// Pairings between players on different match points
    pub pair_downs: usize,
}

impl RoundPairings {
    /// Matches with an opponent (byes excluded)
    pub fn pairings(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|m| !m.is_bye())
    }
}

/// Swiss pairing generator
pub struct PairingGenerator<R = StdRng> {
    rng: R,
}

impl PairingGenerator<StdRng> {
    /// Create a generator seeded from the OS
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a reproducible generator
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for PairingGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PairingGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Pair `round` of a Swiss component.
    ///
    /// `matches` is the tournament's full match history. Round 1 is paired
    /// randomly, later rounds by score bracket.
    pub fn pair(
        &mut self,
        component: &Component,
        round: &Round,
        registrations: &[TournamentRegistration],
        matches: &[Match],
        at: DateTime<Utc>,
    ) -> EngineResult<RoundPairings> {
        if component.component_type != ComponentType::Swiss {
            return Err(EngineError::UnsupportedComponent(component.component_type));
        }
        if round.status == RoundStatus::Completed {
            return Err(impossible(round, "round is already completed"));
        }
        if matches.iter().any(|m| m.round_id == round.id) {
            return Err(impossible(round, "round already has pairings"));
        }

        if round.round_number <= 1 {
            self.pair_first_round(round, registrations, &component.config, at)
        } else {
            self.pair_swiss_round(round, registrations, matches, &component.config, at)
        }
    }

    /// Random pairing; with an odd count the last player gets the bye.
    pub fn pair_first_round(
        &mut self,
        round: &Round,
        registrations: &[TournamentRegistration],
        config: &ComponentConfig,
        at: DateTime<Utc>,
    ) -> EngineResult<RoundPairings> {
        let mut players = pairable(registrations);
        check_player_count(round, players.len())?;

        // Input order must not influence a seeded shuffle
        players.sort_by_key(|r| r.sequence_id);
        let mut ids: Vec<PlayerId> = players.iter().map(|r| r.player_id).collect();
        ids.shuffle(&mut self.rng);

        let bye = if ids.len() % 2 == 1 { ids.pop() } else { None };
        let pairs: Vec<(PlayerId, PlayerId)> =
            ids.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();

        log::info!(
            "Round {}: paired {} players randomly ({} tables, bye: {})",
            round.round_number,
            players.len(),
            pairs.len(),
            bye.is_some()
        );

        Ok(build(round, config, &pairs, bye, Vec::new(), 0, at))
    }

    /// Score-bracket pairing with rematch avoidance.
    pub fn pair_swiss_round(
        &mut self,
        round: &Round,
        registrations: &[TournamentRegistration],
        matches: &[Match],
        config: &ComponentConfig,
        at: DateTime<Utc>,
    ) -> EngineResult<RoundPairings> {
        let players = pairable(registrations);
        check_player_count(round, players.len())?;

        let standings = rank_players(registrations, matches, config, config.pairing_order());
        let ranked: Vec<Candidate> = standings
            .iter()
            .filter(|e| e.player.is_pairable())
            .map(|e| Candidate {
                id: e.player_id(),
                points: e.match_points,
                byes: e.bye_count,
            })
            .collect();

        let faced = faced_pairs(matches);
        let mut steps = 0;

        let (bye, order, outcome) = if ranked.len() % 2 == 1 {
            self.pair_with_bye(round, &ranked, &faced, config, &mut steps)
        } else {
            let outcome = search(&ranked, &faced, &mut steps);
            (None, ranked.clone(), outcome)
        };

        let (pairs, forced) = match outcome {
            SearchOutcome::Paired(pairs) => (pairs, Vec::new()),
            SearchOutcome::Exhausted => {
                let (pairs, forced) = force_pairs(&order, &faced);
                for (a, b) in &forced {
                    log::warn!(
                        "Round {}: forced rematch between {} and {} (no rematch-free pairing exists)",
                        round.round_number,
                        a,
                        b
                    );
                }
                (pairs, forced)
            }
            SearchOutcome::GaveUp => {
                let (pairs, forced) = force_pairs(&order, &faced);
                for (a, b) in &forced {
                    log::warn!(
                        "Round {}: forced rematch between {} and {} (search stopped after {} steps)",
                        round.round_number,
                        a,
                        b,
                        steps
                    );
                }
                (pairs, forced)
            }
        };

        let points: HashMap<PlayerId, u32> = ranked.iter().map(|c| (c.id, c.points)).collect();
        let pair_downs = pairs
            .iter()
            .filter(|(a, b)| points.get(a) != points.get(b))
            .count();

        log::info!(
            "Round {}: paired {} players ({} tables, {} pair-downs, {} forced rematches, bye: {})",
            round.round_number,
            ranked.len(),
            pairs.len(),
            pair_downs,
            forced.len(),
            bye.is_some()
        );

        Ok(build(round, config, &pairs, bye, forced, pair_downs, at))
    }

    /// Pick the bye so that the rest can still be paired without rematches.
    fn pair_with_bye(
        &mut self,
        round: &Round,
        ranked: &[Candidate],
        faced: &HashSet<(PlayerId, PlayerId)>,
        config: &ComponentConfig,
        steps: &mut usize,
    ) -> (Option<PlayerId>, Vec<Candidate>, SearchOutcome) {
        let candidates = self.bye_candidates(ranked, config);
        let mut exhausted = true;

        for &bye in &candidates {
            if *steps >= MAX_SEARCH_STEPS {
                exhausted = false;
                break;
            }
            let rest: Vec<Candidate> = ranked.iter().copied().filter(|c| c.id != bye).collect();
            match search(&rest, faced, steps) {
                SearchOutcome::Paired(pairs) => {
                    log::debug!("Round {}: bye to {}", round.round_number, bye);
                    note_forced_bye(round, ranked, bye, config);
                    return (Some(bye), rest, SearchOutcome::Paired(pairs));
                }
                SearchOutcome::Exhausted => {}
                SearchOutcome::GaveUp => exhausted = false,
            }
        }

        // Every choice forces a rematch; keep the preferred one
        let bye = candidates[0];
        note_forced_bye(round, ranked, bye, config);
        let rest = ranked.iter().copied().filter(|c| c.id != bye).collect();
        let outcome = if exhausted {
            SearchOutcome::Exhausted
        } else {
            SearchOutcome::GaveUp
        };
        (Some(bye), rest, outcome)
    }

    /// Bye candidates in preference order.
    ///
    /// Players at the bye limit are only considered when nobody else is left.
    fn bye_candidates(&mut self, ranked: &[Candidate], config: &ComponentConfig) -> Vec<PlayerId> {
        let limit = config.max_byes_per_player;
        let (mut eligible, capped): (Vec<Candidate>, Vec<Candidate>) =
            ranked.iter().rev().copied().partition(|c| c.byes < limit);

        if eligible.is_empty() {
            return capped.iter().map(|c| c.id).collect();
        }

        if config.bye_assignment == ByeAssignment::Random {
            let lowest = eligible[0].points;
            let bracket = eligible.iter().take_while(|c| c.points == lowest).count();
            eligible[..bracket].shuffle(&mut self.rng);
        }

        eligible.iter().map(|c| c.id).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: PlayerId,
    points: u32,
    byes: u32,
}

fn impossible(round: &Round, reason: &str) -> EngineError {
    EngineError::PairingImpossible {
        round_number: round.round_number,
        reason: reason.to_string(),
    }
}

fn check_player_count(round: &Round, count: usize) -> EngineResult<()> {
    if count < 2 {
        return Err(impossible(
            round,
            &format!("need at least 2 active players, have {count}"),
        ));
    }
    Ok(())
}

fn pairable(registrations: &[TournamentRegistration]) -> Vec<&TournamentRegistration> {
    registrations.iter().filter(|r| r.is_pairable()).collect()
}

fn pair_key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a < b { (a, b) } else { (b, a) }
}

/// Every pair that already met, pending matches included; byes impose nothing.
fn faced_pairs(matches: &[Match]) -> HashSet<(PlayerId, PlayerId)> {
    matches
        .iter()
        .filter_map(|m| m.player2_id.map(|p2| pair_key(m.player1_id, p2)))
        .collect()
}

fn note_forced_bye(round: &Round, ranked: &[Candidate], bye: PlayerId, config: &ComponentConfig) {
    let over_limit = ranked
        .iter()
        .any(|c| c.id == bye && c.byes >= config.max_byes_per_player);
    if over_limit {
        log::warn!(
            "Round {}: {} receives a bye beyond the limit of {} (no eligible player left)",
            round.round_number,
            bye,
            config.max_byes_per_player
        );
    }
}

enum SearchOutcome {
    Paired(Vec<(PlayerId, PlayerId)>),
    /// Every branch was explored without finding a rematch-free pairing
    Exhausted,
    /// Step limit reached first
    GaveUp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Strategy {
    /// Top unpaired player first, strictly by rank
    Rank,
    /// Player with the fewest possible opponents first, nearest rank partner
    MostConstrained,
}

/// Backtracking search for a rematch-free pairing of `players` (even count).
///
/// The rank-order pass keeps brackets intact. If it runs out of steps the
/// constrained pass retries with the rest of the round's budget.
fn search(
    players: &[Candidate],
    faced: &HashSet<(PlayerId, PlayerId)>,
    steps: &mut usize,
) -> SearchOutcome {
    let mut state = Search::new(players, faced, steps);
    match state.run(Strategy::Rank, RANK_SEARCH_STEPS) {
        SearchOutcome::GaveUp => {
            log::debug!(
                "Rank-order search stopped after {} steps, pairing most constrained players first",
                RANK_SEARCH_STEPS
            );
            state.run(Strategy::MostConstrained, MAX_SEARCH_STEPS)
        }
        outcome => outcome,
    }
}

struct Search<'a> {
    players: &'a [Candidate],
    /// `compatible[a][b]`: a and b have not met
    compatible: Vec<Vec<bool>>,
    paired: Vec<bool>,
    /// Unpaired players each player could still be paired with
    open: Vec<usize>,
    pairs: Vec<(usize, usize)>,
    steps: &'a mut usize,
    pass_steps: usize,
    limit: usize,
    strategy: Strategy,
    gave_up: bool,
}

impl<'a> Search<'a> {
    fn new(
        players: &'a [Candidate],
        faced: &HashSet<(PlayerId, PlayerId)>,
        steps: &'a mut usize,
    ) -> Self {
        let n = players.len();
        let compatible: Vec<Vec<bool>> = (0..n)
            .map(|a| {
                (0..n)
                    .map(|b| a != b && !faced.contains(&pair_key(players[a].id, players[b].id)))
                    .collect()
            })
            .collect();
        let open = compatible
            .iter()
            .map(|row| row.iter().filter(|&&ok| ok).count())
            .collect();

        Self {
            players,
            compatible,
            paired: vec![false; n],
            open,
            pairs: Vec::with_capacity(n / 2),
            steps,
            pass_steps: 0,
            limit: 0,
            strategy: Strategy::Rank,
            gave_up: false,
        }
    }

    fn run(&mut self, strategy: Strategy, limit: usize) -> SearchOutcome {
        self.strategy = strategy;
        self.limit = limit;
        self.pass_steps = 0;
        self.gave_up = false;

        if self.viable() && self.solve() {
            let players = self.players;
            return SearchOutcome::Paired(
                self.pairs
                    .iter()
                    .map(|&(a, b)| (players[a].id, players[b].id))
                    .collect(),
            );
        }
        if self.gave_up {
            SearchOutcome::GaveUp
        } else {
            SearchOutcome::Exhausted
        }
    }

    fn solve(&mut self) -> bool {
        let Some(top) = self.next_player() else {
            return true;
        };
        self.take(top);

        let mut partners: Vec<usize> = (0..self.players.len())
            .filter(|&other| !self.paired[other] && self.compatible[top][other])
            .collect();
        if self.strategy == Strategy::MostConstrained {
            partners.sort_by_key(|&other| (other.abs_diff(top), other));
        }

        for other in partners {
            if *self.steps >= MAX_SEARCH_STEPS || self.pass_steps >= self.limit {
                self.gave_up = true;
                break;
            }
            *self.steps += 1;
            self.pass_steps += 1;

            self.take(other);
            self.pairs.push((top, other));
            if self.viable() && self.solve() {
                return true;
            }
            self.pairs.pop();
            self.release(other);
        }

        self.release(top);
        false
    }

    fn next_player(&self) -> Option<usize> {
        let mut unpaired = (0..self.players.len()).filter(|&i| !self.paired[i]);
        match self.strategy {
            Strategy::Rank => unpaired.next(),
            Strategy::MostConstrained => unpaired.min_by_key(|&i| (self.open[i], i)),
        }
    }

    fn take(&mut self, player: usize) {
        self.paired[player] = true;
        for other in 0..self.players.len() {
            if !self.paired[other] && self.compatible[other][player] {
                self.open[other] -= 1;
            }
        }
    }

    fn release(&mut self, player: usize) {
        for other in 0..self.players.len() {
            if !self.paired[other] && self.compatible[other][player] {
                self.open[other] += 1;
            }
        }
        self.paired[player] = false;
    }

    /// Every unpaired player still has someone new to play
    fn viable(&self) -> bool {
        (0..self.players.len()).all(|i| self.paired[i] || self.open[i] > 0)
    }
}

/// Greedy pairing that prefers new opponents but accepts rematches.
fn force_pairs(
    players: &[Candidate],
    faced: &HashSet<(PlayerId, PlayerId)>,
) -> (Vec<(PlayerId, PlayerId)>, Vec<(PlayerId, PlayerId)>) {
    let mut paired = vec![false; players.len()];
    let mut pairs = Vec::new();
    let mut forced = Vec::new();

    for top in 0..players.len() {
        if paired[top] {
            continue;
        }
        let open: Vec<usize> = (top + 1..players.len()).filter(|&i| !paired[i]).collect();
        let fresh = open
            .iter()
            .copied()
            .find(|&i| !faced.contains(&pair_key(players[top].id, players[i].id)));

        let Some(other) = fresh.or_else(|| open.first().copied()) else {
            continue;
        };
        paired[top] = true;
        paired[other] = true;
        let pair = (players[top].id, players[other].id);
        if fresh.is_none() {
            forced.push(pair);
        }
        pairs.push(pair);
    }

    (pairs, forced)
}

fn build(
    round: &Round,
    config: &ComponentConfig,
    pairs: &[(PlayerId, PlayerId)],
    bye: Option<PlayerId>,
    forced_rematches: Vec<(PlayerId, PlayerId)>,
    pair_downs: usize,
    at: DateTime<Utc>,
) -> RoundPairings {
    let mut matches: Vec<Match> = pairs
        .iter()
        .zip(1u32..)
        .map(|(&(p1, p2), table)| Match::pairing(round, table, p1, p2))
        .collect();

    if let Some(player) = bye {
        let score = config.bye_points;
        matches.push(Match::bye(round, player, score.wins, score.draws, at));
    }

    RoundPairings {
        matches,
        bye,
        forced_rematches,
        pair_downs,
    }
}
