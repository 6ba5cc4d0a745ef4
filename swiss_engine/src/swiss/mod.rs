//! Swiss scoring and pairing: tiebreakers, standings, pairings and results.

pub mod pairing;
pub mod results;
pub mod standings;
pub mod tiebreakers;

pub use pairing::{PairingGenerator, RoundPairings};
pub use results::{ResultSubmission, submit_result};
pub use standings::{StandingsEntry, calculate_standings};
pub use tiebreakers::{
    PlayerRecord, TiebreakerCalculator, TiebreakerValues, game_win_percentage,
    match_win_percentage, opponent_game_win_percentage, opponent_match_win_percentage,
};
