//! Component configuration.
//!
//! Components are stored with a loosely-typed JSON config map. It is parsed
//! once into [`ComponentConfig`], rejecting unknown keys and bad values, so
//! pairing and standings code never sees a malformed setting.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default floor for MW%, GW% and OMW% (MTG Swiss rules)
pub const DEFAULT_FLOOR: f64 = 0.33;
/// Default games credited for a bye (2-0)
pub const DEFAULT_BYE_WINS: u32 = 2;
/// Seed used for the `random` tie-break when the config does not set one
pub const DEFAULT_TIEBREAK_SEED: u64 = 0x5EED_CAFE;

/// Metric used to order players with equal match points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tiebreaker {
    /// Opponent match win percentage
    Omw,
    /// Game win percentage
    Gw,
    /// Opponent game win percentage
    Ogw,
    /// Match win percentage
    Mw,
    MatchWins,
    GameWins,
    /// Registration sequence number, ascending
    PlayerNumber,
    /// Seeded random draw
    Random,
}

impl std::fmt::Display for Tiebreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tiebreaker::Omw => write!(f, "omw"),
            Tiebreaker::Gw => write!(f, "gw"),
            Tiebreaker::Ogw => write!(f, "ogw"),
            Tiebreaker::Mw => write!(f, "mw"),
            Tiebreaker::MatchWins => write!(f, "match_wins"),
            Tiebreaker::GameWins => write!(f, "game_wins"),
            Tiebreaker::PlayerNumber => write!(f, "player_number"),
            Tiebreaker::Random => write!(f, "random"),
        }
    }
}

/// Game score credited to a player receiving a bye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ByePoints {
    pub wins: u32,
    #[serde(default)]
    pub draws: u32,
}

impl Default for ByePoints {
    fn default() -> Self {
        Self {
            wins: DEFAULT_BYE_WINS,
            draws: 0,
        }
    }
}

/// Who receives the bye in an odd round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByeAssignment {
    /// Lowest-ranked eligible player
    #[default]
    LowestRanked,
    /// Random eligible player from the lowest score bracket
    Random,
}

fn default_tiebreakers() -> Vec<Tiebreaker> {
    vec![Tiebreaker::Omw, Tiebreaker::Gw, Tiebreaker::Ogw]
}

fn default_floor() -> f64 {
    DEFAULT_FLOOR
}

fn default_max_byes() -> u32 {
    1
}

/// Validated component configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfig {
    /// Standings tie-break order
    #[serde(default = "default_tiebreakers", alias = "standings_tiebreakers")]
    pub tiebreakers: Vec<Tiebreaker>,

    /// Order inside a score bracket when pairing (defaults to `tiebreakers`)
    #[serde(default)]
    pub pairing_tiebreakers: Option<Vec<Tiebreaker>>,

    /// Number of rounds to play (None = until ended manually)
    #[serde(default, alias = "rounds")]
    pub max_rounds: Option<u32>,

    /// Rounds to play before an early finish may be considered
    #[serde(default)]
    pub min_rounds: Option<u32>,

    #[serde(default = "default_floor")]
    pub mw_floor: f64,

    #[serde(default = "default_floor")]
    pub gw_floor: f64,

    #[serde(default = "default_floor")]
    pub omw_floor: f64,

    #[serde(default)]
    pub bye_points: ByePoints,

    #[serde(default = "default_max_byes")]
    pub max_byes_per_player: u32,

    #[serde(default)]
    pub bye_assignment: ByeAssignment,

    /// Seed for the `random` tie-break draw
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            tiebreakers: default_tiebreakers(),
            pairing_tiebreakers: None,
            max_rounds: None,
            min_rounds: None,
            mw_floor: DEFAULT_FLOOR,
            gw_floor: DEFAULT_FLOOR,
            omw_floor: DEFAULT_FLOOR,
            bye_points: ByePoints::default(),
            max_byes_per_player: default_max_byes(),
            bye_assignment: ByeAssignment::default(),
            random_seed: None,
        }
    }
}

impl ComponentConfig {
    /// Build from a stored JSON config map and validate it
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        // Stored components may carry `null` for "no config"
        let value = if value.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            value
        };
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from a JSON string and validate it
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, floor) in [
            ("mw_floor", self.mw_floor),
            ("gw_floor", self.gw_floor),
            ("omw_floor", self.omw_floor),
        ] {
            if !(0.0..=1.0).contains(&floor) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 0 and 1, got {floor}"
                )));
            }
        }

        if self.max_rounds == Some(0) {
            return Err(ConfigError::Invalid("max_rounds must be at least 1".into()));
        }

        if let (Some(min), Some(max)) = (self.min_rounds, self.max_rounds) {
            if min > max {
                return Err(ConfigError::Invalid(format!(
                    "min_rounds ({min}) exceeds max_rounds ({max})"
                )));
            }
        }

        check_order("tiebreakers", &self.tiebreakers)?;
        if let Some(order) = &self.pairing_tiebreakers {
            check_order("pairing_tiebreakers", order)?;
        }

        if self.bye_points.wins == 0 && self.bye_points.draws == 0 {
            return Err(ConfigError::Invalid(
                "bye_points must credit at least one game".into(),
            ));
        }

        Ok(())
    }

    /// Tie-break order used inside score brackets when pairing
    pub fn pairing_order(&self) -> &[Tiebreaker] {
        self.pairing_tiebreakers
            .as_deref()
            .unwrap_or(&self.tiebreakers)
    }

    /// Seed for the `random` tie-break draw
    pub fn tiebreak_seed(&self) -> u64 {
        self.random_seed.unwrap_or(DEFAULT_TIEBREAK_SEED)
    }

    pub fn with_tiebreakers(mut self, tiebreakers: Vec<Tiebreaker>) -> Self {
        self.tiebreakers = tiebreakers;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }
}

fn check_order(name: &str, order: &[Tiebreaker]) -> Result<(), ConfigError> {
    if order.is_empty() {
        return Err(ConfigError::Invalid(format!("{name} must not be empty")));
    }
    for (i, metric) in order.iter().enumerate() {
        if order[..i].contains(metric) {
            return Err(ConfigError::Invalid(format!(
                "{name} lists {metric} more than once"
            )));
        }
    }
    Ok(())
}
