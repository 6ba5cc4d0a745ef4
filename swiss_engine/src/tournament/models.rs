//! Tournament data models: tournaments, registrations, components, rounds and matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ComponentConfig;

/// Tournament ID type
pub type TournamentId = Uuid;
/// Player ID type
pub type PlayerId = Uuid;
/// Registration ID type
pub type RegistrationId = Uuid;
/// Component ID type
pub type ComponentId = Uuid;
/// Round ID type
pub type RoundId = Uuid;
/// Match ID type
pub type MatchId = Uuid;

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Being set up
    Draft,
    /// Players can register
    RegistrationOpen,
    /// No new players
    RegistrationClosed,
    /// Rounds are being played
    InProgress,
    /// Finished
    Completed,
    /// Terminated early
    Cancelled,
}

impl TournamentStatus {
    /// Whether the state machine allows `self -> next`.
    pub fn can_transition_to(self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;
        match self {
            Draft => matches!(next, RegistrationOpen | Cancelled),
            RegistrationOpen => matches!(next, RegistrationClosed | InProgress | Cancelled),
            RegistrationClosed => matches!(next, InProgress | Cancelled),
            InProgress => matches!(next, Completed | Cancelled),
            Completed | Cancelled => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Cancelled)
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentStatus::Draft => write!(f, "draft"),
            TournamentStatus::RegistrationOpen => write!(f, "registration_open"),
            TournamentStatus::RegistrationClosed => write!(f, "registration_closed"),
            TournamentStatus::InProgress => write!(f, "in_progress"),
            TournamentStatus::Completed => write!(f, "completed"),
            TournamentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Tournament access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentVisibility {
    #[default]
    Public,
    Private,
}

/// Registration control settings.
///
/// Passwords and auto open/close times are enforced by the hosting service;
/// the engine only reads `max_players`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistrationControl {
    pub auto_open_time: Option<DateTime<Utc>>,
    pub auto_close_time: Option<DateTime<Utc>>,
    pub registration_password: Option<String>,
    pub late_registration_password: Option<String>,
    pub allow_to_override: bool,
    pub to_override_password: Option<String>,
    /// Cap on ACTIVE registrations (None = unlimited)
    pub max_players: Option<usize>,
}

/// Tournament definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub status: TournamentStatus,
    pub visibility: TournamentVisibility,
    pub registration: RegistrationControl,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Advance automatically once every match of a round is reported
    pub auto_advance_rounds: bool,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
}

impl Tournament {
    /// Create a new tournament in DRAFT
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: TournamentStatus::Draft,
            visibility: TournamentVisibility::Public,
            registration: RegistrationControl::default(),
            start_time: None,
            end_time: None,
            auto_advance_rounds: false,
            created_at,
            description: None,
        }
    }

    /// Set the status, for building fixtures and restoring persisted state
    pub fn with_status(mut self, status: TournamentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_max_players(mut self, max_players: usize) -> Self {
        self.registration.max_players = Some(max_players);
        self
    }

    pub fn with_auto_advance(mut self, auto_advance_rounds: bool) -> Self {
        self.auto_advance_rounds = auto_advance_rounds;
        self
    }
}

/// Player participation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,
    Dropped,
    LateEntry,
}

impl std::fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerStatus::Active => write!(f, "active"),
            PlayerStatus::Dropped => write!(f, "dropped"),
            PlayerStatus::LateEntry => write!(f, "late_entry"),
        }
    }
}

/// Player registration for a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentRegistration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    /// Per-tournament player number (#1, #2, ...)
    pub sequence_id: u32,
    pub status: PlayerStatus,
    pub registration_time: DateTime<Utc>,
    pub drop_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl TournamentRegistration {
    /// Create an ACTIVE registration
    pub fn new(
        tournament_id: TournamentId,
        player_id: PlayerId,
        sequence_id: u32,
        registration_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            player_id,
            sequence_id,
            status: PlayerStatus::Active,
            registration_time,
            drop_time: None,
            notes: None,
        }
    }

    /// Whether the player takes part in future pairings
    pub fn is_pairable(&self) -> bool {
        matches!(self.status, PlayerStatus::Active | PlayerStatus::LateEntry)
    }
}

/// Pairing system of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Swiss,
    SingleElimination,
    RoundRobin,
    PoolPlay,
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentType::Swiss => write!(f, "swiss"),
            ComponentType::SingleElimination => write!(f, "single_elimination"),
            ComponentType::RoundRobin => write!(f, "round_robin"),
            ComponentType::PoolPlay => write!(f, "pool_play"),
        }
    }
}

/// Component lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Pending,
    Active,
    Completed,
}

impl ComponentStatus {
    pub fn can_transition_to(self, next: ComponentStatus) -> bool {
        matches!(
            (self, next),
            (ComponentStatus::Pending, ComponentStatus::Active)
                | (ComponentStatus::Active, ComponentStatus::Completed)
        )
    }
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentStatus::Pending => write!(f, "pending"),
            ComponentStatus::Active => write!(f, "active"),
            ComponentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Tournament component ("Swiss Rounds", "Top 8", ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub tournament_id: TournamentId,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub name: String,
    /// Order within the tournament (1, 2, 3...)
    pub sequence_order: u32,
    pub status: ComponentStatus,
    pub config: ComponentConfig,
}

impl Component {
    /// Create a PENDING Swiss component
    pub fn swiss(tournament_id: TournamentId, config: ComponentConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            component_type: ComponentType::Swiss,
            name: "Swiss Rounds".to_string(),
            sequence_order: 1,
            status: ComponentStatus::Pending,
            config,
        }
    }
}

/// Round lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    Active,
    Completed,
}

impl RoundStatus {
    /// Rounds only move forward; there is no reopening.
    pub fn can_transition_to(self, next: RoundStatus) -> bool {
        matches!(
            (self, next),
            (RoundStatus::Pending, RoundStatus::Active)
                | (RoundStatus::Active, RoundStatus::Completed)
        )
    }
}

impl std::fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundStatus::Pending => write!(f, "pending"),
            RoundStatus::Active => write!(f, "active"),
            RoundStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Round within a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    pub component_id: ComponentId,
    /// 1-indexed, contiguous per component
    pub round_number: u32,
    pub status: RoundStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub time_limit_minutes: Option<u32>,
}

impl Round {
    /// Create an ACTIVE round started at `at`
    pub fn active(
        tournament_id: TournamentId,
        component_id: ComponentId,
        round_number: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            component_id,
            round_number,
            status: RoundStatus::Active,
            start_time: Some(at),
            end_time: None,
            time_limit_minutes: None,
        }
    }
}

/// The other side of a match, from one player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opponent {
    Real(PlayerId),
    Bye,
}

impl Opponent {
    pub fn id(self) -> Option<PlayerId> {
        match self {
            Opponent::Real(id) => Some(id),
            Opponent::Bye => None,
        }
    }
}

/// Match result from one player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
    /// Unopposed win
    Bye,
}

/// Individual match between two players, or a bye when `player2_id` is None
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub component_id: ComponentId,
    pub round_id: RoundId,
    pub round_number: u32,
    pub table_number: Option<u32>,
    pub player1_id: PlayerId,
    /// None for a bye
    pub player2_id: Option<PlayerId>,
    pub player1_wins: u32,
    pub player2_wins: u32,
    pub draws: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Match {
    /// Create an unscored pairing for `round`
    pub fn pairing(round: &Round, table_number: u32, player1: PlayerId, player2: PlayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id: round.tournament_id,
            component_id: round.component_id,
            round_id: round.id,
            round_number: round.round_number,
            table_number: Some(table_number),
            player1_id: player1,
            player2_id: Some(player2),
            player1_wins: 0,
            player2_wins: 0,
            draws: 0,
            start_time: round.start_time,
            end_time: None,
            notes: None,
        }
    }

    /// Create a bye for `round`, already carrying its score
    pub fn bye(round: &Round, player: PlayerId, wins: u32, draws: u32, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id: round.tournament_id,
            component_id: round.component_id,
            round_id: round.id,
            round_number: round.round_number,
            table_number: None,
            player1_id: player,
            player2_id: None,
            player1_wins: wins,
            player2_wins: 0,
            draws,
            start_time: Some(at),
            end_time: Some(at),
            notes: None,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.player2_id.is_none()
    }

    /// Whether a result has been recorded
    pub fn is_reported(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn involves(&self, player: PlayerId) -> bool {
        self.player1_id == player || self.player2_id == Some(player)
    }

    /// The opponent of `player`, or None if `player` is not in this match
    pub fn opponent_of(&self, player: PlayerId) -> Option<Opponent> {
        if self.player1_id == player {
            Some(self.player2_id.map_or(Opponent::Bye, Opponent::Real))
        } else if self.player2_id == Some(player) {
            Some(Opponent::Real(self.player1_id))
        } else {
            None
        }
    }

    /// Games won and lost by `player` in this match (byes are scored by config)
    pub fn games_for(&self, player: PlayerId) -> (u32, u32) {
        if self.player1_id == player {
            (self.player1_wins, self.player2_wins)
        } else {
            (self.player2_wins, self.player1_wins)
        }
    }

    /// Match outcome for `player`, or None if `player` is not in this match
    pub fn outcome_for(&self, player: PlayerId) -> Option<MatchOutcome> {
        if !self.involves(player) {
            return None;
        }
        if self.is_bye() {
            return Some(MatchOutcome::Bye);
        }
        let (won, lost) = self.games_for(player);
        Some(match won.cmp(&lost) {
            std::cmp::Ordering::Greater => MatchOutcome::Win,
            std::cmp::Ordering::Less => MatchOutcome::Loss,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        })
    }
}
