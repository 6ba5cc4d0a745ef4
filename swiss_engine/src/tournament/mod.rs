//! Tournament state: data models, registration and the lifecycle state machine.
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use swiss_engine::config::ComponentConfig;
//! use swiss_engine::tournament::{
//!     Component, Tournament, lifecycle, registration,
//! };
//!
//! let now = Utc::now();
//! let mut tournament = lifecycle::open_registration(&Tournament::new("Friday Swiss", now))?;
//! let mut component = Component::swiss(tournament.id, ComponentConfig::default().with_max_rounds(3));
//!
//! let mut players = Vec::new();
//! for _ in 0..4 {
//!     let player = registration::register_player(&tournament, uuid::Uuid::new_v4(), &players, now)?;
//!     players.push(player);
//! }
//!
//! let round = lifecycle::start_tournament(&tournament, &component, &players, now)?
//!     .commit(&mut tournament, &mut component);
//! assert_eq!(round.round_number, 1);
//! # Ok::<(), swiss_engine::EngineError>(())
//! ```

pub mod lifecycle;
pub mod models;
pub mod registration;

pub use lifecycle::{
    RoundAdvance, TournamentEnd, TournamentStart, advance_to_next_round, auto_advance,
    cancel_tournament, close_registration, complete_round, end_tournament, is_round_complete,
    open_registration, should_tournament_end, start_tournament,
};
pub use models::{
    Component, ComponentId, ComponentStatus, ComponentType, Match, MatchId, MatchOutcome,
    Opponent, PlayerId, PlayerStatus, RegistrationControl, RegistrationId, Round, RoundId,
    RoundStatus, Tournament, TournamentId, TournamentRegistration, TournamentStatus,
    TournamentVisibility,
};
pub use registration::{drop_player, next_sequence_id, register_player};
