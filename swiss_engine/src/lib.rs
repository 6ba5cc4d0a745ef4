//! # Swiss Engine
//!
//! Pairing, round lifecycle, standings and tiebreakers for Swiss-system
//! tournaments.
//!
//! The engine is a synchronous library over plain value objects. It does no
//! I/O and holds no global state: callers pass in the tournament, its
//! registrations and its match history, and get new values (or a typed
//! [`EngineError`]) back. Persistence and transport belong to the host.
//!
//! ## Architecture
//!
//! - **Tiebreakers**: MW%, GW%, OMW% and OGW% with configurable floors
//! - **Standings**: match points, then the configured tie-break order, then
//!   player number, so ranks are always distinct
//! - **Pairing**: random round 1, then score brackets with rematch avoidance,
//!   pair-downs and bye limits
//! - **Results**: one validated result per match
//! - **Lifecycle**: tournament and round state machines with an explicit
//!   commit step
//!
//! ## Core Modules
//!
//! - [`tournament`]: data models, registration and lifecycle
//! - [`swiss`]: tiebreakers, standings, pairing and results
//! - [`config`]: typed component configuration
//! - [`coordinator`]: one in-flight mutating operation per tournament
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use swiss_engine::{
//!     ComponentConfig, PairingGenerator, calculate_standings,
//!     tournament::{Component, Tournament, TournamentRegistration, TournamentStatus, lifecycle},
//! };
//!
//! let now = Utc::now();
//! let mut tournament = Tournament::new("Sunday Swiss", now).with_status(TournamentStatus::RegistrationOpen);
//! let mut component = Component::swiss(tournament.id, ComponentConfig::default().with_max_rounds(3));
//! let players: Vec<TournamentRegistration> = (1..=7)
//!     .map(|n| TournamentRegistration::new(tournament.id, uuid::Uuid::new_v4(), n, now))
//!     .collect();
//!
//! let round = lifecycle::start_tournament(&tournament, &component, &players, now)?
//!     .commit(&mut tournament, &mut component);
//!
//! let pairings = PairingGenerator::from_seed(7).pair(&component, &round, &players, &[], now)?;
//! assert_eq!(pairings.matches.len(), 4);
//! assert!(pairings.bye.is_some());
//!
//! let standings = calculate_standings(&players, &pairings.matches, &component.config);
//! assert_eq!(standings[0].player_id(), pairings.bye.unwrap());
//! # Ok::<(), swiss_engine::EngineError>(())
//! ```

/// Typed component configuration.
pub mod config;
pub use config::{ByeAssignment, ByePoints, ComponentConfig, Tiebreaker};

/// Per-tournament operation guard.
pub mod coordinator;
pub use coordinator::{Operation, OperationGuard, TournamentLocks};

/// Error types.
pub mod errors;
pub use errors::{ConfigError, EngineError, EngineResult, Transition};

/// Tiebreakers, standings, pairing and result submission.
pub mod swiss;
pub use swiss::{
    PairingGenerator, ResultSubmission, RoundPairings, StandingsEntry, calculate_standings,
    submit_result,
};

/// Tournament models, registration and lifecycle.
pub mod tournament;
