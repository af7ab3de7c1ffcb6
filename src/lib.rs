//! # SocialSim - Social Network Activity Simulator
//!
//! Exercises a social network API end-to-end: signs up a population of
//! synthetic users, has each of them publish random dictionary entries, and
//! then lets users like each other's posts until no further like is possible.
//!
//! ## Features
//!
//! - Unique, human-readable usernames for synthetic users
//! - Post bodies drawn from a word -> definition dictionary
//! - Round-based like assignment with per-user caps, no self-likes and no
//!   duplicate likes, ending exactly when no user can like anything else
//! - Reproducible runs from a single seed
//! - Real HTTP gateway or an in-memory offline gateway with fault injection
//!
//! ## Usage
//!
//! ### As a CLI
//!
//! ```bash
//! # Offline run with a fixed seed
//! socialsim run --offline --users 5 --max-posts 3 --max-likes 4 --seed 42
//!
//! # Against a running service, settings from a file
//! socialsim run --config settings.yaml
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use socialsim::{
//!     create_content_provider, InMemoryGateway, Simulation, SimulationConfig,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(InMemoryGateway::new());
//! let content = create_content_provider(None)?;
//! let mut simulation = Simulation::new(SimulationConfig::new(5, 3, 4), gateway, content, 42);
//!
//! let summary = simulation.run().await;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content;
pub mod engine;
pub mod gateway;
pub mod identity;
pub mod report;

// Re-export commonly used types
pub use config::{Config, ConfigError, SimulationConfig};
pub use content::{create_content_provider, ContentProvider, Dictionary, DictionaryContent};
pub use engine::{LikePhaseReport, Simulation, SimulationError};
pub use gateway::{
    create_gateway, FaultConfig, GatewayError, HttpGateway, InMemoryGateway, PostId,
    ServiceGateway, UserId,
};
pub use identity::{IdentityError, IdentityGenerator};
pub use report::{Phase, RunOutcome, RunSummary};
