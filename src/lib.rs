//! fairseed - provably fair outcome engine
//!
//! Commit-reveal seed sessions, a deterministic SHA-256 draw function and the
//! Dice, Blackjack and Plinko mappers built on it. Every outcome can be
//! recomputed by a third party once the server seed is revealed.

pub mod api;
pub mod config;
pub mod draw;
pub mod errors;
pub mod games;
pub mod session;
pub mod store;

pub use config::{ConfigLoader, FairseedConfig, GameConfig};
pub use draw::{draw, draw_int, DrawInput};
pub use errors::{EngineError, EngineResult, FairseedError, FairseedResult};
pub use games::{GameProcessor, GameResult, VerificationReport};
pub use session::{hash_server_seed, verify_commitment, RevealedSeed, SeedCommitment, Session};
pub use store::SessionStore;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_tracing(logging: &config::LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
