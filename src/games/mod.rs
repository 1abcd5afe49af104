pub mod blackjack;
pub mod cards;
pub mod dice;
pub mod plinko;
pub mod processor;
pub mod types;
pub mod verify;

pub use processor::{BlackjackPlay, GameProcessor, PlinkoDrop};
pub use types::*;
pub use verify::{verify_result, VerificationReport};
