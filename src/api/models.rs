//! API Request/Response Models

use crate::games::{
    blackjack::{Action, BlackjackView},
    dice::Direction,
    plinko::{Risk, Step},
    types::GameResult,
};
use crate::session::{RevealedSeed, SeedCommitment};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: usize,
}

/// Public state of a session. Never carries the unrevealed server seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub hashed_server_seed: String,
    pub client_seed: String,
    /// Nonce the next bet will use
    pub nonce: u64,
    pub round_in_progress: bool,
}

impl SessionView {
    pub fn new(session_id: &str, commitment: SeedCommitment, round_in_progress: bool) -> Self {
        Self {
            session_id: session_id.to_string(),
            hashed_server_seed: commitment.hashed_server_seed,
            client_seed: commitment.client_seed,
            nonce: commitment.nonce,
            round_in_progress,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedRequest {
    #[serde(default)]
    pub client_seed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateResponse {
    pub revealed: RevealedSeed,
    pub session: SessionView,
}

/// Final state of a closed session: every seed pair it used, the last one just revealed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseSessionResponse {
    pub session_id: String,
    pub revealed: Vec<RevealedSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceRequest {
    pub bet_amount: f64,
    pub target: u8,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlinkoRequest {
    pub bet_amount: f64,
    pub rows: u8,
    pub risk: Risk,
    #[serde(default = "default_balls")]
    pub balls: u32,
}

fn default_balls() -> u32 {
    1
}

/// `paths[i]` animates `results[i]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlinkoResponse {
    pub results: Vec<GameResult>,
    pub paths: Vec<Vec<Step>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackjackStartRequest {
    pub bet_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackjackActionRequest {
    pub action: Action,
}

/// Round view, plus the settled record once the round completes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackjackResponse {
    #[serde(flatten)]
    pub view: BlackjackView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub server_seed: String,
    pub result: GameResult,
}
