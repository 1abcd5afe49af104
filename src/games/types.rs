use crate::errors::{EngineError, EngineResult};
use crate::games::blackjack::{Action, Settlement};
use crate::games::cards::Card;
use crate::games::dice::Direction;
use crate::games::plinko::Risk;
use crate::session::SeedCommitment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Dice,
    Plinko,
    Blackjack,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Dice => write!(f, "dice"),
            GameType::Plinko => write!(f, "plinko"),
            GameType::Blackjack => write!(f, "blackjack"),
        }
    }
}

/// Game outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
    Push,
}

impl GameOutcome {
    /// Outcome of a settled bet judged by its total return
    pub fn from_return(staked: f64, payout: f64) -> Self {
        if payout > staked {
            GameOutcome::Win
        } else if payout < staked {
            GameOutcome::Loss
        } else {
            GameOutcome::Push
        }
    }
}

/// Everything a player needs to recompute the outcome once the server seed is revealed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FairnessProof {
    pub hashed_server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
}

impl FairnessProof {
    pub fn new(commitment: &SeedCommitment, nonce: u64) -> Self {
        Self {
            hashed_server_seed: commitment.hashed_server_seed.clone(),
            client_seed: commitment.client_seed.clone(),
            nonce,
        }
    }
}

/// Game-specific data (discriminated union)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameData {
    Dice {
        target: u8,
        direction: Direction,
        roll: f64,
        win_chance: f64,
        house_edge_percent: f64,
    },
    Plinko {
        rows: u8,
        risk: Risk,
        bin: u8,
    },
    Blackjack {
        /// Stake placed on the deal
        bet: f64,
        /// Cards in dealing order; always a prefix of the shuffled deck
        dealt_cards: Vec<Card>,
        actions: Vec<Action>,
        settlement: Settlement,
    },
}

impl GameData {
    pub fn game_type(&self) -> GameType {
        match self {
            GameData::Dice { .. } => GameType::Dice,
            GameData::Plinko { .. } => GameType::Plinko,
            GameData::Blackjack { .. } => GameType::Blackjack,
        }
    }
}

/// Complete settled game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameResult {
    pub game_id: String,
    pub game_type: GameType,
    pub bet_amount: f64,
    pub payout_amount: f64,
    pub multiplier: f64,
    pub outcome: GameOutcome,
    pub proof: FairnessProof,
    pub timestamp: DateTime<Utc>,
    pub game_data: GameData,
}

impl GameResult {
    pub fn new(
        game_type: GameType,
        bet_amount: f64,
        payout_amount: f64,
        multiplier: f64,
        outcome: GameOutcome,
        proof: FairnessProof,
        game_data: GameData,
    ) -> Self {
        Self {
            game_id: Uuid::new_v4().to_string(),
            game_type,
            bet_amount,
            payout_amount,
            multiplier,
            outcome,
            proof,
            timestamp: Utc::now(),
            game_data,
        }
    }
}

/// Bets must be finite and strictly positive
pub fn validate_bet(bet_amount: f64) -> EngineResult<()> {
    if !bet_amount.is_finite() || bet_amount <= 0.0 {
        return Err(EngineError::invalid_parameter(
            "bet_amount",
            format!("{} must be a positive finite amount", bet_amount),
        ));
    }
    Ok(())
}
