//! Third-party verification of settled games.
//!
//! Given the revealed server seed, anyone can check the published commitment
//! and recompute a game from its fairness proof. Nothing here touches a live
//! session.

use crate::draw::{validate_seed, DrawInput};
use crate::errors::EngineResult;
use crate::games::blackjack::{Action, BlackjackRound};
use crate::games::cards::Card;
use crate::games::dice::{self, DiceOutcome, Direction};
use crate::games::plinko::{self, PlinkoOutcome, Risk, Step};
use crate::games::types::{GameData, GameOutcome, GameResult};
use crate::session::verify_commitment;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What the verifier computed independently of the stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum Recomputed {
    Dice {
        roll: f64,
        win: bool,
        multiplier: f64,
        payout: f64,
    },
    Plinko {
        bin: u8,
        multiplier: f64,
        payout: f64,
        path: Vec<Step>,
    },
    Blackjack {
        dealt_cards: Vec<Card>,
        total_staked: f64,
        total_payout: f64,
    },
    /// The stored record could not be replayed at all
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub game_id: String,
    /// SHA-256 of the revealed seed equals the hash published before play
    pub commitment_valid: bool,
    /// The recomputed outcome agrees with the stored record
    pub outcome_matches: bool,
    pub recomputed: Recomputed,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.commitment_valid && self.outcome_matches
    }
}

pub fn replay_dice(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    target: u8,
    direction: Direction,
    house_edge_percent: f64,
) -> EngineResult<DiceOutcome> {
    let input = DrawInput::new(server_seed, client_seed, nonce)?;
    dice::play(&input, target, direction, house_edge_percent)
}

pub fn replay_plinko(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    rows: u8,
    risk: Risk,
) -> EngineResult<(PlinkoOutcome, Vec<Step>)> {
    let input = DrawInput::new(server_seed, client_seed, nonce)?;
    let outcome = plinko::drop_ball(&input, rows, risk)?;
    let path = plinko::path(&input, rows, outcome.bin)?;
    Ok((outcome, path))
}

/// Re-deal a blackjack round and apply the recorded actions in order
pub fn replay_blackjack(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    bet: f64,
    actions: &[Action],
) -> EngineResult<BlackjackRound> {
    let input = DrawInput::new(server_seed, client_seed, nonce)?;
    let mut round = BlackjackRound::deal(&input, bet)?;
    for action in actions {
        round.apply(*action)?;
    }
    Ok(round)
}

/// Check a stored result against the revealed server seed.
///
/// Only a malformed server seed is an error. A record that cannot be replayed
/// (tampered parameters, impossible action sequence) yields a failed report.
pub fn verify_result(server_seed: &str, result: &GameResult) -> EngineResult<VerificationReport> {
    validate_seed("server", server_seed)?;
    let commitment_valid = verify_commitment(server_seed, &result.proof.hashed_server_seed);

    let (outcome_matches, recomputed) = match recompute(server_seed, result) {
        Ok((matches, recomputed)) => (
            matches && result.game_type == result.game_data.game_type(),
            recomputed,
        ),
        Err(e) => (
            false,
            Recomputed::Rejected {
                reason: e.to_string(),
            },
        ),
    };

    if !commitment_valid || !outcome_matches {
        warn!(
            game_id = %result.game_id,
            commitment_valid,
            outcome_matches,
            "Verification mismatch"
        );
    }

    Ok(VerificationReport {
        game_id: result.game_id.clone(),
        commitment_valid,
        outcome_matches,
        recomputed,
    })
}

fn recompute(server_seed: &str, result: &GameResult) -> EngineResult<(bool, Recomputed)> {
    let proof = &result.proof;
    match &result.game_data {
        GameData::Dice {
            target,
            direction,
            roll,
            house_edge_percent,
            ..
        } => {
            let outcome = replay_dice(
                server_seed,
                &proof.client_seed,
                proof.nonce,
                *target,
                *direction,
                *house_edge_percent,
            )?;
            let payout = if outcome.win {
                result.bet_amount * outcome.multiplier.value
            } else {
                0.0
            };
            let matches = approx_eq(outcome.roll, *roll)
                && result.outcome == win_or_loss(outcome.win)
                && approx_eq(outcome.multiplier.value, result.multiplier)
                && approx_eq(payout, result.payout_amount);
            Ok((
                matches,
                Recomputed::Dice {
                    roll: outcome.roll,
                    win: outcome.win,
                    multiplier: outcome.multiplier.value,
                    payout,
                },
            ))
        }
        GameData::Plinko { rows, risk, bin } => {
            let (outcome, path) =
                replay_plinko(server_seed, &proof.client_seed, proof.nonce, *rows, *risk)?;
            let payout = result.bet_amount * outcome.multiplier;
            let matches = outcome.bin == *bin
                && result.outcome == win_or_loss(outcome.win)
                && approx_eq(outcome.multiplier, result.multiplier)
                && approx_eq(payout, result.payout_amount);
            Ok((
                matches,
                Recomputed::Plinko {
                    bin: outcome.bin,
                    multiplier: outcome.multiplier,
                    payout,
                    path,
                },
            ))
        }
        GameData::Blackjack {
            bet,
            dealt_cards,
            actions,
            settlement,
        } => {
            let round =
                replay_blackjack(server_seed, &proof.client_seed, proof.nonce, *bet, actions)?;
            let (matches, total_staked, total_payout) = match round.settlement() {
                Some(replayed) => {
                    let hands_match = replayed.hands.len() == settlement.hands.len()
                        && replayed
                            .hands
                            .iter()
                            .zip(&settlement.hands)
                            .all(|(a, b)| a.result == b.result && a.cards == b.cards);
                    let expected_outcome =
                        GameOutcome::from_return(replayed.total_staked, replayed.total_payout);
                    (
                        hands_match
                            && round.dealt_cards() == dealt_cards.as_slice()
                            && result.outcome == expected_outcome
                            && approx_eq(replayed.multiplier(), result.multiplier)
                            && approx_eq(replayed.total_payout, result.payout_amount)
                            && approx_eq(replayed.total_staked, result.bet_amount),
                        replayed.total_staked,
                        replayed.total_payout,
                    )
                }
                None => (false, 0.0, 0.0),
            };
            Ok((
                matches,
                Recomputed::Blackjack {
                    dealt_cards: round.dealt_cards().to_vec(),
                    total_staked,
                    total_payout,
                },
            ))
        }
    }
}

fn win_or_loss(win: bool) -> GameOutcome {
    if win {
        GameOutcome::Win
    } else {
        GameOutcome::Loss
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}
