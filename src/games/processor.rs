use crate::config::GameConfig;
use crate::errors::{EngineError, EngineResult};
use crate::games::blackjack::{Action, BlackjackRound, BlackjackView};
use crate::games::dice::{self, Direction};
use crate::games::plinko::{self, Risk, Step};
use crate::games::types::{
    validate_bet, FairnessProof, GameData, GameOutcome, GameResult, GameType,
};
use crate::session::{RevealedSeed, SeedCommitment, Session};
use serde::Serialize;
use tracing::{debug, info};

/// One Plinko ball: the settled record plus its animation path
#[derive(Debug, Clone, Serialize)]
pub struct PlinkoDrop {
    pub result: GameResult,
    pub path: Vec<Step>,
}

/// State of a blackjack round after a deal or an action.
/// `result` is set once the round has settled.
#[derive(Debug, Clone, Serialize)]
pub struct BlackjackPlay {
    pub view: BlackjackView,
    pub result: Option<GameResult>,
}

struct OpenRound {
    round: BlackjackRound,
    proof: FairnessProof,
}

/// Owns one player's session and turns bets into settled game records.
///
/// Every bet is validated before a nonce is reserved, so a rejected bet never
/// burns a nonce.
pub struct GameProcessor {
    config: GameConfig,
    session: Option<Session>,
    blackjack: Option<OpenRound>,
}

impl GameProcessor {
    /// Create a processor with no session yet
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            session: None,
            blackjack: None,
        }
    }

    /// Processor over an existing session
    pub fn with_session(config: GameConfig, session: Session) -> Self {
        Self {
            config,
            session: Some(session),
            blackjack: None,
        }
    }

    /// Create the session, generating the server seed and committing to it
    pub fn start_session(&mut self, client_seed: Option<String>) -> EngineResult<SeedCommitment> {
        if self.session.is_some() {
            return Err(EngineError::InvalidState(
                "session already started, rotate seeds instead".to_string(),
            ));
        }
        let session = Session::create(client_seed, self.config.seed_lengths())?;
        let commitment = session.commitment();
        self.session = Some(session);
        Ok(commitment)
    }

    pub fn session(&self) -> EngineResult<&Session> {
        self.session.as_ref().ok_or_else(not_initialized)
    }

    fn session_mut(&mut self) -> EngineResult<&mut Session> {
        self.session.as_mut().ok_or_else(not_initialized)
    }

    pub fn commitment(&self) -> EngineResult<SeedCommitment> {
        Ok(self.session()?.commitment())
    }

    /// Reveal the current server seed and commit to a fresh pair
    pub fn rotate_seeds(&mut self, client_seed: Option<String>) -> EngineResult<RevealedSeed> {
        self.session_mut()?.rotate(client_seed)
    }

    /// Reveal the live server seed and end the session.
    ///
    /// Returns every seed pair the session used. Fails while a blackjack round is open.
    pub fn close_session(&mut self) -> EngineResult<Vec<RevealedSeed>> {
        let history = self.session_mut()?.close()?;
        self.session = None;
        Ok(history)
    }

    pub fn revealed_seeds(&self) -> EngineResult<&[RevealedSeed]> {
        Ok(self.session()?.revealed_history())
    }

    /// Roll one dice bet
    pub fn play_dice(
        &mut self,
        bet_amount: f64,
        target: u8,
        direction: Direction,
    ) -> EngineResult<GameResult> {
        let house_edge = self.config.house_edge_percent;
        validate_bet(bet_amount)
            .and_then(|_| dice::validate(target, direction))
            .and_then(|_| dice::validate_house_edge(house_edge))
            .map_err(|e| rejected(GameType::Dice, e))?;

        let session = self.session_mut()?;
        let nonce = session.next_nonce();
        let input = session.draw_input(nonce)?;
        let outcome = dice::play(&input, target, direction, house_edge)?;
        let proof = FairnessProof::new(&session.commitment(), nonce);

        let (payout, result) = if outcome.win {
            (bet_amount * outcome.multiplier.value, GameOutcome::Win)
        } else {
            (0.0, GameOutcome::Loss)
        };
        debug!(nonce, roll = outcome.roll, win = outcome.win, "Dice settled");

        Ok(GameResult::new(
            GameType::Dice,
            bet_amount,
            payout,
            outcome.multiplier.value,
            result,
            proof,
            GameData::Dice {
                target,
                direction,
                roll: outcome.roll,
                win_chance: outcome.win_chance,
                house_edge_percent: house_edge,
            },
        ))
    }

    /// Drop `balls` Plinko balls. All nonces are reserved before any result is computed.
    pub fn drop_plinko(
        &mut self,
        bet_amount: f64,
        rows: u8,
        risk: Risk,
        balls: u32,
    ) -> EngineResult<Vec<PlinkoDrop>> {
        let max_balls = self.config.max_plinko_balls;
        validate_bet(bet_amount)
            .and_then(|_| plinko::validate_rows(rows))
            .and_then(|_| {
                if balls == 0 || balls > max_balls {
                    Err(EngineError::invalid_parameter(
                        "balls",
                        format!("{} is outside [1, {}]", balls, max_balls),
                    ))
                } else {
                    Ok(())
                }
            })
            .map_err(|e| rejected(GameType::Plinko, e))?;

        let session = self.session_mut()?;
        let nonces = session.reserve_nonces(balls)?;
        let commitment = session.commitment();

        let mut drops = Vec::with_capacity(balls as usize);
        for nonce in nonces {
            let input = session.draw_input(nonce)?;
            let outcome = plinko::drop_ball(&input, rows, risk)?;
            let path = plinko::path(&input, rows, outcome.bin)?;
            let result = GameResult::new(
                GameType::Plinko,
                bet_amount,
                bet_amount * outcome.multiplier,
                outcome.multiplier,
                if outcome.win { GameOutcome::Win } else { GameOutcome::Loss },
                FairnessProof::new(&commitment, nonce),
                GameData::Plinko {
                    rows,
                    risk,
                    bin: outcome.bin,
                },
            );
            drops.push(PlinkoDrop { result, path });
        }
        debug!(balls, rows, %risk, "Plinko settled");
        Ok(drops)
    }

    /// Shuffle and deal a blackjack round on a single nonce
    pub fn start_blackjack(&mut self, bet_amount: f64) -> EngineResult<BlackjackPlay> {
        validate_bet(bet_amount).map_err(|e| rejected(GameType::Blackjack, e))?;
        if self.blackjack.is_some() {
            return Err(EngineError::InvalidState(
                "a blackjack round is already in progress".to_string(),
            ));
        }

        let open = {
            let session = self.session_mut()?;
            let nonce = session.current_nonce();
            session.begin_round(nonce)?;
            session.next_nonce();
            let input = session.draw_input(nonce)?;
            let round = BlackjackRound::deal(&input, bet_amount)?;
            OpenRound {
                round,
                proof: FairnessProof::new(&session.commitment(), nonce),
            }
        };
        debug!(nonce = open.proof.nonce, stage = ?open.round.stage(), "Blackjack dealt");
        self.settle_if_complete(open)
    }

    /// Apply a player decision to the open round
    pub fn blackjack_action(&mut self, action: Action) -> EngineResult<BlackjackPlay> {
        let mut open = self.blackjack.take().ok_or_else(no_round)?;
        if let Err(e) = open.round.apply(action) {
            debug!(%action, error = %e, "Blackjack action rejected");
            self.blackjack = Some(open);
            return Err(e);
        }
        self.settle_if_complete(open)
    }

    /// Player-facing view of the open round
    pub fn blackjack_view(&self) -> EngineResult<BlackjackView> {
        self.blackjack
            .as_ref()
            .map(|open| open.round.view())
            .ok_or_else(no_round)
    }

    /// Drop the open round. Its nonce stays spent and nothing is refunded.
    pub fn abandon_blackjack(&mut self) -> EngineResult<SeedCommitment> {
        let open = self.blackjack.take().ok_or_else(no_round)?;
        let session = self.session_mut()?;
        session.end_round();
        info!(nonce = open.proof.nonce, "Blackjack round abandoned");
        Ok(session.commitment())
    }

    fn settle_if_complete(&mut self, open: OpenRound) -> EngineResult<BlackjackPlay> {
        let view = open.round.view();
        let settlement = match open.round.settlement().cloned() {
            Some(settlement) => settlement,
            None => {
                self.blackjack = Some(open);
                return Ok(BlackjackPlay { view, result: None });
            }
        };

        self.session_mut()?.end_round();
        let multiplier = settlement.multiplier();
        let outcome = GameOutcome::from_return(settlement.total_staked, settlement.total_payout);
        info!(
            nonce = open.proof.nonce,
            staked = settlement.total_staked,
            payout = settlement.total_payout,
            "Blackjack settled"
        );

        let result = GameResult::new(
            GameType::Blackjack,
            settlement.total_staked,
            settlement.total_payout,
            multiplier,
            outcome,
            open.proof,
            GameData::Blackjack {
                bet: open.round.bet(),
                dealt_cards: open.round.dealt_cards().to_vec(),
                actions: open.round.actions().to_vec(),
                settlement,
            },
        );
        Ok(BlackjackPlay {
            view,
            result: Some(result),
        })
    }
}

fn not_initialized() -> EngineError {
    EngineError::SessionNotInitialized("no session has been started".to_string())
}

fn no_round() -> EngineError {
    EngineError::InvalidState("no blackjack round in progress".to_string())
}

fn rejected(game: GameType, error: EngineError) -> EngineError {
    debug!(%game, error = %error, "Bet rejected");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::blackjack::HandResult;
    use std::collections::HashSet;

    fn processor() -> GameProcessor {
        let session = Session::with_seeds("house-seed", "player-seed").unwrap();
        GameProcessor::with_session(GameConfig::default(), session)
    }

    #[test]
    fn test_requires_session() {
        let mut processor = GameProcessor::new(GameConfig::default());
        let err = processor.play_dice(1.0, 50, Direction::Under).unwrap_err();
        assert!(matches!(err, EngineError::SessionNotInitialized(_)));
        assert!(matches!(processor.commitment(), Err(EngineError::SessionNotInitialized(_))));

        processor.start_session(None).unwrap();
        assert!(processor.play_dice(1.0, 50, Direction::Under).is_ok());
        assert!(processor.start_session(None).is_err());
    }

    #[test]
    fn test_dice_scenario_record() {
        let session = Session::with_seeds("abc", "xyz").unwrap();
        let mut processor = GameProcessor::with_session(GameConfig::default(), session);
        processor.play_dice(1.0, 50, Direction::Under).unwrap();

        let result = processor.play_dice(10.0, 50, Direction::Under).unwrap();
        assert_eq!(result.proof.nonce, 1);
        assert_eq!(result.outcome, GameOutcome::Win);
        assert_eq!(result.multiplier, 1.98);
        assert!((result.payout_amount - 19.8).abs() < 1e-9);
        match result.game_data {
            GameData::Dice { roll, .. } => assert_eq!(roll, 20.59),
            other => panic!("unexpected game data {:?}", other),
        }
    }

    #[test]
    fn test_rejected_bet_keeps_nonce() {
        let mut processor = processor();
        assert!(processor.play_dice(1.0, 99, Direction::Under).is_err());
        assert!(processor.play_dice(0.0, 50, Direction::Under).is_err());
        assert!(processor.drop_plinko(1.0, 7, Risk::Low, 1).is_err());
        assert!(processor.drop_plinko(1.0, 8, Risk::Low, 0).is_err());
        assert!(processor.drop_plinko(1.0, 8, Risk::Low, 101).is_err());
        assert!(processor.start_blackjack(-1.0).is_err());
        assert_eq!(processor.session().unwrap().current_nonce(), 0);
    }

    #[test]
    fn test_plinko_reserves_block() {
        let mut processor = processor();
        let drops = processor.drop_plinko(2.0, 12, Risk::Medium, 5).unwrap();

        let nonces: Vec<u64> = drops.iter().map(|d| d.result.proof.nonce).collect();
        assert_eq!(nonces, vec![0, 1, 2, 3, 4]);
        assert_eq!(processor.session().unwrap().current_nonce(), 5);
        for drop in &drops {
            assert_eq!(drop.path.len(), 12);
            let bin = match drop.result.game_data {
                GameData::Plinko { bin, .. } => bin,
                _ => unreachable!(),
            };
            let rights = drop.path.iter().filter(|s| **s == Step::Right).count();
            assert_eq!(rights, usize::from(bin));
        }
    }

    #[test]
    fn test_blackjack_round_uses_one_nonce() {
        let mut processor = processor();
        let play = processor.start_blackjack(10.0).unwrap();
        assert_eq!(play.view.nonce, 0);
        assert!(play.result.is_none());
        assert_eq!(processor.session().unwrap().current_nonce(), 1);

        // dice in between takes the next nonce
        let dice = processor.play_dice(1.0, 50, Direction::Over).unwrap();
        assert_eq!(dice.proof.nonce, 1);

        let play = processor.blackjack_action(Action::TakeInsurance).unwrap();
        assert!(play.result.is_none());
        let play = processor.blackjack_action(Action::Stand).unwrap();
        let result = play.result.unwrap();

        assert_eq!(result.proof.nonce, 0);
        assert_eq!(result.bet_amount, 15.0);
        assert_eq!(result.payout_amount, 0.0);
        assert_eq!(result.outcome, GameOutcome::Loss);
        assert!(!processor.session().unwrap().round_in_progress());
    }

    #[test]
    fn test_rotate_blocked_mid_round() {
        let mut processor = processor();
        processor.start_blackjack(10.0).unwrap();

        let err = processor.rotate_seeds(None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert!(processor.start_blackjack(10.0).is_err());

        let commitment = processor.abandon_blackjack().unwrap();
        assert_eq!(commitment.nonce, 1);
        assert!(processor.blackjack_action(Action::Hit).is_err());

        let revealed = processor.rotate_seeds(None).unwrap();
        assert_eq!(revealed.server_seed, "house-seed");
        assert_eq!(revealed.nonces_used, 0..1);
        assert_eq!(processor.revealed_seeds().unwrap().len(), 1);
    }

    #[test]
    fn test_close_session() {
        let mut processor = processor();
        processor.start_blackjack(10.0).unwrap();
        processor.play_dice(1.0, 50, Direction::Under).unwrap();
        assert!(matches!(processor.close_session(), Err(EngineError::InvalidState(_))));

        processor.abandon_blackjack().unwrap();
        let history = processor.close_session().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].server_seed, "house-seed");
        assert_eq!(history[0].nonces_used, 0..2);

        assert!(matches!(
            processor.play_dice(1.0, 50, Direction::Under),
            Err(EngineError::SessionNotInitialized(_))
        ));
    }

    #[test]
    fn test_immediate_blackjack_settles_on_deal() {
        let mut processor = processor();
        processor.session_mut().unwrap().reserve_nonces(3).unwrap();

        let play = processor.start_blackjack(10.0).unwrap();
        let result = play.result.unwrap();
        assert_eq!(result.outcome, GameOutcome::Win);
        assert_eq!(result.payout_amount, 25.0);
        assert_eq!(result.multiplier, 2.5);
        match result.game_data {
            GameData::Blackjack { settlement, .. } => {
                assert_eq!(settlement.hands[0].result, HandResult::Blackjack)
            }
            _ => unreachable!(),
        }
        assert!(processor.blackjack_view().is_err());
    }

    #[test]
    fn test_invalid_action_keeps_round() {
        let mut processor = processor();
        processor.start_blackjack(10.0).unwrap();

        // insurance is pending on nonce 0
        assert!(processor.blackjack_action(Action::Hit).is_err());
        let view = processor.blackjack_view().unwrap();
        assert_eq!(view.dealer_cards.len(), 1);
    }

    #[test]
    fn test_game_ids_unique() {
        let mut processor = processor();
        let ids: HashSet<String> = (0..20)
            .map(|_| processor.play_dice(1.0, 50, Direction::Under).unwrap().game_id)
            .collect();
        assert_eq!(ids.len(), 20);
    }
}
