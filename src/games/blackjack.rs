//! Blackjack over a single seeded shuffle.
//!
//! One nonce shuffles the whole deck: Fisher-Yates from index 51 down to 1,
//! swap partner at step `i` is `draw_int(sub_index = i, max = i + 1)`.
//! Cards are dealt from the shuffled deck through a monotonic cursor:
//! player, dealer, player, dealer, then hits, doubles, split cards and dealer
//! draws in play order.
//!
//! Payouts are total returns on the stake: blackjack 2.5x, win 2x, push 1x,
//! loss 0. Insurance costs half the bet and returns 2x its stake when the
//! dealer holds blackjack.

use super::cards::{ordered_deck, Card, Shoe};
use crate::draw::DrawInput;
use crate::errors::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const BLACKJACK_TOTAL: u8 = 21;
pub const DEALER_STAND_TOTAL: u8 = 17;

pub const BLACKJACK_PAYOUT: f64 = 2.5;
pub const WIN_PAYOUT: f64 = 2.0;
pub const PUSH_PAYOUT: f64 = 1.0;
pub const INSURANCE_COST: f64 = 0.5;
pub const INSURANCE_PAYOUT: f64 = 2.0;

/// Seeded shuffle of the ordered deck
pub fn shuffled_deck(input: &DrawInput<'_>) -> EngineResult<Vec<Card>> {
    let mut deck = ordered_deck();
    for i in (1..deck.len()).rev() {
        let j = input.int(i as u32, i as u32 + 1)? as usize;
        deck.swap(i, j);
    }
    Ok(deck)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandValue {
    pub total: u8,
    /// An ace is still counted as 11
    pub soft: bool,
}

/// Aces count 11, then drop to 1 one at a time while the hand is over 21
pub fn hand_value(cards: &[Card]) -> HandValue {
    let mut total: u16 = 0;
    let mut high_aces = 0u8;
    for card in cards {
        total += u16::from(card.rank.points());
        if card.rank.points() == 11 {
            high_aces += 1;
        }
    }
    while total > u16::from(BLACKJACK_TOTAL) && high_aces > 0 {
        total -= 10;
        high_aces -= 1;
    }
    HandValue {
        total: total.min(u16::from(u8::MAX)) as u8,
        soft: high_aces > 0,
    }
}

pub fn is_blackjack(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards).total == BLACKJACK_TOTAL
}

fn dealer_must_hit(cards: &[Card]) -> bool {
    let value = hand_value(cards);
    value.total < DEALER_STAND_TOTAL || (value.total == DEALER_STAND_TOTAL && value.soft)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Hit,
    Stand,
    Double,
    Split,
    TakeInsurance,
    DeclineInsurance,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Hit => "hit",
            Action::Stand => "stand",
            Action::Double => "double",
            Action::Split => "split",
            Action::TakeInsurance => "take_insurance",
            Action::DeclineInsurance => "decline_insurance",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Action {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hit" => Ok(Action::Hit),
            "stand" => Ok(Action::Stand),
            "double" => Ok(Action::Double),
            "split" => Ok(Action::Split),
            "take_insurance" => Ok(Action::TakeInsurance),
            "decline_insurance" => Ok(Action::DeclineInsurance),
            other => Err(EngineError::invalid_parameter(
                "action",
                format!("unknown action '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Dealer shows an ace and the player has not answered the insurance offer
    Insurance,
    PlayerTurn,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandStatus {
    Playing,
    Standing,
    Busted,
    Blackjack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandResult {
    Blackjack,
    Win,
    Push,
    Loss,
}

impl HandResult {
    fn payout_factor(self) -> f64 {
        match self {
            HandResult::Blackjack => BLACKJACK_PAYOUT,
            HandResult::Win => WIN_PAYOUT,
            HandResult::Push => PUSH_PAYOUT,
            HandResult::Loss => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Insurance {
    NotOffered,
    Offered,
    Declined,
    Taken { stake: f64 },
}

impl Insurance {
    fn stake(self) -> f64 {
        match self {
            Insurance::Taken { stake } => stake,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerHand {
    pub cards: Vec<Card>,
    pub bet: f64,
    pub status: HandStatus,
    pub doubled: bool,
    pub from_split: bool,
}

impl PlayerHand {
    fn new(bet: f64) -> Self {
        Self {
            cards: Vec::with_capacity(4),
            bet,
            status: HandStatus::Playing,
            doubled: false,
            from_split: false,
        }
    }

    pub fn value(&self) -> HandValue {
        hand_value(&self.cards)
    }

    /// Stand on 21, bust over it
    fn refresh_status(&mut self) {
        let total = self.value().total;
        if total > BLACKJACK_TOTAL {
            self.status = HandStatus::Busted;
        } else if total == BLACKJACK_TOTAL {
            self.status = HandStatus::Standing;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandSettlement {
    pub cards: Vec<Card>,
    pub total: u8,
    pub bet: f64,
    pub result: HandResult,
    pub payout: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub hands: Vec<HandSettlement>,
    pub dealer_cards: Vec<Card>,
    pub dealer_total: u8,
    pub dealer_blackjack: bool,
    pub insurance_stake: f64,
    pub insurance_payout: f64,
    pub total_staked: f64,
    pub total_payout: f64,
}

impl Settlement {
    /// Total return per unit staked, insurance included
    pub fn multiplier(&self) -> f64 {
        if self.total_staked > 0.0 {
            self.total_payout / self.total_staked
        } else {
            0.0
        }
    }
}

/// Player-facing snapshot. The hole card stays hidden until the round completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackjackView {
    pub nonce: u64,
    pub stage: Stage,
    pub hands: Vec<PlayerHand>,
    pub active_hand: Option<usize>,
    pub dealer_cards: Vec<Card>,
    pub dealer_total: u8,
    pub insurance: Insurance,
    pub settlement: Option<Settlement>,
}

/// One round of blackjack on one nonce
#[derive(Debug, Clone)]
pub struct BlackjackRound {
    nonce: u64,
    base_bet: f64,
    shoe: Shoe,
    hands: Vec<PlayerHand>,
    active: usize,
    dealer: Vec<Card>,
    insurance: Insurance,
    stage: Stage,
    actions: Vec<Action>,
    settlement: Option<Settlement>,
}

impl BlackjackRound {
    /// Shuffle for the input's nonce and deal the opening four cards
    pub fn deal(input: &DrawInput<'_>, bet: f64) -> EngineResult<Self> {
        let deck = shuffled_deck(input)?;
        Self::from_deck(input.nonce(), deck, bet)
    }

    pub(crate) fn from_deck(nonce: u64, deck: Vec<Card>, bet: f64) -> EngineResult<Self> {
        let mut round = Self {
            nonce,
            base_bet: bet,
            shoe: Shoe::new(deck),
            hands: vec![PlayerHand::new(bet)],
            active: 0,
            dealer: Vec::with_capacity(4),
            insurance: Insurance::NotOffered,
            stage: Stage::PlayerTurn,
            actions: Vec::new(),
            settlement: None,
        };

        let first = round.shoe.deal()?;
        round.hands[0].cards.push(first);
        let up = round.shoe.deal()?;
        round.dealer.push(up);
        let second = round.shoe.deal()?;
        round.hands[0].cards.push(second);
        let hole = round.shoe.deal()?;
        round.dealer.push(hole);

        if up.rank.points() == 11 {
            round.insurance = Insurance::Offered;
            round.stage = Stage::Insurance;
        } else {
            round.check_naturals();
        }
        Ok(round)
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Stake placed on the deal, before doubles, splits or insurance
    pub fn bet(&self) -> f64 {
        self.base_bet
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }

    pub fn hands(&self) -> &[PlayerHand] {
        &self.hands
    }

    pub fn dealer_cards(&self) -> &[Card] {
        &self.dealer
    }

    /// Every card dealt this round, in dealing order
    pub fn dealt_cards(&self) -> &[Card] {
        self.shoe.dealt()
    }

    /// Accepted actions, in order
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    /// Apply a player decision. A rejected action leaves the round untouched.
    pub fn apply(&mut self, action: Action) -> EngineResult<()> {
        match self.stage {
            Stage::Complete => {
                return Err(EngineError::InvalidState("round is already complete".to_string()))
            }
            Stage::Insurance => match action {
                Action::TakeInsurance => {
                    self.insurance = Insurance::Taken {
                        stake: self.base_bet * INSURANCE_COST,
                    };
                }
                Action::DeclineInsurance => self.insurance = Insurance::Declined,
                _ => {
                    return Err(EngineError::InvalidState(
                        "insurance decision is pending".to_string(),
                    ))
                }
            },
            Stage::PlayerTurn => match action {
                Action::Hit => self.hit()?,
                Action::Stand => self.hands[self.active].status = HandStatus::Standing,
                Action::Double => self.double()?,
                Action::Split => self.split()?,
                Action::TakeInsurance | Action::DeclineInsurance => {
                    return Err(EngineError::InvalidState(
                        "insurance is not on offer".to_string(),
                    ))
                }
            },
        }

        self.actions.push(action);
        if self.stage == Stage::Insurance {
            self.stage = Stage::PlayerTurn;
            self.check_naturals();
        } else {
            self.advance()?;
        }
        Ok(())
    }

    fn hit(&mut self) -> EngineResult<()> {
        let card = self.shoe.deal()?;
        let hand = &mut self.hands[self.active];
        hand.cards.push(card);
        hand.refresh_status();
        Ok(())
    }

    fn double(&mut self) -> EngineResult<()> {
        if self.hands[self.active].cards.len() != 2 {
            return Err(EngineError::InvalidState(
                "double is only allowed on a two-card hand".to_string(),
            ));
        }
        let card = self.shoe.deal()?;
        let hand = &mut self.hands[self.active];
        hand.bet *= 2.0;
        hand.doubled = true;
        hand.cards.push(card);
        hand.refresh_status();
        if hand.status == HandStatus::Playing {
            hand.status = HandStatus::Standing;
        }
        Ok(())
    }

    fn split(&mut self) -> EngineResult<()> {
        let hand = &self.hands[self.active];
        if self.hands.len() != 1 || hand.cards.len() != 2 {
            return Err(EngineError::InvalidState(
                "split is only allowed on the initial two-card hand".to_string(),
            ));
        }
        if hand.cards[0].rank != hand.cards[1].rank {
            return Err(EngineError::InvalidState(
                "split requires two cards of equal rank".to_string(),
            ));
        }
        // Both split cards are drawn before the hands change so a short deck
        // cannot leave a half-split round behind.
        if self.shoe.remaining() < 2 {
            return Err(EngineError::InvalidState("deck exhausted".to_string()));
        }

        let mut second = PlayerHand::new(self.base_bet);
        second.from_split = true;
        if let Some(card) = self.hands[0].cards.pop() {
            second.cards.push(card);
        }
        self.hands[0].from_split = true;
        self.hands.push(second);

        for index in 0..self.hands.len() {
            let card = self.shoe.deal()?;
            let hand = &mut self.hands[index];
            hand.cards.push(card);
            hand.refresh_status();
        }
        Ok(())
    }

    /// Settle at once when either side holds a natural
    fn check_naturals(&mut self) {
        let dealer_blackjack = is_blackjack(&self.dealer);
        let player_blackjack = is_blackjack(&self.hands[0].cards);
        if !dealer_blackjack && !player_blackjack {
            return;
        }
        if player_blackjack {
            self.hands[0].status = HandStatus::Blackjack;
        }
        self.settle();
    }

    /// Move to the next unfinished hand, or let the dealer play
    fn advance(&mut self) -> EngineResult<()> {
        match self.hands.iter().position(|h| h.status == HandStatus::Playing) {
            Some(index) => {
                self.active = index;
                Ok(())
            }
            None => {
                self.play_dealer()?;
                self.settle();
                Ok(())
            }
        }
    }

    fn play_dealer(&mut self) -> EngineResult<()> {
        if self.hands.iter().all(|h| h.status == HandStatus::Busted) {
            return Ok(());
        }
        while dealer_must_hit(&self.dealer) {
            let card = self.shoe.deal()?;
            self.dealer.push(card);
        }
        Ok(())
    }

    fn settle(&mut self) {
        let dealer_value = hand_value(&self.dealer);
        let dealer_blackjack = is_blackjack(&self.dealer);

        let hands: Vec<HandSettlement> = self
            .hands
            .iter()
            .map(|hand| {
                let total = hand.value().total;
                let result = if hand.status == HandStatus::Blackjack {
                    if dealer_blackjack {
                        HandResult::Push
                    } else {
                        HandResult::Blackjack
                    }
                } else if dealer_blackjack || hand.status == HandStatus::Busted {
                    HandResult::Loss
                } else if dealer_value.total > BLACKJACK_TOTAL || total > dealer_value.total {
                    HandResult::Win
                } else if total == dealer_value.total {
                    HandResult::Push
                } else {
                    HandResult::Loss
                };
                HandSettlement {
                    cards: hand.cards.clone(),
                    total,
                    bet: hand.bet,
                    result,
                    payout: hand.bet * result.payout_factor(),
                }
            })
            .collect();

        let insurance_stake = self.insurance.stake();
        let insurance_payout = if dealer_blackjack {
            insurance_stake * INSURANCE_PAYOUT
        } else {
            0.0
        };
        let total_staked = hands.iter().map(|h| h.bet).sum::<f64>() + insurance_stake;
        let total_payout = hands.iter().map(|h| h.payout).sum::<f64>() + insurance_payout;

        self.settlement = Some(Settlement {
            hands,
            dealer_cards: self.dealer.clone(),
            dealer_total: dealer_value.total,
            dealer_blackjack,
            insurance_stake,
            insurance_payout,
            total_staked,
            total_payout,
        });
        self.stage = Stage::Complete;
    }

    pub fn view(&self) -> BlackjackView {
        let dealer_cards = if self.is_complete() {
            self.dealer.clone()
        } else {
            self.dealer.iter().take(1).copied().collect()
        };
        BlackjackView {
            nonce: self.nonce,
            stage: self.stage,
            hands: self.hands.clone(),
            active_hand: (self.stage == Stage::PlayerTurn).then_some(self.active),
            dealer_total: hand_value(&dealer_cards).total,
            dealer_cards,
            insurance: self.insurance,
            settlement: self.settlement.clone(),
        }
    }
}
