//! Dice: a two-decimal roll in [0, 100) against a whole-number target.
//!
//! The roll is `floor(draw * 10000) / 100`. The value shown to the player is
//! the value compared against the target; internally both sides are integer
//! hundredths so no float rounding enters the win decision.

use crate::draw::DrawInput;
use crate::errors::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ROLL_SCALE: u32 = 10_000;
pub const MIN_UNDER_TARGET: u8 = 1;
pub const MIN_OVER_TARGET: u8 = 2;
pub const MAX_TARGET: u8 = 98;
pub const DEFAULT_HOUSE_EDGE_PERCENT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Under,
    Over,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Under => write!(f, "under"),
            Direction::Over => write!(f, "over"),
        }
    }
}

impl FromStr for Direction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "under" => Ok(Direction::Under),
            "over" => Ok(Direction::Over),
            other => Err(EngineError::invalid_parameter(
                "direction",
                format!("unknown direction '{}'", other),
            )),
        }
    }
}

/// Raw roll in hundredths, `[0, 10000)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll(u32);

impl DiceRoll {
    pub fn hundredths(self) -> u32 {
        self.0
    }

    /// The two-decimal value shown to the player
    pub fn value(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

/// Payout multiplier with the number of decimals it is quoted at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multiplier {
    pub value: f64,
    pub precision: u32,
}

/// Settled dice bet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiceOutcome {
    pub roll: f64,
    pub target: u8,
    pub direction: Direction,
    pub win: bool,
    pub win_chance: f64,
    pub multiplier: Multiplier,
}

/// Reject targets with zero or certain win probability
pub fn validate(target: u8, direction: Direction) -> EngineResult<()> {
    let min = match direction {
        Direction::Under => MIN_UNDER_TARGET,
        Direction::Over => MIN_OVER_TARGET,
    };
    if target < min || target > MAX_TARGET {
        return Err(EngineError::invalid_parameter(
            "target",
            format!(
                "{} when rolling {} must be within [{}, {}]",
                target, direction, min, MAX_TARGET
            ),
        ));
    }
    Ok(())
}

pub fn validate_house_edge(house_edge_percent: f64) -> EngineResult<()> {
    if !house_edge_percent.is_finite() || !(0.0..100.0).contains(&house_edge_percent) {
        return Err(EngineError::invalid_parameter(
            "house_edge_percent",
            format!("{} must be within [0, 100)", house_edge_percent),
        ));
    }
    Ok(())
}

pub fn roll_dice(input: &DrawInput<'_>) -> DiceRoll {
    DiceRoll((input.float(0) * f64::from(ROLL_SCALE)).floor() as u32)
}

pub fn is_win(roll: DiceRoll, target: u8, direction: Direction) -> bool {
    let threshold = u32::from(target) * 100;
    match direction {
        Direction::Under => roll.hundredths() < threshold,
        Direction::Over => roll.hundredths() > threshold,
    }
}

/// Win chance in percent
pub fn win_chance(target: u8, direction: Direction) -> f64 {
    match direction {
        Direction::Under => f64::from(target),
        Direction::Over => 100.0 - f64::from(target),
    }
}

/// Decimals needed so `multiplier * win_chance` stays verifiable: smaller
/// chances give larger multipliers and get more places.
pub fn multiplier_precision(win_chance: f64) -> u32 {
    let mut scaled = win_chance;
    let mut places = 0;
    while scaled < 100.0 && places < 8 {
        scaled *= 10.0;
        places += 1;
    }
    2 + places
}

/// `(100 - house_edge) / win_chance`, rounded half-up at the quoted precision
pub fn multiplier(target: u8, direction: Direction, house_edge_percent: f64) -> Multiplier {
    let chance = win_chance(target, direction);
    let precision = multiplier_precision(chance);
    let factor = 10f64.powi(precision as i32);
    let exact = (100.0 - house_edge_percent) / chance;
    Multiplier {
        value: (exact * factor).round() / factor,
        precision,
    }
}

/// Roll and settle one dice bet
pub fn play(
    input: &DrawInput<'_>,
    target: u8,
    direction: Direction,
    house_edge_percent: f64,
) -> EngineResult<DiceOutcome> {
    validate(target, direction)?;
    validate_house_edge(house_edge_percent)?;

    let roll = roll_dice(input);
    Ok(DiceOutcome {
        roll: roll.value(),
        target,
        direction,
        win: is_win(roll, target, direction),
        win_chance: win_chance(target, direction),
        multiplier: multiplier(target, direction, house_edge_percent),
    })
}
