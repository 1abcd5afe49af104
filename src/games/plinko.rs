//! Plinko: one draw picks the landing bin, a fixed table prices it.
//!
//! The bin is `draw_int(sub_index = 0, max = rows + 1)`. The path the ball
//! takes on screen is derived afterwards from sub-indices 1.. of the same
//! nonce and is built to end in that bin; it never feeds back into the bin.

use crate::draw::DrawInput;
use crate::errors::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_ROWS: u8 = 8;
pub const MAX_ROWS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl Risk {
    pub const ALL: [Risk; 3] = [Risk::Low, Risk::Medium, Risk::High];
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::Low => write!(f, "low"),
            Risk::Medium => write!(f, "medium"),
            Risk::High => write!(f, "high"),
        }
    }
}

impl FromStr for Risk {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Risk::Low),
            "medium" => Ok(Risk::Medium),
            "high" => Ok(Risk::High),
            other => Err(EngineError::invalid_parameter(
                "risk",
                format!("unknown risk level '{}'", other),
            )),
        }
    }
}

// Payout tables, edge bin first. Each has rows + 1 entries.
const LOW_8: [f64; 9] = [5.6, 2.1, 1.1, 1.0, 0.5, 1.0, 1.1, 2.1, 5.6];
const LOW_9: [f64; 10] = [5.6, 2.0, 1.6, 1.0, 0.7, 0.7, 1.0, 1.6, 2.0, 5.6];
const LOW_10: [f64; 11] = [8.9, 3.0, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 3.0, 8.9];
const LOW_11: [f64; 12] = [8.4, 3.0, 1.9, 1.3, 1.0, 0.7, 0.7, 1.0, 1.3, 1.9, 3.0, 8.4];
const LOW_12: [f64; 13] = [10.0, 3.0, 1.6, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 1.6, 3.0, 10.0];
const LOW_13: [f64; 14] = [8.1, 4.0, 3.0, 1.9, 1.2, 0.9, 0.7, 0.7, 0.9, 1.2, 1.9, 3.0, 4.0, 8.1];
const LOW_14: [f64; 15] = [
    7.1, 4.0, 1.9, 1.4, 1.3, 1.1, 1.0, 0.5, 1.0, 1.1, 1.3, 1.4, 1.9, 4.0, 7.1,
];
const LOW_15: [f64; 16] = [
    15.0, 8.0, 3.0, 2.0, 1.5, 1.1, 1.0, 0.7, 0.7, 1.0, 1.1, 1.5, 2.0, 3.0, 8.0, 15.0,
];
const LOW_16: [f64; 17] = [
    16.0, 9.0, 2.0, 1.4, 1.4, 1.2, 1.1, 1.0, 0.5, 1.0, 1.1, 1.2, 1.4, 1.4, 2.0, 9.0, 16.0,
];

const MEDIUM_8: [f64; 9] = [13.0, 3.0, 1.3, 0.7, 0.4, 0.7, 1.3, 3.0, 13.0];
const MEDIUM_9: [f64; 10] = [18.0, 4.0, 1.7, 0.9, 0.5, 0.5, 0.9, 1.7, 4.0, 18.0];
const MEDIUM_10: [f64; 11] = [22.0, 5.0, 2.0, 1.4, 0.6, 0.4, 0.6, 1.4, 2.0, 5.0, 22.0];
const MEDIUM_11: [f64; 12] = [24.0, 6.0, 3.0, 1.8, 0.7, 0.5, 0.5, 0.7, 1.8, 3.0, 6.0, 24.0];
const MEDIUM_12: [f64; 13] = [33.0, 11.0, 4.0, 2.0, 1.1, 0.6, 0.3, 0.6, 1.1, 2.0, 4.0, 11.0, 33.0];
const MEDIUM_13: [f64; 14] = [
    43.0, 13.0, 6.0, 3.0, 1.3, 0.7, 0.4, 0.4, 0.7, 1.3, 3.0, 6.0, 13.0, 43.0,
];
const MEDIUM_14: [f64; 15] = [
    58.0, 15.0, 7.0, 4.0, 1.9, 1.0, 0.5, 0.2, 0.5, 1.0, 1.9, 4.0, 7.0, 15.0, 58.0,
];
const MEDIUM_15: [f64; 16] = [
    88.0, 18.0, 11.0, 5.0, 3.0, 1.3, 0.5, 0.3, 0.3, 0.5, 1.3, 3.0, 5.0, 11.0, 18.0, 88.0,
];
const MEDIUM_16: [f64; 17] = [
    110.0, 41.0, 10.0, 5.0, 3.0, 1.5, 1.0, 0.5, 0.3, 0.5, 1.0, 1.5, 3.0, 5.0, 10.0, 41.0, 110.0,
];

const HIGH_8: [f64; 9] = [29.0, 4.0, 1.5, 0.3, 0.2, 0.3, 1.5, 4.0, 29.0];
const HIGH_9: [f64; 10] = [43.0, 7.0, 2.0, 0.6, 0.2, 0.2, 0.6, 2.0, 7.0, 43.0];
const HIGH_10: [f64; 11] = [76.0, 10.0, 3.0, 0.9, 0.3, 0.2, 0.3, 0.9, 3.0, 10.0, 76.0];
const HIGH_11: [f64; 12] = [120.0, 14.0, 5.2, 1.4, 0.4, 0.2, 0.2, 0.4, 1.4, 5.2, 14.0, 120.0];
const HIGH_12: [f64; 13] = [170.0, 24.0, 8.1, 2.0, 0.7, 0.2, 0.2, 0.2, 0.7, 2.0, 8.1, 24.0, 170.0];
const HIGH_13: [f64; 14] = [
    260.0, 37.0, 11.0, 4.0, 1.0, 0.2, 0.2, 0.2, 0.2, 1.0, 4.0, 11.0, 37.0, 260.0,
];
const HIGH_14: [f64; 15] = [
    420.0, 56.0, 18.0, 5.0, 1.9, 0.3, 0.2, 0.2, 0.2, 0.3, 1.9, 5.0, 18.0, 56.0, 420.0,
];
const HIGH_15: [f64; 16] = [
    620.0, 83.0, 27.0, 8.0, 3.0, 0.5, 0.2, 0.2, 0.2, 0.2, 0.5, 3.0, 8.0, 27.0, 83.0, 620.0,
];
const HIGH_16: [f64; 17] = [
    1000.0, 130.0, 26.0, 9.0, 4.0, 2.0, 0.2, 0.2, 0.2, 0.2, 0.2, 2.0, 4.0, 9.0, 26.0, 130.0, 1000.0,
];

pub fn validate_rows(rows: u8) -> EngineResult<()> {
    if !(MIN_ROWS..=MAX_ROWS).contains(&rows) {
        return Err(EngineError::invalid_parameter(
            "rows",
            format!("{} is not supported, expected {}..={}", rows, MIN_ROWS, MAX_ROWS),
        ));
    }
    Ok(())
}

/// Fixed payout table for `(rows, risk)`
pub fn multiplier_table(rows: u8, risk: Risk) -> EngineResult<&'static [f64]> {
    validate_rows(rows)?;
    let table: &'static [f64] = match (risk, rows) {
        (Risk::Low, 8) => &LOW_8,
        (Risk::Low, 9) => &LOW_9,
        (Risk::Low, 10) => &LOW_10,
        (Risk::Low, 11) => &LOW_11,
        (Risk::Low, 12) => &LOW_12,
        (Risk::Low, 13) => &LOW_13,
        (Risk::Low, 14) => &LOW_14,
        (Risk::Low, 15) => &LOW_15,
        (Risk::Low, _) => &LOW_16,
        (Risk::Medium, 8) => &MEDIUM_8,
        (Risk::Medium, 9) => &MEDIUM_9,
        (Risk::Medium, 10) => &MEDIUM_10,
        (Risk::Medium, 11) => &MEDIUM_11,
        (Risk::Medium, 12) => &MEDIUM_12,
        (Risk::Medium, 13) => &MEDIUM_13,
        (Risk::Medium, 14) => &MEDIUM_14,
        (Risk::Medium, 15) => &MEDIUM_15,
        (Risk::Medium, _) => &MEDIUM_16,
        (Risk::High, 8) => &HIGH_8,
        (Risk::High, 9) => &HIGH_9,
        (Risk::High, 10) => &HIGH_10,
        (Risk::High, 11) => &HIGH_11,
        (Risk::High, 12) => &HIGH_12,
        (Risk::High, 13) => &HIGH_13,
        (Risk::High, 14) => &HIGH_14,
        (Risk::High, 15) => &HIGH_15,
        (Risk::High, _) => &HIGH_16,
    };
    Ok(table)
}

/// Landing bin in `[0, rows]`
pub fn plinko_bin(input: &DrawInput<'_>, rows: u8) -> EngineResult<u8> {
    validate_rows(rows)?;
    Ok(input.int(0, u32::from(rows) + 1)? as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Left,
    Right,
}

/// Cosmetic path for the animation: `rows` steps with exactly `bin` rights.
///
/// The step order is a Fisher-Yates shuffle keyed on sub-indices `1..rows`,
/// so replays draw the same path.
pub fn path(input: &DrawInput<'_>, rows: u8, bin: u8) -> EngineResult<Vec<Step>> {
    validate_rows(rows)?;
    if bin > rows {
        return Err(EngineError::invalid_parameter(
            "bin",
            format!("{} is outside [0, {}]", bin, rows),
        ));
    }

    let mut steps: Vec<Step> = (0..rows)
        .map(|i| if i < bin { Step::Right } else { Step::Left })
        .collect();
    for i in (1..steps.len()).rev() {
        let j = input.int(i as u32, i as u32 + 1)? as usize;
        steps.swap(i, j);
    }
    Ok(steps)
}

/// Settled ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlinkoOutcome {
    pub rows: u8,
    pub risk: Risk,
    pub bin: u8,
    pub multiplier: f64,
    pub win: bool,
}

pub fn drop_ball(input: &DrawInput<'_>, rows: u8, risk: Risk) -> EngineResult<PlinkoOutcome> {
    let table = multiplier_table(rows, risk)?;
    let bin = plinko_bin(input, rows)?;
    let multiplier = table[usize::from(bin)];
    Ok(PlinkoOutcome {
        rows,
        risk,
        bin,
        multiplier,
        win: multiplier >= 1.0,
    })
}
