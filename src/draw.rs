//! Deterministic draw function
//!
//! The only source of randomness for every game. A draw is derived from the
//! message `"{server_seed}:{client_seed}:{nonce}:{sub_index}"`:
//!
//! 1. hash the UTF-8 message with SHA-256
//! 2. read the first 4 bytes of the digest as a big-endian `u32`
//! 3. divide by 2^32, giving a float in `[0, 1)`
//!
//! `draw_int(max)` is `floor(draw * max)`. Both steps are exact in IEEE-754
//! double precision for every `max` a game uses, so any third party can
//! recompute a draw from the revealed seeds.

use crate::errors::{EngineError, EngineResult};
use sha2::{Digest, Sha256};

/// Separator between message components. Seeds may not contain it.
pub const SEPARATOR: char = ':';

const PREFIX_RANGE: f64 = 4_294_967_296.0; // 2^32

/// Validate a seed before it is used in a draw message
pub fn validate_seed(kind: &str, seed: &str) -> EngineResult<()> {
    if seed.trim().is_empty() {
        return Err(EngineError::InvalidSeed(format!("{} seed is empty", kind)));
    }
    if seed.contains(SEPARATOR) {
        return Err(EngineError::InvalidSeed(format!(
            "{} seed must not contain '{}'",
            kind, SEPARATOR
        )));
    }
    Ok(())
}

/// Full SHA-256 digest of the draw message
pub fn draw_digest(server_seed: &str, client_seed: &str, nonce: u64, sub_index: u32) -> [u8; 32] {
    let message = format!(
        "{}{sep}{}{sep}{}{sep}{}",
        server_seed,
        client_seed,
        nonce,
        sub_index,
        sep = SEPARATOR
    );
    Sha256::digest(message.as_bytes()).into()
}

/// Draw a float in `[0, 1)`
pub fn draw(server_seed: &str, client_seed: &str, nonce: u64, sub_index: u32) -> EngineResult<f64> {
    validate_seed("server", server_seed)?;
    validate_seed("client", client_seed)?;
    Ok(digest_to_unit(&draw_digest(server_seed, client_seed, nonce, sub_index)))
}

/// Draw an integer in `[0, max)`
pub fn draw_int(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    sub_index: u32,
    max: u32,
) -> EngineResult<u32> {
    if max == 0 {
        return Err(EngineError::invalid_parameter("max", "must be greater than zero"));
    }
    let value = draw(server_seed, client_seed, nonce, sub_index)?;
    Ok(scale(value, max))
}

fn digest_to_unit(digest: &[u8; 32]) -> f64 {
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix as f64 / PREFIX_RANGE
}

fn scale(value: f64, max: u32) -> u32 {
    (value * max as f64).floor() as u32
}

/// A validated (server seed, client seed, nonce) triple.
///
/// Every game mapper takes one of these. Construction checks the seeds once so
/// the individual draws cannot fail on seed grounds.
#[derive(Debug, Clone, Copy)]
pub struct DrawInput<'a> {
    server_seed: &'a str,
    client_seed: &'a str,
    nonce: u64,
}

impl<'a> DrawInput<'a> {
    pub fn new(server_seed: &'a str, client_seed: &'a str, nonce: u64) -> EngineResult<Self> {
        validate_seed("server", server_seed)?;
        validate_seed("client", client_seed)?;
        Ok(Self {
            server_seed,
            client_seed,
            nonce,
        })
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Float in `[0, 1)` for the given sub-index
    pub fn float(&self, sub_index: u32) -> f64 {
        digest_to_unit(&draw_digest(self.server_seed, self.client_seed, self.nonce, sub_index))
    }

    /// Integer in `[0, max)` for the given sub-index
    pub fn int(&self, sub_index: u32, max: u32) -> EngineResult<u32> {
        if max == 0 {
            return Err(EngineError::invalid_parameter("max", "must be greater than zero"));
        }
        Ok(scale(self.float(sub_index), max))
    }

    /// Hex digest for audit displays
    pub fn digest(&self, sub_index: u32) -> String {
        hex::encode(draw_digest(self.server_seed, self.client_seed, self.nonce, sub_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_deterministic() {
        for nonce in 0..50 {
            for sub_index in 0..4 {
                let a = draw("server", "client", nonce, sub_index).unwrap();
                let b = draw("server", "client", nonce, sub_index).unwrap();
                assert_eq!(a.to_bits(), b.to_bits());
            }
        }
    }

    #[test]
    fn test_draw_range() {
        for nonce in 0..1000 {
            let value = draw("range-server", "range-client", nonce, 0).unwrap();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_known_vector() {
        // floor(draw * 10000) for ("abc", "xyz", 1, 0)
        assert_eq!(draw_int("abc", "xyz", 1, 0, 10_000).unwrap(), 2059);
        assert_eq!(draw_int("abc", "xyz", 1, 0, 17).unwrap(), 3);
    }

    #[test]
    fn test_sub_index_changes_value() {
        let input = DrawInput::new("server", "client", 7).unwrap();
        let values: Vec<u64> = (0..8).map(|i| input.float(i).to_bits()).collect();
        let unique: std::collections::HashSet<_> = values.iter().collect();
        assert_eq!(unique.len(), values.len());
    }

    #[test]
    fn test_input_matches_free_functions() {
        let input = DrawInput::new("s", "c", 42).unwrap();
        assert_eq!(input.float(3), draw("s", "c", 42, 3).unwrap());
        assert_eq!(input.int(3, 52).unwrap(), draw_int("s", "c", 42, 3, 52).unwrap());
        assert_eq!(input.digest(0).len(), 64);
    }

    #[test]
    fn test_invalid_seeds_rejected() {
        assert!(matches!(draw("", "client", 0, 0), Err(EngineError::InvalidSeed(_))));
        assert!(matches!(draw("server", "   ", 0, 0), Err(EngineError::InvalidSeed(_))));
        assert!(matches!(
            DrawInput::new("a:b", "client", 0),
            Err(EngineError::InvalidSeed(_))
        ));
    }

    #[test]
    fn test_zero_max_rejected() {
        assert!(matches!(
            draw_int("server", "client", 0, 0, 0),
            Err(EngineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_draw_int_bounds() {
        let input = DrawInput::new("bounds", "check", 1).unwrap();
        for max in 1..=64 {
            for sub_index in 0..16 {
                assert!(input.int(sub_index, max).unwrap() < max);
            }
        }
    }
}
