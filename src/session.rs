//! Seed/session manager
//!
//! Owns the commit-reveal lifecycle of one play session: the hidden server
//! seed, its published SHA-256 commitment, the player's client seed and the
//! nonce counter. Rotating reveals the previous server seed and commits to a
//! new one.

use crate::draw::{validate_seed, DrawInput};
use crate::errors::{EngineError, EngineResult};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Range;
use tracing::{debug, info};

pub const DEFAULT_SERVER_SEED_BYTES: usize = 32;
pub const DEFAULT_CLIENT_SEED_BYTES: usize = 16;

/// SHA-256 commitment of a server seed, hex encoded
pub fn hash_server_seed(server_seed: &str) -> String {
    hex::encode(Sha256::digest(server_seed.as_bytes()))
}

/// Check a revealed server seed against its published commitment
pub fn verify_commitment(server_seed: &str, hashed_server_seed: &str) -> bool {
    hash_server_seed(server_seed).eq_ignore_ascii_case(hashed_server_seed.trim())
}

/// Hex string of `len` bytes from the OS CSPRNG
pub fn random_seed(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Secret server seed. `Debug` never prints the seed itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerSeed(String);

impl ServerSeed {
    pub fn new(seed: String) -> EngineResult<Self> {
        validate_seed("server", &seed)?;
        Ok(Self(seed))
    }

    pub fn generate(len: usize) -> Self {
        Self(random_seed(len))
    }

    pub fn hashed(&self) -> String {
        hash_server_seed(&self.0)
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServerSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerSeed(sha256={})", self.hashed())
    }
}

/// What the player sees before betting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCommitment {
    pub hashed_server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
}

/// A retired seed pair, safe to disclose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedSeed {
    pub server_seed: String,
    pub hashed_server_seed: String,
    pub client_seed: String,
    /// Nonces consumed under this pair: `[start, end)`
    pub nonces_used: Range<u64>,
}

impl RevealedSeed {
    pub fn verify(&self) -> bool {
        verify_commitment(&self.server_seed, &self.hashed_server_seed)
    }
}

/// Seed lengths used when generating fresh seeds
#[derive(Debug, Clone, Copy)]
pub struct SeedLengths {
    pub server_bytes: usize,
    pub client_bytes: usize,
}

impl Default for SeedLengths {
    fn default() -> Self {
        Self {
            server_bytes: DEFAULT_SERVER_SEED_BYTES,
            client_bytes: DEFAULT_CLIENT_SEED_BYTES,
        }
    }
}

/// One play session: (server seed, client seed) plus the nonce counter
#[derive(Debug)]
pub struct Session {
    server_seed: ServerSeed,
    hashed_server_seed: String,
    client_seed: String,
    nonce: u64,
    round_nonce: Option<u64>,
    lengths: SeedLengths,
    revealed: Vec<RevealedSeed>,
}

impl Session {
    /// Fresh session with a generated server seed and, unless supplied, a generated client seed
    pub fn create(client_seed: Option<String>, lengths: SeedLengths) -> EngineResult<Self> {
        let client_seed = Self::resolve_client_seed(client_seed, lengths)?;
        let session = Self::from_parts(ServerSeed::generate(lengths.server_bytes), client_seed, lengths);
        info!(hashed_server_seed = %session.hashed_server_seed, "Session created");
        Ok(session)
    }

    /// Session over known seeds, for replays and tests
    pub fn with_seeds(server_seed: &str, client_seed: &str) -> EngineResult<Self> {
        let server_seed = ServerSeed::new(server_seed.to_string())?;
        validate_seed("client", client_seed)?;
        Ok(Self::from_parts(server_seed, client_seed.to_string(), SeedLengths::default()))
    }

    fn from_parts(server_seed: ServerSeed, client_seed: String, lengths: SeedLengths) -> Self {
        Self {
            hashed_server_seed: server_seed.hashed(),
            server_seed,
            client_seed,
            nonce: 0,
            round_nonce: None,
            lengths,
            revealed: Vec::new(),
        }
    }

    fn resolve_client_seed(client_seed: Option<String>, lengths: SeedLengths) -> EngineResult<String> {
        match client_seed {
            Some(seed) => {
                validate_seed("client", &seed)?;
                Ok(seed)
            }
            None => Ok(random_seed(lengths.client_bytes)),
        }
    }

    pub fn commitment(&self) -> SeedCommitment {
        SeedCommitment {
            hashed_server_seed: self.hashed_server_seed.clone(),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        }
    }

    pub fn hashed_server_seed(&self) -> &str {
        &self.hashed_server_seed
    }

    pub fn client_seed(&self) -> &str {
        &self.client_seed
    }

    /// The nonce the next draw will use
    pub fn current_nonce(&self) -> u64 {
        self.nonce
    }

    /// Return the current nonce and advance. Never hands out the same value twice.
    pub fn next_nonce(&mut self) -> u64 {
        let nonce = self.nonce;
        self.nonce += 1;
        debug!(nonce, "Nonce reserved");
        nonce
    }

    /// Reserve a contiguous block of nonces up front
    pub fn reserve_nonces(&mut self, count: u32) -> EngineResult<Range<u64>> {
        if count == 0 {
            return Err(EngineError::invalid_parameter("count", "must reserve at least one nonce"));
        }
        let start = self.nonce;
        self.nonce += u64::from(count);
        debug!(start, end = self.nonce, "Nonce block reserved");
        Ok(start..self.nonce)
    }

    /// Draw input for a nonce that has already been reserved
    pub fn draw_input(&self, nonce: u64) -> EngineResult<DrawInput<'_>> {
        if nonce >= self.nonce {
            return Err(EngineError::InvalidState(format!(
                "nonce {} has not been reserved",
                nonce
            )));
        }
        DrawInput::new(self.server_seed.expose(), &self.client_seed, nonce)
    }

    /// Mark a multi-step round (blackjack) as open on the given nonce
    pub fn begin_round(&mut self, nonce: u64) -> EngineResult<()> {
        if let Some(open) = self.round_nonce {
            return Err(EngineError::InvalidState(format!(
                "round on nonce {} is still in progress",
                open
            )));
        }
        self.round_nonce = Some(nonce);
        Ok(())
    }

    /// Close the open round. The round's nonce stays spent.
    pub fn end_round(&mut self) {
        self.round_nonce = None;
    }

    pub fn round_in_progress(&self) -> bool {
        self.round_nonce.is_some()
    }

    /// Reveal the current server seed and commit to a new pair.
    ///
    /// Fails while a round is open: the round must settle or be abandoned first.
    pub fn rotate(&mut self, new_client_seed: Option<String>) -> EngineResult<RevealedSeed> {
        if let Some(open) = self.round_nonce {
            return Err(EngineError::InvalidState(format!(
                "cannot rotate seeds while round on nonce {} is in progress",
                open
            )));
        }
        let client_seed = Self::resolve_client_seed(new_client_seed, self.lengths)?;

        let next_server = ServerSeed::generate(self.lengths.server_bytes);
        let previous_server = std::mem::replace(&mut self.server_seed, next_server);
        let previous_client = std::mem::replace(&mut self.client_seed, client_seed);
        let previous_hash = std::mem::replace(&mut self.hashed_server_seed, self.server_seed.hashed());
        let used = std::mem::replace(&mut self.nonce, 0);

        let revealed = RevealedSeed {
            server_seed: previous_server.expose().to_string(),
            hashed_server_seed: previous_hash,
            client_seed: previous_client,
            nonces_used: 0..used,
        };
        info!(
            revealed_hash = %revealed.hashed_server_seed,
            nonces_used = used,
            next_hash = %self.hashed_server_seed,
            "Seeds rotated"
        );
        self.revealed.push(revealed.clone());
        Ok(revealed)
    }

    /// End the session, revealing the live server seed.
    ///
    /// Returns every pair this session used, oldest first. Fails while a round is open.
    pub fn close(&mut self) -> EngineResult<Vec<RevealedSeed>> {
        if let Some(open) = self.round_nonce {
            return Err(EngineError::InvalidState(format!(
                "cannot close session while round on nonce {} is in progress",
                open
            )));
        }
        let revealed = RevealedSeed {
            server_seed: self.server_seed.expose().to_string(),
            hashed_server_seed: self.hashed_server_seed.clone(),
            client_seed: self.client_seed.clone(),
            nonces_used: 0..self.nonce,
        };
        info!(
            revealed_hash = %revealed.hashed_server_seed,
            nonces_used = self.nonce,
            "Session closed"
        );
        let mut history = std::mem::take(&mut self.revealed);
        history.push(revealed);
        Ok(history)
    }

    /// The server seed most recently rotated away from
    pub fn reveal_server_seed(&self) -> EngineResult<&RevealedSeed> {
        self.revealed.last().ok_or_else(|| {
            EngineError::InvalidState("no server seed has been rotated out yet".to_string())
        })
    }

    /// Every seed pair retired in this session, oldest first
    pub fn revealed_history(&self) -> &[RevealedSeed] {
        &self.revealed
    }
}
