//! Session registry for the server-authoritative deployment.
//!
//! Each session sits behind its own mutex, so at most one operation touches a
//! given session's nonce counter at a time while different sessions proceed in
//! parallel.

use crate::config::GameConfig;
use crate::errors::{EngineError, EngineResult};
use crate::games::processor::GameProcessor;
use crate::session::{RevealedSeed, SeedCommitment};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Longest pause between idle sweeps
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct SessionSlot {
    processor: GameProcessor,
    last_active: Instant,
}

pub struct SessionStore {
    config: GameConfig,
    sessions: DashMap<String, Arc<Mutex<SessionSlot>>>,
}

impl SessionStore {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
        }
    }

    /// Start a session and register it under a fresh id
    pub fn create(&self, client_seed: Option<String>) -> EngineResult<(String, SeedCommitment)> {
        let mut processor = GameProcessor::new(self.config.clone());
        let commitment = processor.start_session(client_seed)?;
        let id = Uuid::new_v4().to_string();
        let slot = SessionSlot {
            processor,
            last_active: Instant::now(),
        };
        self.sessions.insert(id.clone(), Arc::new(Mutex::new(slot)));
        info!(session_id = %id, "Session registered");
        Ok((id, commitment))
    }

    /// Run `f` with exclusive access to the session's processor
    pub fn with_session<T, F>(&self, id: &str, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut GameProcessor) -> EngineResult<T>,
    {
        // Clone the handle out so the map shard is not held while `f` runs.
        let handle = self
            .sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::SessionNotInitialized(format!("unknown session {}", id)))?;

        let mut slot = handle
            .lock()
            .map_err(|_| EngineError::InvalidState(format!("session {} lock poisoned", id)))?;
        slot.last_active = Instant::now();
        f(&mut slot.processor)
    }

    /// Reveal the session's live seed and drop it from the registry.
    /// Refused while a blackjack round is open.
    pub fn close(&self, id: &str) -> EngineResult<Vec<RevealedSeed>> {
        let history = self.with_session(id, |p| p.close_session())?;
        self.sessions.remove(id);
        info!(session_id = %id, "Session removed");
        Ok(history)
    }

    /// Drop sessions untouched for longer than `max_idle`. Returns how many were dropped.
    ///
    /// A session whose lock is held by a request is never dropped. Seeds of an
    /// evicted session are not revealed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|id, handle| match handle.try_lock() {
            Ok(slot) => {
                let keep = slot.last_active.elapsed() < max_idle;
                if !keep {
                    debug!(session_id = %id, "Evicting idle session");
                }
                keep
            }
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(_)) => false,
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Periodically evict sessions idle for longer than `max_idle`
    pub fn start_cleanup_task(store: Arc<SessionStore>, max_idle: Duration) {
        let period = max_idle.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;
                let evicted = store.evict_idle(max_idle);
                if evicted > 0 {
                    info!(evicted, remaining = store.len(), "Idle sessions evicted");
                }
            }
        });
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::dice::Direction;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_unknown_session() {
        let store = SessionStore::new(GameConfig::default());
        let err = store.with_session("missing", |p| p.commitment()).unwrap_err();
        assert!(matches!(err, EngineError::SessionNotInitialized(_)));
    }

    #[test]
    fn test_create_and_access() {
        let store = SessionStore::new(GameConfig::default());
        let (id, commitment) = store.create(Some("client".to_string())).unwrap();

        let fetched = store.with_session(&id, |p| p.commitment()).unwrap();
        assert_eq!(fetched, commitment);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_close_removes_session() {
        let store = SessionStore::new(GameConfig::default());
        let (id, commitment) = store.create(None).unwrap();
        store
            .with_session(&id, |p| p.play_dice(1.0, 50, Direction::Under))
            .unwrap();

        let history = store.close(&id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].hashed_server_seed, commitment.hashed_server_seed);
        assert_eq!(history[0].nonces_used, 0..1);
        assert!(history[0].verify());
        assert!(store.is_empty());

        let err = store.close(&id).unwrap_err();
        assert!(matches!(err, EngineError::SessionNotInitialized(_)));
    }

    #[test]
    fn test_evict_idle_sessions() {
        let store = SessionStore::new(GameConfig::default());
        let (busy, _) = store.create(None).unwrap();
        store.create(None).unwrap();

        assert_eq!(store.evict_idle(Duration::from_secs(3600)), 0);
        assert_eq!(store.len(), 2);

        // The session running the closure holds its lock and survives the sweep
        let evicted = store
            .with_session(&busy, |_| Ok(store.evict_idle(Duration::ZERO)))
            .unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 1);
        assert!(store.with_session(&busy, |p| p.commitment()).is_ok());

        assert_eq!(store.evict_idle(Duration::ZERO), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_bets_never_share_nonce() {
        let store = Arc::new(SessionStore::new(GameConfig::default()));
        let (id, _) = store.create(None).unwrap();

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                thread::spawn(move || {
                    (0..50)
                        .map(|_| {
                            store
                                .with_session(&id, |p| p.play_dice(1.0, 50, Direction::Under))
                                .unwrap()
                                .proof
                                .nonce
                        })
                        .collect::<Vec<u64>>()
                })
            })
            .collect();

        let mut nonces = HashSet::new();
        for worker in workers {
            for nonce in worker.join().unwrap() {
                assert!(nonces.insert(nonce), "nonce {} handed out twice", nonce);
            }
        }
        assert_eq!(nonces.len(), 400);
        assert_eq!(nonces.iter().max(), Some(&399));
    }
}
