use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::Rng;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const CHUNK_LEN: usize = 13;

#[derive(Debug, Clone)]
struct ResetEntry {
    user_id: Uuid,
    expires_at: OffsetDateTime,
}

/// Process-wide store of outstanding password-reset tokens. Tokens are
/// single-use: a successful consume removes the entry, and an expired entry
/// is purged on lookup and treated as absent.
pub struct ResetTokenStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, ResetEntry>>,
}

impl ResetTokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ResetEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issues a fresh token for `user_id`, valid for the configured TTL.
    /// Two independent base-36 sequences, 26 characters combined.
    pub fn issue(&self, user_id: Uuid) -> String {
        let token = format!("{}{}", base36_chunk(CHUNK_LEN), base36_chunk(CHUNK_LEN));
        let entry = ResetEntry {
            user_id,
            expires_at: OffsetDateTime::now_utc() + self.ttl,
        };
        self.lock().insert(token.clone(), entry);
        token
    }

    /// Returns the owning user and removes the entry, but only while the
    /// token is unexpired. Check and removal happen under one lock so a
    /// token cannot be spent twice.
    pub fn consume(&self, token: &str) -> Option<Uuid> {
        let mut entries = self.lock();
        let expired = match entries.get(token) {
            None => return None,
            Some(entry) => entry.expires_at <= OffsetDateTime::now_utc(),
        };
        if expired {
            entries.remove(token);
            return None;
        }
        entries.remove(token).map(|entry| entry.user_id)
    }
}

fn base36_chunk(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}
