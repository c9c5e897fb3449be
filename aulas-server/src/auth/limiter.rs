use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

const MAX_LOGIN_ATTEMPTS: u32 = 5;
const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
struct Attempts {
    count: u32,
    since: SystemTime,
}

/// Per-username login throttle. Entries whose window has passed are dropped
/// on every check, so the map only holds names seen within one window.
pub struct LoginLimiter {
    attempts: RwLock<HashMap<String, Attempts>>,
    max_attempts: u32,
    window: Duration,
}

impl Default for LoginLimiter {
    fn default() -> Self {
        Self::new(MAX_LOGIN_ATTEMPTS, LOGIN_WINDOW)
    }
}

impl LoginLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            max_attempts,
            window,
        }
    }

    /// Counts one attempt for `username`. Returns false once the window's
    /// budget is spent.
    pub async fn try_acquire(&self, username: &str) -> bool {
        self.try_acquire_at(username, SystemTime::now()).await
    }

    /// Forgets `username`, after a successful login.
    pub async fn reset(&self, username: &str) {
        self.attempts.write().await.remove(username);
    }

    async fn try_acquire_at(&self, username: &str, now: SystemTime) -> bool {
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, entry| !self.expired(entry, now));

        let entry = attempts
            .entry(username.to_string())
            .or_insert(Attempts {
                count: 0,
                since: now,
            });

        if entry.count >= self.max_attempts {
            return false;
        }
        entry.count += 1;
        true
    }

    // A clock that went backwards keeps the entry.
    fn expired(&self, entry: &Attempts, now: SystemTime) -> bool {
        now.duration_since(entry.since)
            .map_or(false, |age| age > self.window)
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.attempts.read().await.len()
    }
}
