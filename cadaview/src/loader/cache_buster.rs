//! Query tokens that defeat intermediate HTTP caches.

use std::sync::atomic::{AtomicU64, Ordering};

/// Query parameter carrying the token.
pub const CACHE_BUSTER_PARAM: &str = "v";

/// Issues strictly increasing tokens, seeded from the wall clock.
///
/// Each token is the current time in milliseconds, or one more than the
/// previous token when the clock has not moved (or went backwards).
#[derive(Debug)]
pub struct CacheBuster {
    last: AtomicU64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// A buster whose first token is greater than `seed`.
    pub fn starting_at(seed: u64) -> Self {
        Self {
            last: AtomicU64::new(seed),
        }
    }

    pub fn next_token(&self) -> u64 {
        let now = now_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }

    /// Appends a fresh token to `url`.
    pub fn apply(&self, url: &str) -> String {
        append_token(url, self.next_token())
    }
}

impl Default for CacheBuster {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends `v=<token>`, using `&` when the URL already has a query.
pub fn append_token(url: &str, token: u64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, CACHE_BUSTER_PARAM, token)
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_token_separator() {
        assert_eq!(append_token("lots.geojson", 5), "lots.geojson?v=5");
        assert_eq!(append_token("lots.geojson?a=1", 5), "lots.geojson?a=1&v=5");
    }

    #[test]
    fn test_tokens_strictly_increase() {
        let buster = CacheBuster::new();
        let mut previous = buster.next_token();
        for _ in 0..1000 {
            let token = buster.next_token();
            assert!(token > previous);
            previous = token;
        }
    }

    #[test]
    fn test_tokens_follow_clock() {
        let before = now_millis();
        let token = CacheBuster::new().next_token();
        assert!(token >= before);
    }

    #[test]
    fn test_seed_ahead_of_clock_still_increases() {
        let seed = now_millis() + 1_000_000;
        let buster = CacheBuster::starting_at(seed);
        assert_eq!(buster.next_token(), seed + 1);
        assert_eq!(buster.next_token(), seed + 2);
    }

    #[test]
    fn test_concurrent_tokens_are_unique() {
        let buster = CacheBuster::new();
        let mut tokens: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..250).map(|_| buster.next_token()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        let count = tokens.len();
        tokens.sort_unstable();
        tokens.dedup();
        assert_eq!(tokens.len(), count);
    }
}
