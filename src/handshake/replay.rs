//! Replay protection for ClientHello randoms.
//!
//! A captured disguised ClientHello would authenticate again if resent, so
//! every random is remembered and a second sighting is refused. Memory is
//! bounded: entries older than the retention window are purged and, under
//! sustained load, the oldest entry gives way once the capacity is reached.
//! A repeat is therefore only guaranteed to be caught while the original is
//! still retained. Clients embed a timestamp that the authenticator checks,
//! so a window longer than that tolerance closes the gap in practice.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::handshake::RANDOM_SIZE;

/// How long a random is remembered by default
pub const DEFAULT_REPLAY_WINDOW: Duration = Duration::from_secs(12 * 60 * 60);

/// How many randoms are remembered at most by default
pub const DEFAULT_REPLAY_CAPACITY: usize = 1 << 17;

/// Process-wide set of recently seen ClientHello randoms.
pub struct ReplayGuard {
    seen: Mutex<SeenRandoms>,
    window: Duration,
    capacity: usize,
}

#[derive(Default)]
struct SeenRandoms {
    /// Arrival order, oldest first
    order: VecDeque<(Instant, [u8; RANDOM_SIZE])>,
    known: HashSet<[u8; RANDOM_SIZE]>,
}

impl SeenRandoms {
    fn expire(&mut self, now: Instant, window: Duration) {
        while let Some((seen_at, _)) = self.order.front() {
            if now.saturating_duration_since(*seen_at) < window {
                break;
            }
            self.evict_oldest();
        }
    }

    fn evict_oldest(&mut self) {
        if let Some((_, random)) = self.order.pop_front() {
            self.known.remove(&random);
        }
    }
}

impl ReplayGuard {
    /// Create a guard retaining randoms for `window`, holding at most
    /// `capacity` of them.
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            seen: Mutex::new(SeenRandoms::default()),
            window,
            capacity: capacity.max(1),
        }
    }

    /// Record `random`, returning `true` if it was already present.
    ///
    /// Check and insert happen under one lock, so of several concurrent
    /// callers presenting the same value exactly one gets `false`.
    pub fn register(&self, random: &[u8; RANDOM_SIZE]) -> bool {
        let mut seen = self.seen.lock();
        self.register_locked(&mut seen, random, Instant::now())
    }

    /// [`register`](Self::register) with an explicit arrival time.
    ///
    /// Arrival times must not go backwards between calls.
    pub fn register_at(&self, random: &[u8; RANDOM_SIZE], now: Instant) -> bool {
        let mut seen = self.seen.lock();
        self.register_locked(&mut seen, random, now)
    }

    fn register_locked(
        &self,
        seen: &mut SeenRandoms,
        random: &[u8; RANDOM_SIZE],
        now: Instant,
    ) -> bool {
        seen.expire(now, self.window);

        if seen.known.contains(random) {
            return true;
        }

        if seen.order.len() >= self.capacity {
            seen.evict_oldest();
        }
        seen.known.insert(*random);
        seen.order.push_back((now, *random));
        false
    }

    /// Number of randoms currently retained.
    pub fn len(&self) -> usize {
        self.seen.lock().order.len()
    }

    /// Whether no randoms are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retention window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Maximum number of retained randoms.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_WINDOW, DEFAULT_REPLAY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    fn random(n: u8) -> [u8; RANDOM_SIZE] {
        [n; RANDOM_SIZE]
    }

    #[test]
    fn test_second_registration_is_replay() {
        let guard = ReplayGuard::default();
        assert!(!guard.register(&random(1)));
        assert!(guard.register(&random(1)));
        assert!(guard.register(&random(1)));
        assert!(!guard.register(&random(2)));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn test_expired_randoms_forgotten() {
        let guard = ReplayGuard::new(Duration::from_secs(60), 16);
        let start = Instant::now();

        assert!(!guard.register_at(&random(1), start));
        assert!(guard.register_at(&random(1), start + Duration::from_secs(59)));
        assert!(!guard.register_at(&random(1), start + Duration::from_secs(60)));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_replay_does_not_refresh_entry() {
        let guard = ReplayGuard::new(Duration::from_secs(60), 16);
        let start = Instant::now();

        assert!(!guard.register_at(&random(1), start));
        assert!(guard.register_at(&random(1), start + Duration::from_secs(30)));
        assert!(!guard.register_at(&random(1), start + Duration::from_secs(61)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let guard = ReplayGuard::new(Duration::from_secs(3600), 3);
        for n in 0..3 {
            assert!(!guard.register(&random(n)));
        }
        assert!(!guard.register(&random(3)));
        assert_eq!(guard.len(), 3);

        // 0 was evicted, 1..=3 are still caught
        assert!(guard.register(&random(3)));
        assert!(guard.register(&random(2)));
        assert!(!guard.register(&random(0)));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let guard = ReplayGuard::new(Duration::from_secs(1), 0);
        assert_eq!(guard.capacity(), 1);
        assert!(!guard.register(&random(7)));
        assert!(guard.register(&random(7)));
    }

    #[test]
    fn test_concurrent_registration_single_winner() {
        const THREADS: usize = 16;

        let guard = Arc::new(ReplayGuard::default());
        let barrier = Arc::new(Barrier::new(THREADS));
        let fresh = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let barrier = Arc::clone(&barrier);
                let fresh = Arc::clone(&fresh);
                std::thread::spawn(move || {
                    barrier.wait();
                    if !guard.register(&random(0xee)) {
                        fresh.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(fresh.load(Ordering::SeqCst), 1);
        assert_eq!(guard.len(), 1);
    }
}
