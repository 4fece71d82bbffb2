//! Counting permits that rotate the single in-flight line between stages.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::error::{PipelineError, Result};

/// A counting semaphore that can be closed.
///
/// Once closed, every pending and future [`acquire`](Permit::acquire) fails
/// with [`PipelineError::Cancelled`], even if units are still available.
pub struct Permit {
    name: &'static str,
    state: Mutex<PermitState>,
    available: Condvar,
}

struct PermitState {
    count: usize,
    closed: bool,
}

impl Permit {
    pub fn new(name: &'static str, initial: usize) -> Self {
        Self {
            name,
            state: Mutex::new(PermitState {
                count: initial,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Block until a unit is available and take it.
    pub fn acquire(&self) -> Result<()> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(PipelineError::Cancelled);
            }
            if state.count > 0 {
                state.count -= 1;
                trace!(permit = self.name, "acquired");
                return Ok(());
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Return one unit and wake one waiter.
    pub fn release(&self) {
        self.lock().count += 1;
        trace!(permit = self.name, "released");
        self.available.notify_one();
    }

    /// Fail all current and future acquisitions.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Units currently available.
    pub fn available(&self) -> usize {
        self.lock().count
    }

    // Permit state is two scalars with no cross-field invariant, so a
    // poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, PermitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Permit")
            .field("name", &self.name)
            .field("count", &state.count)
            .field("closed", &state.closed)
            .finish()
    }
}

/// The three permits of one pipeline, in cycle order.
///
/// `read_turn` starts with one unit so the Producer moves first; the
/// other two start empty. Each stage acquires its own permit and releases
/// the next one, so exactly one unit circulates.
#[derive(Debug)]
pub struct Turnstile {
    pub read_turn: Permit,
    pub relay_ready: Permit,
    pub filter_ready: Permit,
}

impl Turnstile {
    pub fn new() -> Self {
        Self {
            read_turn: Permit::new("read-turn", 1),
            relay_ready: Permit::new("relay-ready", 0),
            filter_ready: Permit::new("filter-ready", 0),
        }
    }

    /// Close every permit so all blocked stages return `Cancelled`.
    pub fn close_all(&self) {
        self.read_turn.close();
        self.relay_ready.close();
        self.filter_ready.close();
    }

    pub fn is_closed(&self) -> bool {
        self.read_turn.is_closed()
    }
}

impl Default for Turnstile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn acquire_consumes_initial_units() {
        let permit = Permit::new("test", 2);
        permit.acquire().unwrap();
        permit.acquire().unwrap();
        assert_eq!(permit.available(), 0);
    }

    #[test]
    fn release_wakes_blocked_acquire() {
        let permit = Arc::new(Permit::new("test", 0));
        let waiter = {
            let permit = Arc::clone(&permit);
            std::thread::spawn(move || permit.acquire())
        };

        std::thread::sleep(Duration::from_millis(20));
        permit.release();

        waiter.join().unwrap().unwrap();
        assert_eq!(permit.available(), 0);
    }

    #[test]
    fn close_fails_blocked_acquire() {
        let permit = Arc::new(Permit::new("test", 0));
        let waiter = {
            let permit = Arc::clone(&permit);
            std::thread::spawn(move || permit.acquire())
        };

        std::thread::sleep(Duration::from_millis(20));
        permit.close();

        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[test]
    fn closed_permit_refuses_available_units() {
        let permit = Permit::new("test", 1);
        permit.close();
        assert!(permit.acquire().unwrap_err().is_cancelled());
        assert_eq!(permit.available(), 1);
    }

    #[test]
    fn turnstile_starts_with_read_turn() {
        let turnstile = Turnstile::new();
        assert_eq!(turnstile.read_turn.available(), 1);
        assert_eq!(turnstile.relay_ready.available(), 0);
        assert_eq!(turnstile.filter_ready.available(), 0);
    }

    #[test]
    fn turnstile_rotates_in_order() {
        let turnstile = Arc::new(Turnstile::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        const ROUNDS: usize = 50;

        let spawn = |name: &'static str,
                     mine: fn(&Turnstile) -> &Permit,
                     next: fn(&Turnstile) -> &Permit| {
            let turnstile = Arc::clone(&turnstile);
            let log = Arc::clone(&log);
            std::thread::spawn(move || {
                for _ in 0..ROUNDS {
                    mine(&turnstile).acquire().unwrap();
                    log.lock().unwrap().push(name);
                    next(&turnstile).release();
                }
            })
        };

        let handles = [
            spawn("filter", |t| &t.filter_ready, |t| &t.read_turn),
            spawn("relay", |t| &t.relay_ready, |t| &t.filter_ready),
            spawn("producer", |t| &t.read_turn, |t| &t.relay_ready),
        ];
        for handle in handles {
            handle.join().unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.len(), ROUNDS * 3);
        for cycle in log.chunks(3) {
            assert_eq!(cycle, ["producer", "relay", "filter"]);
        }
    }

    #[test]
    fn close_all_cancels_every_stage() {
        let turnstile = Turnstile::new();
        turnstile.close_all();
        assert!(turnstile.is_closed());
        assert!(turnstile.read_turn.acquire().is_err());
        assert!(turnstile.relay_ready.acquire().is_err());
        assert!(turnstile.filter_ready.acquire().is_err());
    }
}
