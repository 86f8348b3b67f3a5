//! Cooperative cancellation of long-running searches.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// A cloneable handle that asks a running assembly search to stop.
///
/// The search polls the token between units of work; after cancellation it
/// unwinds and reports the best assembly index found so far.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Combines a [`CancelToken`] with an optional wall-time deadline. Once
/// tripped it stays tripped.
#[derive(Debug)]
pub(crate) struct Interrupt {
    token: CancelToken,
    deadline: Option<Instant>,
    tripped: bool,
}

impl Interrupt {
    pub(crate) fn new(token: CancelToken, run_time: Option<Duration>) -> Self {
        Self {
            token,
            deadline: run_time.map(|d| Instant::now() + d),
            tripped: false,
        }
    }

    /// Check the token and the deadline; return `true` if work should stop.
    pub(crate) fn poll(&mut self) -> bool {
        if !self.tripped {
            self.tripped = self.token.is_cancelled()
                || self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        }
        self.tripped
    }

    /// Return `true` if a previous poll tripped.
    pub(crate) fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Trip without consulting the token or the deadline.
    pub(crate) fn trip(&mut self) {
        self.tripped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_trips_interrupt() {
        let token = CancelToken::new();
        let mut interrupt = Interrupt::new(token.clone(), None);
        assert!(!interrupt.poll());
        token.cancel();
        assert!(!interrupt.is_tripped());
        assert!(interrupt.poll());
        assert!(interrupt.is_tripped());
    }

    #[test]
    fn manual_trip_is_sticky() {
        let mut interrupt = Interrupt::new(CancelToken::new(), None);
        interrupt.trip();
        assert!(interrupt.is_tripped());
        assert!(interrupt.poll());
    }

    #[test]
    fn zero_deadline_trips_immediately() {
        let mut interrupt = Interrupt::new(CancelToken::new(), Some(Duration::ZERO));
        assert!(interrupt.poll());
    }
}
