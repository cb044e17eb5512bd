use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Two-phase value: `pending` is what the user sees right after acting,
/// `confirmed` is the last thing the server said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimistic<T> {
    confirmed: T,
    pending: Option<T>,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(confirmed: T) -> Self {
        Self {
            confirmed,
            pending: None,
        }
    }

    /// The value to display.
    pub fn current(&self) -> &T {
        self.pending.as_ref().unwrap_or(&self.confirmed)
    }

    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn begin(&mut self, next: T) {
        self.pending = Some(next);
    }

    /// The server answered; its value wins over whatever was shown.
    pub fn confirm(&mut self, authoritative: T) {
        self.confirmed = authoritative;
        self.pending = None;
    }

    /// Keeps the optimistic value as the new baseline until something fresher
    /// arrives.
    pub fn settle(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.confirmed = pending;
        }
    }

    pub fn rollback(&mut self) {
        self.pending = None;
    }

    /// Updates the baseline without disturbing an in-flight change.
    pub fn refresh(&mut self, authoritative: T) {
        self.confirmed = authoritative;
    }
}

/// Per-control in-flight flag.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another request from the same control is in flight.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_restores_the_confirmed_value() {
        let mut count = Optimistic::new(3u64);
        count.begin(2);
        assert_eq!(*count.current(), 2);
        assert!(count.is_pending());

        count.refresh(5);
        assert_eq!(*count.current(), 2);
        count.rollback();
        assert_eq!(*count.current(), 5);
    }

    #[test]
    fn confirm_replaces_the_optimistic_guess() {
        let mut flag = Optimistic::new(false);
        flag.begin(true);
        flag.confirm(false);
        assert!(!flag.current());
        assert!(!flag.is_pending());

        flag.begin(true);
        flag.settle();
        assert!(*flag.confirmed());
    }

    #[test]
    fn busy_flag_admits_one_holder() {
        let flag = BusyFlag::new();
        let guard = flag.try_acquire().unwrap();
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());
        drop(guard);
        assert!(flag.try_acquire().is_some());
    }
}
