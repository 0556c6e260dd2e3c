use std::sync::{Mutex, MutexGuard, PoisonError};

use super::Cancellation;
use crate::Route;

/// A successfully scored route together with its canonical generation index.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredRoute {
    pub index: u64,
    pub route: Route,
    pub distance: f64,
}

impl ScoredRoute {
    pub fn new(index: u64, route: Route, distance: f64) -> Self {
        Self {
            index,
            route,
            distance,
        }
    }

    /// Strictly shorter wins; equal lengths go to the earlier generation index so the
    /// reduction does not depend on arrival order.
    pub fn beats(&self, other: &Self) -> bool {
        self.distance < other.distance
            || (self.distance == other.distance && self.index < other.index)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Offer {
    Improved,
    Kept,
    Rejected,
}

#[derive(Debug, Default)]
struct BestState {
    best: Option<ScoredRoute>,
    frozen: bool,
}

/// The single shared best-so-far cell of a run.
///
/// Every mutation goes through one mutex; the cancellation latch and the frozen flag are
/// checked under that lock so nothing lands after a run is cancelled or finished.
#[derive(Debug)]
pub struct BestSoFar {
    state: Mutex<BestState>,
    cancel: Cancellation,
}

impl BestSoFar {
    pub fn new(cancel: Cancellation) -> Self {
        Self {
            state: Mutex::new(BestState::default()),
            cancel,
        }
    }

    pub fn offer(&self, candidate: ScoredRoute) -> Offer {
        let mut state = self.lock();
        if state.frozen || self.cancel.is_cancelled() {
            return Offer::Rejected;
        }
        match &state.best {
            Some(current) if !candidate.beats(current) => Offer::Kept,
            _ => {
                state.best = Some(candidate);
                Offer::Improved
            }
        }
    }

    /// Stops accepting offers and hands out the final value.
    pub fn freeze(&self) -> Option<ScoredRoute> {
        let mut state = self.lock();
        state.frozen = true;
        state.best.clone()
    }

    fn lock(&self) -> MutexGuard<'_, BestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::{BestSoFar, Offer, ScoredRoute};
    use crate::{Route, dispatch::Cancellation};

    fn scored(index: u64, distance: f64) -> ScoredRoute {
        ScoredRoute::new(index, Route::new(vec![0, index as usize]), distance)
    }

    #[test]
    fn starts_empty_and_takes_first_offer() {
        assert!(BestSoFar::new(Cancellation::new()).freeze().is_none());

        let best = BestSoFar::new(Cancellation::new());
        assert_eq!(best.offer(scored(3, 10.0)), Offer::Improved);
        assert_eq!(best.freeze().expect("best").index, 3);
    }

    #[test]
    fn only_strictly_better_or_earlier_ties_replace() {
        let best = BestSoFar::new(Cancellation::new());
        best.offer(scored(5, 10.0));

        assert_eq!(best.offer(scored(6, 11.0)), Offer::Kept);
        assert_eq!(best.offer(scored(7, 10.0)), Offer::Kept);
        assert_eq!(best.offer(scored(2, 10.0)), Offer::Improved);
        assert_eq!(best.offer(scored(9, 4.0)), Offer::Improved);

        let final_best = best.freeze().expect("best");
        assert_eq!(final_best.index, 9);
        assert_eq!(final_best.distance, 4.0);
    }

    #[test]
    fn frozen_cell_rejects_offers() {
        let best = BestSoFar::new(Cancellation::new());
        best.offer(scored(1, 10.0));
        best.freeze();
        assert_eq!(best.offer(scored(0, 1.0)), Offer::Rejected);
        assert_eq!(best.freeze().expect("best").distance, 10.0);
    }

    #[test]
    fn cancelled_cell_rejects_offers() {
        let cancel = Cancellation::new();
        let best = BestSoFar::new(cancel.clone());
        best.offer(scored(1, 10.0));
        cancel.cancel();
        assert_eq!(best.offer(scored(0, 1.0)), Offer::Rejected);
        assert_eq!(best.freeze().expect("best").distance, 10.0);
    }

    #[test]
    fn concurrent_offers_converge_to_global_minimum() {
        let best = Arc::new(BestSoFar::new(Cancellation::new()));
        let handles: Vec<_> = (0..8u64)
            .map(|worker| {
                let best = Arc::clone(&best);
                thread::spawn(move || {
                    for i in 0..500u64 {
                        let index = worker * 500 + i;
                        let distance = ((index * 7919) % 1000) as f64;
                        best.offer(scored(index, distance));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }

        let final_best = best.freeze().expect("best");
        assert_eq!(final_best.distance, 0.0);
        assert_eq!(final_best.index, 0);
    }
}
