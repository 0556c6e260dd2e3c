use std::ops::Range;

use super::{Route, TourKind};

/// Canonical enumeration of every route over `n` waypoints with the anchor (position 0) fixed.
///
/// Routes are ordered lexicographically by their non-anchor positions, so index `i` always
/// names the same route. Any contiguous index range can be rebuilt independently, which is
/// what lets partitioned workers scan without sharing generator state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RouteGenerator {
    n: usize,
    tour: TourKind,
}

impl RouteGenerator {
    pub fn new(n: usize, tour: TourKind) -> Self {
        Self { n, tour }
    }

    /// `(n-1)!`; a single waypoint still yields its one trivial route.
    pub fn total(&self) -> u64 {
        if self.n == 0 {
            return 0;
        }
        factorial(self.n - 1)
    }

    /// Unranks `index` into its route, or `None` past the end.
    pub fn route_at(&self, index: u64) -> Option<Route> {
        if index >= self.total() {
            return None;
        }
        let mut stops = Vec::with_capacity(self.route_len());
        stops.push(0);
        stops.extend(unrank(self.n - 1, index).into_iter().map(|p| p + 1));
        if self.tour == TourKind::Closed {
            stops.push(0);
        }
        Some(Route::new(stops))
    }

    /// Scans `range` (clamped to the total) in canonical order.
    pub fn scan(&self, range: Range<u64>) -> RouteScan {
        let end = range.end.min(self.total());
        let start = range.start.min(end);
        let stops = self
            .route_at(start)
            .map(|route| route.stops().to_vec())
            .unwrap_or_default();
        RouteScan {
            stops,
            tour: self.tour,
            next: start,
            end,
            primed: true,
        }
    }

    pub fn routes(&self) -> RouteScan {
        self.scan(0..self.total())
    }

    /// Splits `0..total` into at most `parts` contiguous, non-empty, ordered ranges.
    pub fn partition(&self, parts: usize) -> Vec<Range<u64>> {
        let total = self.total();
        let parts = (parts.max(1) as u64).min(total.max(1));
        let base = total / parts;
        let extra = total % parts;

        let mut ranges = Vec::with_capacity(parts as usize);
        let mut start = 0;
        for i in 0..parts {
            let len = base + u64::from(i < extra);
            if len == 0 {
                continue;
            }
            ranges.push(start..start + len);
            start += len;
        }
        ranges
    }

    fn route_len(&self) -> usize {
        match self.tour {
            TourKind::Open => self.n,
            TourKind::Closed => self.n + 1,
        }
    }
}

/// Cursor over a contiguous index range, stepping the route buffer in place.
#[derive(Clone, Debug)]
pub struct RouteScan {
    stops: Vec<usize>,
    tour: TourKind,
    next: u64,
    end: u64,
    primed: bool,
}

impl RouteScan {
    /// Advances without allocating; the slice is only valid until the next call.
    pub fn next_stops(&mut self) -> Option<(u64, &[usize])> {
        if self.next >= self.end {
            return None;
        }
        if !self.primed {
            let len = self.stops.len();
            let middle = match self.tour {
                TourKind::Open => &mut self.stops[1..],
                TourKind::Closed => &mut self.stops[1..len - 1],
            };
            if !next_permutation(middle) {
                self.next = self.end;
                return None;
            }
        }
        self.primed = false;
        let index = self.next;
        self.next += 1;
        Some((index, &self.stops))
    }

    pub fn remaining(&self) -> u64 {
        self.end - self.next
    }
}

impl Iterator for RouteScan {
    type Item = (u64, Route);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_stops()
            .map(|(index, stops)| (index, Route::new(stops.to_vec())))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

pub(crate) fn factorial(k: usize) -> u64 {
    (1..=k as u64).product()
}

/// Lexicographic permutation of `0..m` with rank `index` (factorial number system).
fn unrank(m: usize, mut index: u64) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..m).collect();
    let mut out = Vec::with_capacity(m);
    for k in (0..m).rev() {
        let f = factorial(k);
        let digit = (index / f) as usize;
        index %= f;
        out.push(pool.remove(digit));
    }
    out
}

/// Rearranges `items` into the next lexicographic permutation; false when already last.
fn next_permutation(items: &mut [usize]) -> bool {
    let n = items.len();
    if n < 2 {
        return false;
    }
    let Some(i) = (0..n - 1).rev().find(|&i| items[i] < items[i + 1]) else {
        return false;
    };
    let j = (i + 1..n)
        .rev()
        .find(|&j| items[j] > items[i])
        .unwrap_or(i + 1);
    items.swap(i, j);
    items[i + 1..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{RouteGenerator, factorial, next_permutation, unrank};
    use crate::route::TourKind;

    #[test]
    fn factorial_matches_known_values() {
        assert_eq!(factorial(0), 1);
        assert_eq!(factorial(1), 1);
        assert_eq!(factorial(5), 120);
        assert_eq!(factorial(20), 2_432_902_008_176_640_000);
    }

    #[test]
    fn yields_n_minus_one_factorial_distinct_routes_with_fixed_anchor() {
        for n in 1..=7 {
            let generator = RouteGenerator::new(n, TourKind::Closed);
            let routes: Vec<_> = generator.routes().map(|(_, r)| r).collect();
            assert_eq!(routes.len() as u64, factorial(n - 1), "n={n}");

            let unique: HashSet<_> = routes.iter().cloned().collect();
            assert_eq!(unique.len(), routes.len());

            for route in &routes {
                let stops = route.stops();
                assert_eq!(stops.len(), n + 1);
                assert_eq!(stops[0], 0);
                assert_eq!(stops[n], 0);
                let mut middle = stops[1..n].to_vec();
                middle.sort_unstable();
                assert_eq!(middle, (1..n).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn open_routes_visit_each_waypoint_once() {
        let generator = RouteGenerator::new(4, TourKind::Open);
        let first = generator.route_at(0).expect("first route");
        let last = generator.route_at(5).expect("last route");
        assert_eq!(first.stops(), &[0, 1, 2, 3]);
        assert_eq!(last.stops(), &[0, 3, 2, 1]);
        assert!(generator.route_at(6).is_none());
    }

    #[test]
    fn route_at_agrees_with_sequential_scan() {
        let generator = RouteGenerator::new(6, TourKind::Open);
        for (index, route) in generator.routes() {
            assert_eq!(generator.route_at(index), Some(route));
        }
    }

    #[test]
    fn scan_of_partitions_reproduces_full_sequence() {
        let generator = RouteGenerator::new(6, TourKind::Closed);
        let full: Vec<_> = generator.routes().collect();

        for parts in [1, 3, 7, 1000] {
            let stitched: Vec<_> = generator
                .partition(parts)
                .into_iter()
                .flat_map(|range| generator.scan(range))
                .collect();
            assert_eq!(stitched, full, "parts={parts}");
        }
    }

    #[test]
    fn partition_is_contiguous_and_balanced() {
        let generator = RouteGenerator::new(5, TourKind::Open);
        let ranges = generator.partition(5);
        assert_eq!(ranges, vec![0..5, 5..10, 10..15, 15..20, 20..24]);

        let tiny = RouteGenerator::new(2, TourKind::Open).partition(8);
        assert_eq!(tiny, vec![0..1]);
    }

    #[test]
    fn single_and_pair_sets_have_one_route() {
        let single = RouteGenerator::new(1, TourKind::Closed);
        assert_eq!(single.total(), 1);
        assert_eq!(single.route_at(0).expect("route").stops(), &[0, 0]);

        let pair = RouteGenerator::new(2, TourKind::Open);
        let routes: Vec<_> = pair.routes().map(|(_, r)| r).collect();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].stops(), &[0, 1]);
    }

    #[test]
    fn scan_clamps_out_of_range_bounds() {
        let generator = RouteGenerator::new(3, TourKind::Open);
        assert_eq!(generator.scan(1..99).count(), 1);
        assert_eq!(generator.scan(5..9).count(), 0);
    }

    #[test]
    fn unrank_and_next_permutation_follow_lexicographic_order() {
        assert_eq!(unrank(3, 0), vec![0, 1, 2]);
        assert_eq!(unrank(3, 3), vec![1, 2, 0]);
        assert_eq!(unrank(3, 5), vec![2, 1, 0]);

        let mut items = vec![1, 2, 0];
        assert!(next_permutation(&mut items));
        assert_eq!(items, vec![2, 0, 1]);

        let mut last = vec![2, 1, 0];
        assert!(!next_permutation(&mut last));
    }
}
