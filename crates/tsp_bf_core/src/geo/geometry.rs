pub(crate) struct PathGeometry;

impl PathGeometry {
    #[inline]
    pub(crate) fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Sum of Euclidean segment lengths along `coords` in order; fewer than two points is 0.
    ///
    /// Every scorer (in-process and the HTTP service) goes through this function so the
    /// same route always produces the same bits.
    pub(crate) fn path_length(coords: impl IntoIterator<Item = (f64, f64)>) -> f64 {
        let mut coords = coords.into_iter();
        let Some(mut prev) = coords.next() else {
            return 0.0;
        };

        let mut total = 0.0;
        for next in coords {
            total += Self::dist(prev, next);
            prev = next;
        }
        total
    }

    /// [`Self::path_length`], or `None` once the sum overflows the finite range.
    pub(crate) fn finite_path_length(coords: impl IntoIterator<Item = (f64, f64)>) -> Option<f64> {
        let total = Self::path_length(coords);
        total.is_finite().then_some(total)
    }
}
