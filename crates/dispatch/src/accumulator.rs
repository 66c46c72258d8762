//! Running aggregates over per-event waveforms.

use thiserror::Error;

/// Errors from merging a waveform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccumulatorError {
    #[error("Waveform has {found} samples, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },
}

/// Sum, mean, and per-event histogram of all merged waveforms.
///
/// Merging is elementwise addition plus a push onto the histogram, so the
/// result does not depend on the order in which waveforms arrive (up to
/// floating-point rounding). The histogram's order is arrival order and
/// carries no meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    /// Events the run will merge; the mean's divisor.
    n_events: u64,
    /// Elementwise sum. Length fixed at construction.
    sum: Vec<f64>,
    /// Total of each merged waveform.
    histogram: Vec<f64>,
}

impl Accumulator {
    /// Create an empty accumulator for `n_events` waveforms of `n_bins`
    /// samples each.
    pub fn new(n_bins: usize, n_events: u64) -> Self {
        Self {
            n_events,
            sum: vec![0.0; n_bins],
            histogram: Vec::with_capacity(n_events.min(1 << 20) as usize),
        }
    }

    /// Add one event's waveform.
    pub fn merge(&mut self, waveform: &[f64]) -> Result<(), AccumulatorError> {
        if waveform.len() != self.sum.len() {
            return Err(AccumulatorError::LengthMismatch {
                expected: self.sum.len(),
                found: waveform.len(),
            });
        }

        for (acc, sample) in self.sum.iter_mut().zip(waveform) {
            *acc += sample;
        }
        self.histogram.push(waveform.iter().sum());
        Ok(())
    }

    /// Elementwise sum over all merged waveforms.
    pub fn sum_waveform(&self) -> &[f64] {
        &self.sum
    }

    /// `sum_waveform / n_events`.
    ///
    /// Derived from the final sum rather than accumulated, so it is exact
    /// with respect to the sum. All zeros when the run has no events.
    pub fn mean_waveform(&self) -> Vec<f64> {
        if self.n_events == 0 {
            return vec![0.0; self.sum.len()];
        }
        let n = self.n_events as f64;
        self.sum.iter().map(|s| s / n).collect()
    }

    /// Per-event totals, in arrival order.
    pub fn histogram(&self) -> &[f64] {
        &self.histogram
    }

    /// Number of waveforms merged so far.
    pub fn merged(&self) -> usize {
        self.histogram.len()
    }

    pub fn n_events(&self) -> u64 {
        self.n_events
    }

    pub fn n_bins(&self) -> usize {
        self.sum.len()
    }

    /// Whether every expected event has been merged.
    pub fn is_complete(&self) -> bool {
        self.histogram.len() as u64 == self.n_events
    }

    /// Mean of the per-event totals, if any event was merged.
    pub fn mean_total(&self) -> Option<f64> {
        if self.histogram.is_empty() {
            return None;
        }
        Some(self.histogram.iter().sum::<f64>() / self.histogram.len() as f64)
    }

    /// Compare with another accumulator up to `tolerance`, ignoring
    /// histogram order.
    pub fn approx_eq(&self, other: &Accumulator, tolerance: f64) -> bool {
        if self.n_events != other.n_events
            || self.sum.len() != other.sum.len()
            || self.histogram.len() != other.histogram.len()
        {
            return false;
        }

        let close = |a: &f64, b: &f64| (a - b).abs() <= tolerance * (1.0 + a.abs().max(b.abs()));

        if !self.sum.iter().zip(&other.sum).all(|(a, b)| close(a, b)) {
            return false;
        }

        let mut ours = self.histogram.clone();
        let mut theirs = other.histogram.clone();
        ours.sort_by(f64::total_cmp);
        theirs.sort_by(f64::total_cmp);
        ours.iter().zip(&theirs).all(|(a, b)| close(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_merge_sums_and_histograms() {
        let mut acc = Accumulator::new(3, 2);
        acc.merge(&[1.0, 2.0, 3.0]).unwrap();
        acc.merge(&[0.5, 0.5, -1.0]).unwrap();

        assert_eq!(acc.sum_waveform(), &[1.5, 2.5, 2.0]);
        assert_eq!(acc.mean_waveform(), vec![0.75, 1.25, 1.0]);
        assert_eq!(acc.histogram(), &[6.0, 0.0]);
        assert!(acc.is_complete());
        assert_eq!(acc.mean_total(), Some(3.0));
    }

    #[test]
    fn test_length_is_fixed() {
        let mut acc = Accumulator::new(4, 1);
        let err = acc.merge(&[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            AccumulatorError::LengthMismatch {
                expected: 4,
                found: 2
            }
        );
        assert_eq!(acc.n_bins(), 4);
        assert_eq!(acc.merged(), 0);
    }

    #[test]
    fn test_empty_run() {
        let acc = Accumulator::new(5, 0);
        assert!(acc.is_complete());
        assert_eq!(acc.mean_waveform(), vec![0.0; 5]);
        assert_eq!(acc.mean_total(), None);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let waveforms: Vec<Vec<f64>> = (0..40)
            .map(|_| (0..16).map(|_| rng.gen_range(-5.0..5.0)).collect())
            .collect();

        let mut reference = Accumulator::new(16, 40);
        for w in &waveforms {
            reference.merge(w).unwrap();
        }

        for _ in 0..20 {
            let mut shuffled = waveforms.clone();
            shuffled.shuffle(&mut rng);

            let mut acc = Accumulator::new(16, 40);
            for w in &shuffled {
                acc.merge(w).unwrap();
            }
            assert!(acc.approx_eq(&reference, 1e-12));

            let mean = acc.mean_waveform();
            for (m, s) in mean.iter().zip(acc.sum_waveform()) {
                assert_eq!(*m, s / 40.0);
            }
        }
    }

    #[test]
    fn test_approx_eq_detects_differences() {
        let mut a = Accumulator::new(2, 1);
        let mut b = Accumulator::new(2, 1);
        a.merge(&[1.0, 1.0]).unwrap();
        b.merge(&[1.0, 1.5]).unwrap();
        assert!(!a.approx_eq(&b, 1e-9));
        assert!(!a.approx_eq(&Accumulator::new(2, 2), 1e-9));
    }
}
