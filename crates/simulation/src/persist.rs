//! Writing the final aggregates.

use crate::{RunError, RunReport};
use arbuckle_output::PersistenceSink;
use arbuckle_types::OutputConfig;
use std::path::PathBuf;
use tracing::{info, warn};

/// Write the configured outputs of a finished run.
///
/// The timed signal is the accumulated sum waveform; the charge histogram
/// is the per-event totals. Outputs without a name are skipped. A run with
/// no events still writes its named outputs: a zero sum and an empty
/// histogram. Returns the paths written, which are also recorded on the
/// report.
pub fn persist(
    report: &mut RunReport,
    outputs: &OutputConfig,
    sink: &mut dyn PersistenceSink,
) -> Result<Vec<PathBuf>, RunError> {
    if !report.accumulator.is_complete() {
        warn!(
            merged = report.accumulator.merged(),
            expected = report.n_events(),
            "Persisting an incomplete run"
        );
    }
    if report.n_events() == 0 {
        info!("No events simulated; writing empty aggregates");
    }

    let mut written = Vec::new();
    if let Some(name) = &outputs.timed_signal {
        written.push(sink.write_array(name, report.accumulator.sum_waveform())?);
    }
    if let Some(name) = &outputs.charge_histogram {
        written.push(sink.write_array(name, report.accumulator.histogram())?);
    }

    report.written.extend(written.iter().cloned());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbuckle_dispatch::Accumulator;
    use arbuckle_output::MemorySink;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn report(n_events: u64) -> RunReport {
        let mut accumulator = Accumulator::new(2, n_events);
        for i in 0..n_events {
            accumulator.merge(&[i as f64, 1.0]).unwrap();
        }
        RunReport {
            accumulator,
            strategy: "direct",
            participants: 1,
            completions: BTreeMap::new(),
            final_recipient: None,
            elapsed: Duration::ZERO,
            written: vec![],
        }
    }

    fn outputs(signal: Option<&str>, hist: Option<&str>) -> OutputConfig {
        OutputConfig {
            timed_signal: signal.map(str::to_string),
            charge_histogram: hist.map(str::to_string),
        }
    }

    #[test]
    fn test_writes_sum_and_histogram() {
        let mut report = report(3);
        let mut sink = MemorySink::new();
        let written = persist(&mut report, &outputs(Some("sig"), Some("hist")), &mut sink).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(report.written, written);
        assert_eq!(sink.get("sig"), Some(&[3.0, 3.0][..]));
        assert_eq!(sink.get("hist"), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_unnamed_outputs_skipped() {
        let mut report = report(2);
        let mut sink = MemorySink::new();
        persist(&mut report, &outputs(None, Some("hist")), &mut sink).unwrap();
        assert_eq!(sink.names().collect::<Vec<_>>(), vec!["hist.npy"]);
    }

    #[traced_test]
    #[test]
    fn test_incomplete_run_warns() {
        let mut report = report(2);
        report.accumulator = Accumulator::new(2, 3);
        report.accumulator.merge(&[1.0, 1.0]).unwrap();

        let mut sink = MemorySink::new();
        persist(&mut report, &outputs(None, Some("hist")), &mut sink).unwrap();
        assert_eq!(sink.get("hist"), Some(&[2.0][..]));
        assert!(logs_contain("Persisting an incomplete run"));
    }

    #[test]
    fn test_empty_run_writes_empty_aggregates() {
        let mut report = report(0);
        let mut sink = MemorySink::new();
        let written = persist(&mut report, &outputs(Some("sig"), Some("hist")), &mut sink).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(sink.get("sig"), Some(&[0.0, 0.0][..]));
        assert_eq!(sink.get("hist"), Some(&[][..]));
    }

    #[test]
    fn test_empty_run_without_names_writes_nothing() {
        let mut report = report(0);
        let mut sink = MemorySink::new();
        let written = persist(&mut report, &OutputConfig::default(), &mut sink).unwrap();
        assert!(written.is_empty());
        assert!(sink.is_empty());
    }
}
