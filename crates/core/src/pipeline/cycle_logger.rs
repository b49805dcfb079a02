use std::collections::HashMap;
use std::time::Instant;

/// Observer for detection-loop events.
///
/// Keeps the loop free of any particular output mechanism; the shell
/// logs through the `log` crate while tests discard everything.
pub trait CycleLogger: Send {
    /// Called by `start()` before the first cycle of a session.
    fn session_started(&mut self) {}

    /// Called once per completed cycle, successful or not.
    fn cycle(&mut self, index: u64);

    /// Marks the cycle about to be reported through `cycle` as failed.
    fn failure(&mut self);

    /// Record how long a named stage took in one cycle.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. face count).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullCycleLogger;

impl CycleLogger for NullCycleLogger {
    fn cycle(&mut self, _index: u64) {}
    fn failure(&mut self) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Count, sum and peak of one series, in constant space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Aggregate {
    count: u64,
    sum: f64,
    max: f64,
}

impl Aggregate {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 { value } else { self.max.max(value) };
        self.count += 1;
        self.sum += value;
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Aggregates per-stage timings and metrics for the current session;
/// logs a progress line every `throttle_cycles` cycles and a summary
/// when the session stops.
///
/// Everything is reset by `session_started`, so a summary never mixes
/// sessions and memory stays flat however long the loop runs.
pub struct StatsCycleLogger {
    throttle_cycles: u64,
    timings: HashMap<String, Aggregate>,
    metrics: HashMap<String, Aggregate>,
    session_start: Instant,
    cycles: u64,
    failures: u64,
    failure_streak: u64,
    longest_failure_streak: u64,
    cycle_failed: bool,
}

impl StatsCycleLogger {
    pub fn new(throttle_cycles: u64) -> Self {
        Self {
            throttle_cycles: throttle_cycles.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            session_start: Instant::now(),
            cycles: 0,
            failures: 0,
            failure_streak: 0,
            longest_failure_streak: 0,
            cycle_failed: false,
        }
    }

    /// Returns the formatted summary, or `None` if no cycle ran.
    pub fn summary_string(&self) -> Option<String> {
        if self.cycles == 0 && self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.session_start.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Detection summary ({} cycles, {elapsed_s:.1}s):",
            self.cycles
        )];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, agg) in stages {
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  max {:6.1}ms",
                agg.average(),
                agg.max
            ));
        }

        let mut names: Vec<_> = self.metrics.iter().collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        for (name, agg) in names {
            lines.push(format!("  {name}: avg {:.1}", agg.average()));
        }

        if self.failures > 0 {
            lines.push(format!(
                "  Failed cycles: {} (longest streak {})",
                self.failures, self.longest_failure_streak
            ));
        }

        if self.cycles > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Rate: {:.1} cycles/s",
                self.cycles as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StatsCycleLogger {
    fn default() -> Self {
        Self::new(50)
    }
}

impl CycleLogger for StatsCycleLogger {
    fn session_started(&mut self) {
        *self = Self::new(self.throttle_cycles);
    }

    fn cycle(&mut self, index: u64) {
        self.cycles += 1;
        if !self.cycle_failed {
            self.failure_streak = 0;
        }
        self.cycle_failed = false;

        if index % self.throttle_cycles == 0 {
            let detect = self
                .timings
                .get("detect")
                .map(Aggregate::average)
                .unwrap_or(0.0);
            log::info!("Cycle {index}: avg detect {detect:.1}ms");
        }
    }

    fn failure(&mut self) {
        self.cycle_failed = true;
        self.failures += 1;
        self.failure_streak += 1;
        self.longest_failure_streak = self.longest_failure_streak.max(self.failure_streak);
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullCycleLogger;
        logger.session_started();
        logger.cycle(1);
        logger.failure();
        logger.timing("detect", 5.0);
        logger.metric("faces", 1.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_keeps_running_aggregate() {
        let mut logger = StatsCycleLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("render", 1.5);

        let detect = logger.timings["detect"];
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.average(), 25.0);
        assert_relative_eq!(detect.max, 30.0);
        assert_eq!(logger.timings["render"].count, 1);
        assert!(!logger.timings.contains_key("missing"));
    }

    #[test]
    fn test_long_session_stays_constant_size() {
        let mut logger = StatsCycleLogger::new(1000);
        for i in 1..=10_000 {
            logger.timing("detect", (i % 7) as f64);
            logger.timing("render", 1.0);
            logger.metric("faces", 1.0);
            logger.cycle(i);
        }

        assert_eq!(logger.timings.len(), 2);
        assert_eq!(logger.metrics.len(), 1);
        assert_eq!(logger.timings["detect"].count, 10_000);
        assert_relative_eq!(logger.timings["detect"].max, 6.0);
    }

    #[test]
    fn test_metric_average_in_summary() {
        let mut logger = StatsCycleLogger::new(10);
        logger.cycle(1);
        logger.metric("faces", 1.0);
        logger.metric("faces", 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Detection summary (1 cycles"));
        assert!(summary.contains("faces: avg 1.5"));
    }

    #[test]
    fn test_summary_lists_stages() {
        let mut logger = StatsCycleLogger::new(10);
        logger.cycle(1);
        logger.timing("detect", 40.0);
        logger.timing("render", 2.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("detect"));
        assert!(summary.contains("render"));
        assert!(summary.contains("max   40.0ms"));
    }

    #[test]
    fn test_new_session_resets_summary() {
        let mut logger = StatsCycleLogger::new(10);
        logger.session_started();
        for i in 1..=10_000 {
            logger.timing("detect", 10.0);
            logger.cycle(i);
        }
        logger.summary();

        logger.session_started();
        logger.timing("detect", 4.0);
        logger.cycle(1);

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Detection summary (1 cycles"));
        assert_eq!(logger.timings["detect"].count, 1);
        assert_relative_eq!(logger.timings["detect"].max, 4.0);
        assert_eq!(logger.throttle_cycles, 10);
    }

    #[test]
    fn test_failures_report_longest_streak() {
        let mut logger = StatsCycleLogger::new(10);
        let outcomes = [false, true, true, true, false, true, false];
        for (i, failed) in outcomes.into_iter().enumerate() {
            if failed {
                logger.failure();
            }
            logger.cycle(i as u64 + 1);
        }

        assert_eq!(logger.failures, 4);
        assert_eq!(logger.longest_failure_streak, 3);
        assert_eq!(logger.failure_streak, 0);
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Failed cycles: 4 (longest streak 3)"));
    }

    #[test]
    fn test_summary_omits_failures_when_none() {
        let mut logger = StatsCycleLogger::new(10);
        logger.cycle(1);

        assert!(!logger.summary_string().unwrap().contains("Failed"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StatsCycleLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_default_throttle() {
        assert_eq!(StatsCycleLogger::default().throttle_cycles, 50);
    }

    #[test]
    fn test_aggregate_of_empty_is_zero() {
        assert_relative_eq!(Aggregate::default().average(), 0.0);
        let mut agg = Aggregate::default();
        agg.record(-2.0);
        agg.record(-4.0);
        assert_relative_eq!(agg.average(), -3.0);
        assert_relative_eq!(agg.max, -2.0);
    }
}
