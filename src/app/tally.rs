use crate::app::case::Outcome;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub test: String,
    pub message: String,
}

/// Run-wide counters. Failed attempts of a retry loop that eventually
/// passes are removed again, so only the authoritative attempt counts.
#[derive(Debug, Default)]
pub struct Tally {
    pub runs: usize,
    pub failures: Vec<Fault>,
    pub errors: Vec<Fault>,
    pub skipped: Vec<Fault>,
    pub expected_failures: Vec<Fault>,
    pub unexpected_successes: Vec<Fault>,
    /// Attempts repeated by retry loops.
    pub retries: usize,
    /// Set by fail-fast once a leaf fails.
    pub should_stop: bool,
}

/// Counter positions at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    runs: usize,
    failures: usize,
    errors: usize,
    skipped: usize,
    expected_failures: usize,
    unexpected_successes: usize,
}

impl Tally {
    pub fn record(&mut self, test: &str, outcome: Outcome, message: Option<String>) {
        let fault = Fault {
            test: test.to_owned(),
            message: message.unwrap_or_default(),
        };
        match outcome {
            Outcome::Pass => {}
            Outcome::Fail => self.failures.push(fault),
            Outcome::Error => self.errors.push(fault),
            Outcome::Skip => self.skipped.push(fault),
            Outcome::ExpectedFailure => self.expected_failures.push(fault),
            Outcome::UnexpectedSuccess => self.unexpected_successes.push(fault),
        }
    }

    /// Everything that makes a run unsuccessful.
    pub fn faults(&self) -> usize {
        self.failures.len() + self.errors.len() + self.unexpected_successes.len()
    }

    pub fn was_successful(&self) -> bool {
        self.faults() == 0
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            runs: self.runs,
            failures: self.failures.len(),
            errors: self.errors.len(),
            skipped: self.skipped.len(),
            expected_failures: self.expected_failures.len(),
            unexpected_successes: self.unexpected_successes.len(),
        }
    }

    /// Drops what was counted between `loop_start` and `attempt_start`,
    /// keeping the counts of the attempt that started at `attempt_start`.
    pub fn discard_failed_attempts(&mut self, loop_start: &Snapshot, attempt_start: &Snapshot) {
        self.failures.drain(loop_start.failures..attempt_start.failures);
        self.errors.drain(loop_start.errors..attempt_start.errors);
        self.skipped.drain(loop_start.skipped..attempt_start.skipped);
        self.expected_failures
            .drain(loop_start.expected_failures..attempt_start.expected_failures);
        self.unexpected_successes
            .drain(loop_start.unexpected_successes..attempt_start.unexpected_successes);
        self.runs = loop_start.runs + (self.runs - attempt_start.runs);
    }

    pub fn passed(&self) -> usize {
        self.successes() + self.expected_failures.len()
    }

    pub fn flunked(&self) -> usize {
        self.failures.len() + self.unexpected_successes.len()
    }

    fn successes(&self) -> usize {
        self.runs
            .saturating_sub(self.faults())
            .saturating_sub(self.skipped.len())
            .saturating_sub(self.expected_failures.len())
    }

    pub fn log_summary(&self, elapsed: Duration) {
        for fault in &self.errors {
            error!("ERROR: {}\n{}", fault.test, fault.message.trim_end());
        }
        for fault in &self.failures {
            error!("FAIL: {}\n{}", fault.test, fault.message.trim_end());
        }
        info!("Ran for {:.3} seconds", elapsed.as_secs_f64());
        info!("Test cases:  {}", self.runs);
        info!(
            "Passed:      {}   successes: {}   failures: {}",
            self.passed(),
            self.successes(),
            self.expected_failures.len()
        );
        info!(
            "Flunked:     {}   failures: {}   successes: {}",
            self.flunked(),
            self.failures.len(),
            self.unexpected_successes.len()
        );
        info!("Errors:      {}", self.errors.len());
        info!("Skipped:     {}", self.skipped.len());
        if self.retries > 0 {
            info!("Retries:     {}", self.retries);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run(tally: &mut Tally, outcome: Outcome) {
        tally.runs += 1;
        tally.record("case", outcome, None);
    }

    #[test]
    fn test_discard_keeps_only_last_attempt() {
        let mut tally = Tally::default();
        run(&mut tally, Outcome::Fail);
        let loop_start = tally.snapshot();

        run(&mut tally, Outcome::Fail);
        run(&mut tally, Outcome::Error);
        let attempt_start = tally.snapshot();
        run(&mut tally, Outcome::Pass);
        run(&mut tally, Outcome::Skip);

        tally.discard_failed_attempts(&loop_start, &attempt_start);
        assert_eq!(tally.runs, 3);
        assert_eq!(tally.failures.len(), 1);
        assert!(tally.errors.is_empty());
        assert_eq!(tally.skipped.len(), 1);
    }

    #[test]
    fn test_summary_counts() {
        let mut tally = Tally::default();
        run(&mut tally, Outcome::Pass);
        run(&mut tally, Outcome::ExpectedFailure);
        run(&mut tally, Outcome::UnexpectedSuccess);
        run(&mut tally, Outcome::Skip);

        assert_eq!(tally.passed(), 2);
        assert_eq!(tally.flunked(), 1);
        assert!(!tally.was_successful());
    }
}
