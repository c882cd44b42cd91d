use crate::app::case::{Outcome, Verdict};
use crate::app::context::{iteration_dirname, unique_dirname, ExecutionContext};
use crate::app::error::EngineError;
use crate::app::fixtures::FixtureTracker;
use crate::app::tally::Tally;
use crate::app::tree::{Leaf, NodeKind, SuiteNode};
use crate::epoch_seconds;
use crate::reporter::{sink, NodeType, ResultRecord, Status};
use crate::specification::policy::Repetition;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Result of running a node, or of one attempt at a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Pass,
    Fail,
    /// The exit-on-error cascade fired. Counts as a failure for the
    /// caller, who decides whether to cascade further.
    Abort,
}

impl Attempt {
    fn from_passed(passed: bool) -> Self {
        if passed {
            Attempt::Pass
        } else {
            Attempt::Fail
        }
    }
}

struct Summary {
    passed: bool,
    aborted: bool,
    attempts: u32,
}

/// Depth-first interpreter of a suite tree.
///
/// Every node gets its own result/tmp directory pair below the one of its
/// parent. The engine keeps the path of the node currently running as a
/// cursor relative to both roots, and restores the parent's cursor when the
/// node is done, so the same node can be entered again later.
pub struct Engine {
    result_root: PathBuf,
    tmp_root: PathBuf,
    cursor: PathBuf,
    tally: Tally,
    fixtures: FixtureTracker,
    failfast: bool,
}

impl Engine {
    pub fn new(result_root: PathBuf, tmp_root: PathBuf) -> Self {
        Self {
            result_root,
            tmp_root,
            cursor: PathBuf::new(),
            tally: Tally::default(),
            fixtures: FixtureTracker::default(),
            failfast: false,
        }
    }

    pub fn failfast(mut self, failfast: bool) -> Self {
        self.failfast = failfast;
        self
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn into_tally(self) -> Tally {
        self.tally
    }

    /// Runs `node` as the top of a tree.
    pub fn run(&mut self, node: &SuiteNode) -> Result<Attempt, EngineError> {
        let result = self.run_node(node);
        self.fixtures.finish();
        result
    }

    fn run_node(&mut self, node: &SuiteNode) -> Result<Attempt, EngineError> {
        let parent = self.cursor.clone();
        let relative = unique_dirname(&self.result_root, &parent, &node.dirname);
        debug!("Allocated {} for {}", relative.display(), node.display_name());
        let base = ExecutionContext::new(
            self.result_root.join(&relative),
            self.tmp_root.join(&relative),
        );
        let start_time = epoch_seconds!();

        let summary = self.iterate(node, &relative, &base);
        self.cursor = parent;
        let summary = summary?;

        if summary.aborted {
            warn!("Testsuite {} aborted", node.display_name());
        }
        self.write_summary(node, &base, &summary, start_time);
        Ok(if summary.aborted {
            Attempt::Abort
        } else {
            Attempt::from_passed(summary.passed)
        })
    }

    fn iterate(
        &mut self,
        node: &SuiteNode,
        relative: &Path,
        base: &ExecutionContext,
    ) -> Result<Summary, EngineError> {
        let repetition = node.policy.repetition();
        let bound = repetition.bound();
        let loop_start = self.tally.snapshot();
        let mut summary = Summary {
            passed: true,
            aborted: false,
            attempts: 0,
        };

        for i in 1..=bound {
            let context = if bound > 1 {
                self.cursor = relative.join(iteration_dirname(i));
                base.iteration(i)
            } else {
                self.cursor = relative.to_path_buf();
                base.clone()
            };
            context.create()?;
            trace!("Loop number {} of {}", i, node.display_name());

            summary.attempts += 1;
            let attempt_start = self.tally.snapshot();
            let iteration_start = epoch_seconds!();
            let attempt = match &node.kind {
                NodeKind::Suite { children } => self.suite_run(node, children)?,
                NodeKind::Leaf(leaf) => self.leaf_run(node, leaf, &context),
            };
            let passed = attempt == Attempt::Pass;

            if bound > 1 {
                let iteration = ResultRecord::iteration(iteration_dirname(i), passed, iteration_start);
                sink::update(context.result_dir(), |record| record.absorb_iteration(iteration));
            }
            if !passed {
                summary.passed = false;
            }

            if attempt == Attempt::Abort && (!repetition.is_retry() || i == bound) {
                summary.aborted = true;
                break;
            }
            if self.tally.should_stop {
                debug!("Stopping {} after loop number {}", node.display_name(), i);
                break;
            }

            if repetition.is_retry() {
                if passed {
                    self.tally.discard_failed_attempts(&loop_start, &attempt_start);
                    summary.passed = true;
                    break;
                } else if i < bound {
                    self.tally.retries += 1;
                    info!("************** RETRYING {} ***************", node.display_name());
                } else {
                    warn!("*********** MAX RETRIES REACHED {} *******", node.display_name());
                }
            }
        }
        Ok(summary)
    }

    /// One attempt at the children of a suite.
    fn suite_run(&mut self, node: &SuiteNode, children: &[SuiteNode]) -> Result<Attempt, EngineError> {
        let mut error_exit = false;
        let mut error_free = true;

        if node.policy.header {
            log_header(node);
        }

        for child in children {
            if self.tally.should_stop {
                break;
            }
            if error_exit && !child.policy.teardown {
                debug!("Skipping {} after error exit", child.display_name());
                continue;
            }
            if node.policy.header && !child.policy.header {
                log_header(child);
            }

            let faults_before = self.tally.faults();
            let attempt = self.run_node(child)?;
            let failed = if child.is_suite() {
                attempt != Attempt::Pass
            } else {
                self.tally.faults() != faults_before
            };

            if failed {
                error_free = false;
                if node.policy.exit_on_error || node.policy.setup || child.policy.setup {
                    error_exit = true;
                }
            }
        }

        Ok(if error_exit {
            Attempt::Abort
        } else {
            Attempt::from_passed(error_free)
        })
    }

    /// One execution of a leaf in `context`.
    fn leaf_run(&mut self, node: &SuiteNode, leaf: &Leaf, context: &ExecutionContext) -> Attempt {
        let name = node.policy.name.clone().unwrap_or_else(|| leaf.name.clone());
        let description = leaf.case.description();
        let start_time = epoch_seconds!();
        let now = Instant::now();
        self.tally.runs += 1;

        let (outcome, message, output) = match self.fixtures.enter(leaf.class.as_ref()) {
            Err(e) => (Outcome::Error, Some(e), None),
            Ok(()) => {
                let report = leaf.case.execute(context);
                let outcome = Outcome::judge(&report.verdict, leaf.expect_failure);
                let message = match report.verdict {
                    Verdict::Pass => None,
                    Verdict::Fail(m) | Verdict::Skip(m) | Verdict::Error(m) => Some(m),
                };
                (outcome, message, report.output)
            }
        };
        let elapsed = now.elapsed().as_secs_f64();
        info!(
            "{} {} ... {} [{:.3}s]",
            name,
            description,
            outcome.status(),
            elapsed
        );

        if outcome.is_failure() {
            if let Some(message) = &message {
                sink::write_error(context.result_dir(), message);
            }
            if self.failfast {
                self.tally.should_stop = true;
            }
        }
        self.tally.record(&name, outcome, message);

        sink::append(
            context.result_dir(),
            &ResultRecord {
                kind: Some(NodeType::Teststep),
                name: Some(name),
                result: Some(outcome.status()),
                start_time: Some(start_time),
                time: Some(elapsed),
                description: Some(description),
                params: leaf.case.params(),
                inputparams: leaf.input_params.clone(),
                output,
                ..ResultRecord::default()
            },
        );
        Attempt::from_passed(!outcome.is_failure())
    }

    fn write_summary(&self, node: &SuiteNode, base: &ExecutionContext, summary: &Summary, start_time: f64) {
        let policy = &node.policy;
        sink::update(base.result_dir(), |record| {
            if record.start_time.is_none() {
                record.start_time = Some(start_time);
            }
            record.kind = policy
                .node_type()
                .or(record.kind)
                .or(Some(NodeType::Suite));
            if record.description.is_none() {
                record.description = node.description.clone();
            }
            record.name = Some(node.display_name().to_owned());
            if let Some(flag) = &policy.flag {
                record.flag = Some(flag.clone());
            }
            if record.result.is_none() {
                record.result = Some(Status::from_passed(summary.passed && !summary.aborted));
            }
            if let Repetition::Count(count) = policy.repetition() {
                record.count = Some(count);
            }
            if let Repetition::Retry(retry) = policy.repetition() {
                record.retry_max = Some(retry);
                record.retries = Some(summary.attempts);
            }
        });
    }
}

fn log_header(node: &SuiteNode) {
    info!("*********************************************************");
    info!("** {}", node.display_name());
    info!("*********************************************************");
}
