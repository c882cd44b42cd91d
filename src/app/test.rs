use crate::app::case::{CaseReport, ClassFixture, TestCase, Verdict};
use crate::app::context::ExecutionContext;
use crate::app::executor::{Attempt, Engine};
use crate::app::tally::Tally;
use crate::app::{App, AppError};
use crate::configuration::settings::Settings;
use crate::reporter::{sink, NodeType, Status};
use crate::specification::error::LoadError;
use crate::specification::loader::Loader;
use crate::specification::registry::{CaseType, Method, Registry, UnitArgs};
use serde_yaml::{Mapping, Value};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Fails a fixed number of times, then reports `verdict` forever.
struct Scripted {
    failures_left: Cell<u32>,
    verdict: Verdict,
}

impl TestCase for Scripted {
    fn description(&self) -> String {
        "scripted".to_owned()
    }

    fn execute(&self, context: &ExecutionContext) -> CaseReport {
        assert!(context.result_dir().is_dir());
        assert!(context.tmp_dir().is_dir());
        let left = self.failures_left.get();
        if left > 0 {
            self.failures_left.set(left - 1);
            return CaseReport::fail(format!("{} failures to go", left));
        }
        self.verdict.clone().into()
    }
}

fn scripted(failures: u32, verdict: Verdict) -> Box<dyn TestCase> {
    Box::new(Scripted {
        failures_left: Cell::new(failures),
        verdict,
    })
}

struct Broken;

impl ClassFixture for Broken {
    fn set_up_class(&self) -> Result<(), String> {
        Err("no device attached".to_owned())
    }

    fn tear_down_class(&self) -> Result<(), String> {
        Ok(())
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_case_type(
            "pass",
            CaseType::new("pass", |_: &str, _: &UnitArgs| Ok(scripted(0, Verdict::Pass))),
        )
        .register_case_type(
            "fail",
            CaseType::new("fail", |_: &str, _: &UnitArgs| {
                Ok(scripted(0, Verdict::Fail("expected to fail".to_owned())))
            }),
        )
        .register_case_type(
            "error",
            CaseType::new("error", |_: &str, _: &UnitArgs| {
                Ok(scripted(0, Verdict::Error("broken".to_owned())))
            }),
        )
        .register_case_type(
            "skip",
            CaseType::new("skip", |_: &str, _: &UnitArgs| {
                Ok(scripted(0, Verdict::Skip("not today".to_owned())))
            }),
        )
        .register_case_type(
            "flaky",
            CaseType::new("flaky", |_: &str, args: &UnitArgs| {
                let fails = args.param("fails")?.unwrap_or(2);
                Ok(scripted(fails, Verdict::Pass))
            }),
        )
        .register_case_type(
            "unplugged",
            CaseType::new("unplugged", |_: &str, _: &UnitArgs| Ok(scripted(0, Verdict::Pass)))
                .method(Method::new("first"))
                .method(Method::new("second"))
                .fixture(Rc::new(Broken)),
        );
    registry
}

struct Run {
    dir: TempDir,
    attempt: Attempt,
    tally: Tally,
}

impl Run {
    fn result(&self, relative: &str) -> PathBuf {
        self.dir.path().join("result").join(relative)
    }

    fn status(&self, relative: &str) -> Option<Status> {
        sink::load(&self.result(relative)).and_then(|record| record.result)
    }
}

fn setup(files: &[(&str, &str)]) -> (TempDir, Settings) {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        fs::write(dir.path().join(name), text).unwrap();
    }
    let settings = Settings {
        path: vec![dir.path().to_string_lossy().into_owned()],
        result_root: dir.path().join("result"),
        tmp_root: dir.path().join("tmp"),
        ..Settings::default()
    };
    (dir, settings)
}

fn run_with(files: &[(&str, &str)], name: &str, failfast: bool) -> Run {
    let (dir, settings) = setup(files);
    let registry = registry();
    let node = Loader::new(&settings, &registry)
        .load(name, Mapping::new())
        .unwrap();
    let mut engine = Engine::new(settings.result_root.clone(), settings.tmp_root.clone()).failfast(failfast);
    let attempt = engine.run(&node).unwrap();
    Run {
        dir,
        attempt,
        tally: engine.into_tally(),
    }
}

fn run(suite: &str) -> Run {
    run_with(&[("suite.yaml", suite)], "suite", false)
}

fn exists(run: &Run, relative: &str) -> bool {
    run.result(relative).is_dir()
}

#[test]
fn test_passing_suite_round_trip() {
    let run = run("description: All good\ntests:\n  - pass:\n  - skip:\n");
    assert_eq!(run.attempt, Attempt::Pass);
    assert!(run.tally.was_successful());

    let record = sink::load(&run.result("suite")).unwrap();
    assert_eq!(record.kind, Some(NodeType::Suite));
    assert_eq!(record.result, Some(Status::Pass));
    assert_eq!(record.description.as_deref(), Some("All good"));
    assert!(record.start_time.is_some());

    let leaf = sink::load(&run.result("suite/pass")).unwrap();
    assert_eq!(leaf.kind, Some(NodeType::Teststep));
    assert_eq!(leaf.name.as_deref(), Some("pass"));
    assert_eq!(leaf.flag, None);
    assert!(leaf.time.is_some());
    assert_eq!(run.status("suite/skip"), Some(Status::Skip));
}

#[test]
fn test_count_creates_run_directories() {
    let run = run("tests:\n  - pass: { count: 3 }\n");
    for i in 1..=3 {
        let record = sink::load(&run.result(&format!("suite/pass/run-{}", i))).unwrap();
        assert_eq!(record.kind, Some(NodeType::CountOrRetry));
        assert_eq!(record.result, Some(Status::Pass));
    }
    assert!(!exists(&run, "suite/pass/run-4"));
    assert!(run.dir.path().join("tmp/suite/pass/run-2").is_dir());

    let summary = sink::load(&run.result("suite/pass")).unwrap();
    assert_eq!(summary.count, Some(3));
    assert_eq!(summary.result, Some(Status::Pass));
    assert_eq!(run.tally.runs, 3);
}

#[test]
fn test_retry_keeps_only_passing_attempt() {
    let run = run("tests:\n  - flaky: { retry: 4, params: { fails: 2 } }\n");
    assert_eq!(run.attempt, Attempt::Pass);
    assert_eq!(run.tally.runs, 1);
    assert!(run.tally.failures.is_empty());
    assert_eq!(run.tally.retries, 2);

    assert_eq!(run.status("suite/flaky/run-1"), Some(Status::Fail));
    assert_eq!(run.status("suite/flaky/run-3"), Some(Status::Pass));
    assert!(!exists(&run, "suite/flaky/run-4"));

    let summary = sink::load(&run.result("suite/flaky")).unwrap();
    assert_eq!(summary.retry_max, Some(4));
    assert_eq!(summary.retries, Some(3));
    assert_eq!(summary.result, Some(Status::Pass));
    assert_eq!(run.status("suite"), Some(Status::Pass));
}

#[test]
fn test_exhausted_retries_fail() {
    let run = run("tests:\n  - fail: { retry: 3 }\n");
    assert_eq!(run.attempt, Attempt::Fail);
    assert_eq!(run.tally.failures.len(), 3);
    assert_eq!(run.tally.retries, 2);
    assert_eq!(run.status("suite/fail"), Some(Status::Fail));
    assert_eq!(run.status("suite"), Some(Status::Fail));
}

#[test]
fn test_retried_suite_rolls_back_nested_counts() {
    let run = run_with(
        &[
            ("suite.yaml", "tests:\n  - inner: { retry: 3 }\n"),
            ("inner.yaml", "tests:\n  - pass:\n  - flaky: { params: { fails: 1 } }\n"),
        ],
        "suite",
        false,
    );
    assert_eq!(run.attempt, Attempt::Pass);
    assert_eq!(run.tally.runs, 2);
    assert!(run.tally.was_successful());
    assert_eq!(run.status("suite/inner/run-1"), Some(Status::Fail));
    assert_eq!(run.status("suite/inner/run-2"), Some(Status::Pass));
    assert_eq!(run.status("suite/inner/run-2/flaky"), Some(Status::Pass));
}

#[test]
fn test_same_id_gets_numbered_directories() {
    let run = run("tests:\n  - pass: { id: sensor }\n  - pass: { id: sensor }\n  - pass: { id: sensor }\n");
    assert!(exists(&run, "suite/sensor"));
    assert!(exists(&run, "suite/sensor-1"));
    assert!(exists(&run, "suite/sensor-2"));
    assert!(!exists(&run, "suite/sensor-3"));
}

#[test]
fn test_exit_on_error_skips_to_teardown() {
    let run = run(
        "testargs:\n  - exit-on-error: true\ntests:\n  - pass: { id: a }\n  - fail: { id: b }\n  - pass: { id: c }\nteardown:\n  - pass: { id: d }\n",
    );
    assert_eq!(run.attempt, Attempt::Abort);
    assert!(exists(&run, "suite/a"));
    assert_eq!(run.status("suite/b"), Some(Status::Fail));
    assert!(!exists(&run, "suite/c"));
    assert_eq!(run.status("suite/d"), Some(Status::Pass));
    assert_eq!(
        sink::load(&run.result("suite/d")).unwrap().kind,
        Some(NodeType::Teardown)
    );
    assert_eq!(run.status("suite"), Some(Status::Fail));
}

#[test]
fn test_leaf_descriptor_carries_directives() {
    let run = run(
        "setup:\n  - pass: { id: power }\ntests:\n  - pass: { flag: critical, type: suite }\n  - skip: { name: optional }\n",
    );
    let setup = sink::load(&run.result("suite/power")).unwrap();
    assert_eq!(setup.kind, Some(NodeType::Setup));
    assert_eq!(setup.name.as_deref(), Some("power"));

    let flagged = sink::load(&run.result("suite/pass")).unwrap();
    assert_eq!(flagged.kind, Some(NodeType::Suite));
    assert_eq!(flagged.flag, Some(Value::from("critical")));
    assert_eq!(flagged.result, Some(Status::Pass));

    let named = sink::load(&run.result("suite/skip")).unwrap();
    assert_eq!(named.kind, Some(NodeType::Teststep));
    assert_eq!(named.name.as_deref(), Some("optional"));
    assert_eq!(named.result, Some(Status::Skip));
}

#[test]
fn test_suite_descriptor_carries_flag() {
    let run = run_with(
        &[
            ("suite.yaml", "tests:\n  - inner: { flag: [nightly, lab], name: Inner }\n"),
            ("inner.yaml", "tests:\n  - pass:\n"),
        ],
        "suite",
        false,
    );
    let inner = sink::load(&run.result("suite/inner")).unwrap();
    assert_eq!(inner.kind, Some(NodeType::Suite));
    assert_eq!(inner.name.as_deref(), Some("Inner"));
    assert_eq!(
        inner.flag,
        Some(Value::Sequence(vec!["nightly".into(), "lab".into()]))
    );
    let leaf = sink::load(&run.result("suite/inner/pass")).unwrap();
    assert_eq!(leaf.flag, None);
}

#[test]
fn test_failing_setup_cascades() {
    let run = run("setup:\n  - fail:\ntests:\n  - pass: { id: c }\nteardown:\n  - pass: { id: d }\n");
    assert_eq!(run.attempt, Attempt::Abort);
    assert!(!exists(&run, "suite/c"));
    assert!(exists(&run, "suite/d"));
}

#[test]
fn test_abort_stops_at_suite_boundary() {
    let run = run_with(
        &[
            ("suite.yaml", "tests:\n  - inner:\n  - pass: { id: after }\n"),
            ("inner.yaml", "setup:\n  - fail:\ntests:\n  - pass:\n"),
        ],
        "suite",
        false,
    );
    assert_eq!(run.attempt, Attempt::Fail);
    assert_eq!(run.status("suite/inner"), Some(Status::Fail));
    assert_eq!(run.status("suite/after"), Some(Status::Pass));
}

#[test]
fn test_setup_suite_failure_cascades_upwards() {
    let run = run_with(
        &[
            ("suite.yaml", "setup:\n  - inner:\ntests:\n  - pass: { id: main }\n"),
            ("inner.yaml", "tests:\n  - fail:\n  - pass:\n"),
        ],
        "suite",
        false,
    );
    assert_eq!(run.attempt, Attempt::Abort);
    assert_eq!(
        sink::load(&run.result("suite/inner")).unwrap().kind,
        Some(NodeType::Setup)
    );
    assert!(!exists(&run, "suite/inner/pass"));
    assert!(!exists(&run, "suite/main"));
}

#[test]
fn test_retry_gives_aborted_suite_another_chance() {
    let run = run_with(
        &[
            ("suite.yaml", "tests:\n  - inner: { retry: 2 }\n"),
            ("inner.yaml", "setup:\n  - flaky: { params: { fails: 1 } }\ntests:\n  - pass:\n"),
        ],
        "suite",
        false,
    );
    assert_eq!(run.attempt, Attempt::Pass);
    assert!(!exists(&run, "suite/inner/run-1/pass"));
    assert!(exists(&run, "suite/inner/run-2/pass"));
    assert_eq!(run.tally.retries, 1);
}

#[test]
fn test_expected_failure_inverts_outcome() {
    let run = run("tests:\n  - fail: { expect: true }\n  - pass: { expected_failure: true }\n");
    assert_eq!(run.status("suite/fail"), Some(Status::Pass));
    assert_eq!(run.status("suite/pass"), Some(Status::Fail));
    assert_eq!(run.tally.expected_failures.len(), 1);
    assert_eq!(run.tally.unexpected_successes.len(), 1);
    assert_eq!(run.attempt, Attempt::Fail);
}

#[test]
fn test_error_leaves_message_beside_record() {
    let run = run("tests:\n  - error:\n");
    assert_eq!(run.status("suite/error"), Some(Status::Error));
    let message = fs::read_to_string(run.result("suite/error/err")).unwrap();
    assert_eq!(message.trim(), "broken");
    assert_eq!(run.tally.errors.len(), 1);
}

#[test]
fn test_failfast_stops_scheduling() {
    let run = run_with(
        &[("suite.yaml", "tests:\n  - fail:\n  - pass:\n")],
        "suite",
        true,
    );
    assert!(run.tally.should_stop);
    assert!(!exists(&run, "suite/pass"));
}

#[test]
fn test_failfast_ends_count_loop() {
    let run = run_with(
        &[("suite.yaml", "tests:\n  - fail: { count: 4 }\n  - pass:\n")],
        "suite",
        true,
    );
    assert!(run.tally.should_stop);
    assert_eq!(run.tally.runs, 1);
    assert_eq!(run.status("suite/fail/run-1"), Some(Status::Fail));
    assert!(!exists(&run, "suite/fail/run-2"));
    assert_eq!(run.status("suite/fail"), Some(Status::Fail));
    assert!(!exists(&run, "suite/pass"));
}

#[test]
fn test_failfast_ends_retry_loop() {
    let run = run_with(
        &[("suite.yaml", "tests:\n  - flaky: { retry: 3, params: { fails: 1 } }\n")],
        "suite",
        true,
    );
    assert_eq!(run.attempt, Attempt::Fail);
    assert_eq!(run.tally.runs, 1);
    assert_eq!(run.tally.retries, 0);
    assert!(!exists(&run, "suite/flaky/run-2"));
}

#[test]
fn test_broken_class_fixture_errors_every_leaf() {
    let run = run("tests:\n  - unplugged:\n");
    assert_eq!(run.status("suite/unplugged/first"), Some(Status::Error));
    assert_eq!(run.status("suite/unplugged/second"), Some(Status::Error));
    assert_eq!(run.tally.errors.len(), 2);
}

#[test]
fn test_load_failure_runs_nothing() {
    let (dir, settings) = setup(&[("suite.yaml", "tests:\n  - pass:\n  - pass: { count: 3, retry: 3 }\n")]);
    let app = App::new(settings, registry());
    match app.run(&["suite".to_owned()], &Mapping::new()) {
        Err(AppError::Load(LoadError::Configuration { .. })) => {}
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
    assert!(!Path::new(&dir.path().join("result")).exists());
}

#[test]
fn test_app_run_creates_timestamped_directory() {
    let (dir, settings) = setup(&[("suite.yaml", "tests:\n  - pass:\n")]);
    let app = App::new(settings, registry());
    let tally = app.run(&["suite".to_owned()], &Mapping::new()).unwrap();
    assert!(tally.was_successful());

    let runs: Vec<_> = fs::read_dir(dir.path().join("result"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| !path.ends_with("latest"))
        .collect();
    assert_eq!(runs.len(), 1);
    assert_eq!(sink::load(&runs[0].join("suite")).unwrap().result, Some(Status::Pass));
    #[cfg(unix)]
    assert!(dir.path().join("result/latest/suite").is_dir());
}
