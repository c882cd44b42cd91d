use crate::app::context::ExecutionContext;
use crate::reporter::Status;
use serde_yaml::{Mapping, Value};

/// What a test case reports after executing once.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Fail(String),
    Skip(String),
    /// Something unexpected went wrong, as opposed to a failed check.
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseReport {
    pub verdict: Verdict,
    pub output: Option<Value>,
}

impl CaseReport {
    pub fn pass() -> Self {
        Verdict::Pass.into()
    }

    pub fn fail<S: Into<String>>(message: S) -> Self {
        Verdict::Fail(message.into()).into()
    }

    pub fn skip<S: Into<String>>(reason: S) -> Self {
        Verdict::Skip(reason.into()).into()
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Verdict::Error(message.into()).into()
    }

    pub fn with_output<V: Into<Value>>(mut self, output: V) -> Self {
        self.output = Some(output.into());
        self
    }
}

impl From<Verdict> for CaseReport {
    fn from(verdict: Verdict) -> Self {
        Self {
            verdict,
            output: None,
        }
    }
}

/// A leaf unit of work. The engine hands it a freshly created directory
/// pair that no other execution shares.
pub trait TestCase {
    fn description(&self) -> String;

    /// Effective parameters, recorded in the result file when present.
    fn params(&self) -> Option<Mapping> {
        None
    }

    fn execute(&self, context: &ExecutionContext) -> CaseReport;
}

/// Class-level set-up and tear-down shared by all leaves of a case type.
pub trait ClassFixture {
    fn set_up_class(&self) -> Result<(), String>;
    fn tear_down_class(&self) -> Result<(), String>;
}

/// Verdict of a leaf once its expectation has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
    Error,
    Skip,
    ExpectedFailure,
    UnexpectedSuccess,
}

impl Outcome {
    pub fn judge(verdict: &Verdict, expect_failure: bool) -> Self {
        match (verdict, expect_failure) {
            (Verdict::Skip(_), _) => Outcome::Skip,
            (Verdict::Pass, false) => Outcome::Pass,
            (Verdict::Fail(_), false) => Outcome::Fail,
            (Verdict::Error(_), false) => Outcome::Error,
            (Verdict::Pass, true) => Outcome::UnexpectedSuccess,
            (Verdict::Fail(_), true) | (Verdict::Error(_), true) => Outcome::ExpectedFailure,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Outcome::Pass | Outcome::ExpectedFailure => Status::Pass,
            Outcome::Fail | Outcome::UnexpectedSuccess => Status::Fail,
            Outcome::Error => Status::Error,
            Outcome::Skip => Status::Skip,
        }
    }

    pub fn is_failure(&self) -> bool {
        match self {
            Outcome::Fail | Outcome::Error | Outcome::UnexpectedSuccess => true,
            Outcome::Pass | Outcome::Skip | Outcome::ExpectedFailure => false,
        }
    }
}
