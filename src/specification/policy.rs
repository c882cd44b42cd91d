//! Per-node policy directives.
//!
//! A suite entry looks like `mytest: { count: 4, params: { min: 12 } }`.
//! Everything except `params` is a directive for the engine:
//!
//! * `count` repeats the node a fixed number of times (at least 2).
//! * `retry` repeats the node until it passes, at most that many times.
//! * `exit-on-error` makes a suite skip its remaining non-teardown children
//!   once one of them fails. Only `true` is accepted.
//! * `setup` / `teardown` mark steps of the setup or teardown section.
//! * `id` overrides the directory name, `name` the name in the result file.
//! * `flag` is copied as is into the result file.
//! * `type` overrides the result classification (`setup`, `teardown`, `suite`).
//! * `expect` / `expected_failure` turn a failure into the passing condition.
//! * `header` logs a banner before the suite and each of its children.
//! * `cfg_idx` selects the device configuration handed to test cases.

use crate::reporter::NodeType;
use crate::specification::error::ConfigurationError;
use serde_yaml::{Mapping, Value};

pub const COUNT: &str = "count";
pub const RETRY: &str = "retry";
pub const EXIT_ON_ERROR: &str = "exit-on-error";
pub const SETUP: &str = "setup";
pub const TEARDOWN: &str = "teardown";
pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const FLAG: &str = "flag";
pub const TYPE: &str = "type";
pub const EXPECT: &str = "expect";
pub const EXPECTED_FAILURE: &str = "expected_failure";
pub const HEADER: &str = "header";
pub const CFG_IDX: &str = "cfg_idx";
pub const PARAMS: &str = "params";

const KNOWN: [&str; 13] = [
    COUNT,
    RETRY,
    EXIT_ON_ERROR,
    SETUP,
    TEARDOWN,
    ID,
    NAME,
    FLAG,
    TYPE,
    EXPECT,
    EXPECTED_FAILURE,
    HEADER,
    CFG_IDX,
];

/// The section of a suite specification a child was declared in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Section {
    Setup,
    Tests,
    Teardown,
}

impl Section {
    pub fn key(&self) -> &'static str {
        match self {
            Section::Setup => "setup",
            Section::Tests => "tests",
            Section::Teardown => "teardown",
        }
    }
}

/// Raw directives as written in the specification, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives(Mapping);

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry attributes minus `params`.
    pub fn from_attributes(attributes: &Mapping) -> Self {
        let mut directives = Mapping::new();
        for (key, value) in attributes {
            if key.as_str() != Some(PARAMS) {
                directives.insert(key.clone(), value.clone());
            }
        }
        Directives(directives)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(&Value::from(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(&Value::from(key))
    }

    pub fn insert<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.0.insert(Value::from(key), value.into());
    }

    /// Overrides with every directive in `other`.
    pub fn extend(&mut self, other: &Directives) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Adds suite-wide defaults for keys not already defined, so directives
    /// declared by the caller win over `testargs`.
    pub fn fill_missing(&mut self, defaults: &Mapping) {
        for (key, value) in defaults {
            if !self.0.contains_key(key) {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }

    /// Directives a child declared in `section` starts from: a fail-fast
    /// parent stays fail-fast, and anything below a setup step is too.
    pub fn inherited(&self, section: Section) -> Directives {
        let mut child = Directives::new();
        if let Some(value) = self.get(EXIT_ON_ERROR) {
            child.insert(EXIT_ON_ERROR, value.clone());
        }
        if self.get(SETUP) == Some(&Value::Bool(true)) {
            child.insert(EXIT_ON_ERROR, true);
        }
        match section {
            Section::Setup => child.insert(SETUP, true),
            Section::Teardown => child.insert(TEARDOWN, true),
            Section::Tests => {}
        }
        child
    }

    pub fn validate(&self) -> Result<Policy, ConfigurationError> {
        for key in self.0.keys() {
            match key.as_str() {
                Some(name) if KNOWN.contains(&name) => {}
                _ => warn!("Ignoring unknown directive {}", render(key)),
            }
        }
        if self.contains(COUNT) && self.contains(RETRY) {
            return Err(ConfigurationError::CountAndRetry);
        }
        let exit_on_error = match self.get(EXIT_ON_ERROR) {
            None | Some(Value::Bool(true)) => self.contains(EXIT_ON_ERROR),
            Some(other) => return Err(ConfigurationError::ExitOnError(render(other))),
        };
        Ok(Policy {
            count: self.repetition(COUNT)?,
            retry: self.repetition(RETRY)?,
            exit_on_error,
            setup: self.flag(SETUP)?,
            teardown: self.flag(TEARDOWN)?,
            id: self.scalar(ID)?,
            name: self.scalar(NAME)?,
            flag: self.get(FLAG).cloned(),
            kind: match self.scalar(TYPE)? {
                Some(kind) => Some(kind.parse().map_err(ConfigurationError::InvalidType)?),
                None => None,
            },
            expect_failure: self.flag(EXPECT)? || self.flag(EXPECTED_FAILURE)?,
            header: self.flag(HEADER)?,
            cfg_idx: match self.get(CFG_IDX) {
                None => None,
                Some(value) => Some(value.as_u64().ok_or_else(|| {
                    ConfigurationError::NotInteger {
                        key: CFG_IDX,
                        value: render(value),
                    }
                })? as usize),
            },
        })
    }

    fn repetition(&self, key: &'static str) -> Result<Option<u32>, ConfigurationError> {
        let value = match self.get(key) {
            Some(value) => value,
            None => return Ok(None),
        };
        let number = value
            .as_u64()
            .ok_or_else(|| ConfigurationError::NotInteger {
                key,
                value: render(value),
            })?;
        if number < 2 {
            return Err(ConfigurationError::BelowMinimum { key, value: number });
        }
        if number > u64::from(u32::MAX) {
            return Err(ConfigurationError::NotInteger {
                key,
                value: render(value),
            });
        }
        Ok(Some(number as u32))
    }

    fn flag(&self, key: &'static str) -> Result<bool, ConfigurationError> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Bool(value)) => Ok(*value),
            Some(other) => Err(ConfigurationError::NotBoolean {
                key,
                value: render(other),
            }),
        }
    }

    fn scalar(&self, key: &'static str) -> Result<Option<String>, ConfigurationError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(Value::Number(number)) => Ok(Some(number.to_string())),
            Some(Value::Bool(value)) => Ok(Some(value.to_string())),
            Some(other) => Err(ConfigurationError::NotScalar {
                key,
                value: render(other),
            }),
        }
    }
}

fn render(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|text| text.trim_end().to_owned())
        .unwrap_or_else(|_| format!("{:?}", value))
}

/// How many times a node is attempted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Repetition {
    Once,
    /// Always run exactly this many times.
    Count(u32),
    /// Stop at the first pass, at most this many attempts.
    Retry(u32),
}

impl Repetition {
    pub fn bound(&self) -> u32 {
        match *self {
            Repetition::Once => 1,
            Repetition::Count(n) | Repetition::Retry(n) => n,
        }
    }

    pub fn is_retry(&self) -> bool {
        match self {
            Repetition::Retry(_) => true,
            _ => false,
        }
    }
}

/// Validated directives of one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Policy {
    pub count: Option<u32>,
    pub retry: Option<u32>,
    pub exit_on_error: bool,
    pub setup: bool,
    pub teardown: bool,
    pub id: Option<String>,
    pub name: Option<String>,
    pub flag: Option<Value>,
    pub kind: Option<NodeType>,
    pub expect_failure: bool,
    pub header: bool,
    pub cfg_idx: Option<usize>,
}

impl Policy {
    pub fn repetition(&self) -> Repetition {
        match (self.count, self.retry) {
            (_, Some(retry)) => Repetition::Retry(retry),
            (Some(count), None) => Repetition::Count(count),
            (None, None) => Repetition::Once,
        }
    }

    /// Classification written to the result file, when the policy decides it.
    pub fn node_type(&self) -> Option<NodeType> {
        if self.kind.is_some() {
            self.kind
        } else if self.setup {
            Some(NodeType::Setup)
        } else if self.teardown {
            Some(NodeType::Teardown)
        } else {
            None
        }
    }
}
