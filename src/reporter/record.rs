use crate::reporter::status::Status;
use serde_derive::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::str::FromStr;

/// Classifies a result directory without looking at its name.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Suite,
    Setup,
    Teardown,
    Testcase,
    Teststep,
    CountOrRetry,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Suite => "suite",
            NodeType::Setup => "setup",
            NodeType::Teardown => "teardown",
            NodeType::Testcase => "testcase",
            NodeType::Teststep => "teststep",
            NodeType::CountOrRetry => "count_or_retry",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suite" => Ok(NodeType::Suite),
            "setup" => Ok(NodeType::Setup),
            "teardown" => Ok(NodeType::Teardown),
            "testcase" => Ok(NodeType::Testcase),
            "teststep" => Ok(NodeType::Teststep),
            "count_or_retry" => Ok(NodeType::CountOrRetry),
            other => Err(format!("unknown node type '{}'", other)),
        }
    }
}

/// One node's persisted outcome.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ResultRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    /// Elapsed seconds, leaves only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputparams: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(rename = "retry-max", default, skip_serializing_if = "Option::is_none")]
    pub retry_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl ResultRecord {
    /// Record of a single `run-<n>` iteration of a count or retry loop.
    pub fn iteration(name: String, passed: bool, start_time: f64) -> Self {
        Self {
            kind: Some(NodeType::CountOrRetry),
            name: Some(name),
            result: Some(Status::from_passed(passed)),
            start_time: Some(start_time),
            ..Self::default()
        }
    }

    /// Folds an iteration summary into whatever the directory already
    /// holds. Classification and verdict are forced, the rest is kept.
    pub fn absorb_iteration(&mut self, iteration: ResultRecord) {
        self.kind = iteration.kind;
        self.name = iteration.name;
        self.result = iteration.result;
        if self.start_time.is_none() {
            self.start_time = iteration.start_time;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_field_names_on_disk() {
        let record = ResultRecord {
            kind: Some(NodeType::CountOrRetry),
            name: Some("loop".to_owned()),
            result: Some(Status::Pass),
            start_time: Some(1.5),
            retry_max: Some(3),
            retries: Some(2),
            ..ResultRecord::default()
        };
        let text = serde_yaml::to_string(&record).unwrap();

        assert!(text.contains("type: count_or_retry"));
        assert!(text.contains("result: PASS"));
        assert!(text.contains("retry-max: 3"));
        assert!(text.contains("description: null"));
        assert!(!text.contains("output"));
    }

    #[test]
    fn test_iteration_keeps_leaf_details() {
        let mut leaf = ResultRecord {
            kind: Some(NodeType::Teststep),
            name: Some("sensor".to_owned()),
            result: Some(Status::Fail),
            start_time: Some(10.0),
            description: Some("Reads a sensor".to_owned()),
            ..ResultRecord::default()
        };
        leaf.absorb_iteration(ResultRecord::iteration("run-2".to_owned(), false, 12.0));

        assert_eq!(leaf.kind, Some(NodeType::CountOrRetry));
        assert_eq!(leaf.name.as_deref(), Some("run-2"));
        assert_eq!(leaf.start_time, Some(10.0));
        assert_eq!(leaf.description.as_deref(), Some("Reads a sensor"));
    }
}
