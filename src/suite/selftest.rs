use crate::app::case::{CaseReport, TestCase, Verdict};
use crate::app::context::ExecutionContext;
use crate::app::tree::{Leaf, SuiteNode};
use crate::specification::registry::{CaseType, LoadTest, Method, Module, Registry, UnitArgs};
use serde_yaml::{Mapping, Value};
use std::fs;

const CONTENT_FILE: &str = "content.txt";

pub fn register(registry: &mut Registry) {
    registry
        .register_module(
            "selftest",
            Module::new("Checks of the test runner itself")
                .case_type(
                    CaseType::new("BooleanCase", Boolean::build)
                        .describe("Every verdict a test case can report")
                        .method(Method::new("test_pass"))
                        .method(Method::new("test_fail").expected_failure())
                        .method(Method::new("test_skip"))
                        .method(Method::new("test_real_fail")),
                )
                .case_type(CaseType::new("OutputStructure", |_: &str, _: &UnitArgs| {
                    Ok(Box::new(OutputStructure) as Box<dyn TestCase>)
                }))
                .case_type(CaseType::new("OutputResultContent", |_: &str, _: &UnitArgs| {
                    Ok(Box::new(OutputResultContent) as Box<dyn TestCase>)
                }))
                .case_type(CaseType::new("DescriptionDocString", |_: &str, _: &UnitArgs| {
                    Ok(Box::new(DescriptionDocString) as Box<dyn TestCase>)
                })),
        )
        .register_factory("selftest.step", Steps);
}

struct Boolean {
    verdict: Verdict,
}

impl Boolean {
    fn build(method: &str, _args: &UnitArgs) -> Result<Box<dyn TestCase>, String> {
        let verdict = match method {
            "test_pass" => Verdict::Pass,
            "test_fail" => Verdict::Fail("failing on purpose".to_owned()),
            "test_skip" => Verdict::Skip("skipping on purpose".to_owned()),
            "test_real_fail" => Verdict::Fail("this failure is real".to_owned()),
            other => return Err(format!("no such method {}", other)),
        };
        Ok(Box::new(Boolean { verdict }))
    }
}

impl TestCase for Boolean {
    fn description(&self) -> String {
        match &self.verdict {
            Verdict::Pass => "Always passes",
            Verdict::Fail(_) => "Always fails",
            Verdict::Skip(_) => "Always skips",
            Verdict::Error(_) => "Always errors",
        }
        .to_owned()
    }

    fn execute(&self, _context: &ExecutionContext) -> CaseReport {
        self.verdict.clone().into()
    }
}

/// Reports a nested output value.
struct OutputStructure;

impl TestCase for OutputStructure {
    fn description(&self) -> String {
        "Structured output".to_owned()
    }

    fn execute(&self, _context: &ExecutionContext) -> CaseReport {
        let mut nested = Mapping::new();
        nested.insert("key".into(), "value".into());
        nested.insert("numbers".into(), Value::Sequence(vec![1.into(), 2.into(), 3.into()]));
        let mut output = Mapping::new();
        output.insert("nested".into(), Value::Mapping(nested));
        output.insert("ratio".into(), 0.5.into());
        CaseReport::pass().with_output(Value::Mapping(output))
    }
}

/// Leaves a file in its result directory.
struct OutputResultContent;

impl TestCase for OutputResultContent {
    fn description(&self) -> String {
        "Writes a file into the result directory".to_owned()
    }

    fn execute(&self, context: &ExecutionContext) -> CaseReport {
        match fs::write(context.result_dir().join(CONTENT_FILE), "result content\n") {
            Ok(()) => CaseReport::pass().with_output(CONTENT_FILE),
            Err(e) => CaseReport::error(e.to_string()),
        }
    }
}

struct DescriptionDocString;

impl TestCase for DescriptionDocString {
    fn description(&self) -> String {
        "Multi-line description.\n\nThe second paragraph is kept in the result file.".to_owned()
    }

    fn execute(&self, _context: &ExecutionContext) -> CaseReport {
        CaseReport::pass()
    }
}

/// `selftest.step.<verdict>`: a single step reporting that verdict.
struct Steps;

struct Step(Verdict);

impl TestCase for Step {
    fn description(&self) -> String {
        format!("Step reporting {:?}", self.0)
    }

    fn execute(&self, _context: &ExecutionContext) -> CaseReport {
        self.0.clone().into()
    }
}

impl LoadTest for Steps {
    fn load_test(&self, prefix: &str, suffix: &str, _args: &UnitArgs) -> Result<Option<SuiteNode>, String> {
        let verdict = match suffix {
            "pass" => Verdict::Pass,
            "fail" => Verdict::Fail("step failed".to_owned()),
            "skip" => Verdict::Skip("step skipped".to_owned()),
            "error" => Verdict::Error("step errored".to_owned()),
            _ => return Ok(None),
        };
        let leaf = Leaf::new(format!("{}.{}", prefix, suffix), Box::new(Step(verdict)));
        Ok(Some(SuiteNode::leaf(suffix, leaf)))
    }
}
