use crate::app::case::{ClassFixture, TestCase};
use crate::specification::policy::Policy;
use derivative::*;
use serde_yaml::Mapping;
use std::rc::Rc;

/// A node of the resolved suite tree. Built once by the loader and only
/// read by the engine.
#[derive(Debug)]
pub struct SuiteNode {
    /// Directory name before de-duplication: the `id` directive or the
    /// declared name.
    pub dirname: String,
    pub description: Option<String>,
    pub policy: Policy,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    /// Setup children first, then tests, then teardown children.
    Suite { children: Vec<SuiteNode> },
    Leaf(Leaf),
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Leaf {
    /// Qualified name of the case, recorded when the node declares none.
    pub name: String,
    #[derivative(Debug = "ignore")]
    pub case: Box<dyn TestCase>,
    pub expect_failure: bool,
    pub class: Option<ClassBinding>,
    /// Parameters given in the specification.
    pub input_params: Option<Mapping>,
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ClassBinding {
    pub name: String,
    #[derivative(Debug = "ignore")]
    pub fixture: Rc<dyn ClassFixture>,
}

impl SuiteNode {
    pub fn suite<S: Into<String>>(dirname: S, description: Option<String>, children: Vec<SuiteNode>) -> Self {
        Self {
            dirname: dirname.into(),
            description,
            policy: Policy::default(),
            kind: NodeKind::Suite { children },
        }
    }

    pub fn leaf<S: Into<String>>(dirname: S, leaf: Leaf) -> Self {
        Self {
            dirname: dirname.into(),
            description: None,
            policy: Policy::default(),
            kind: NodeKind::Leaf(leaf),
        }
    }

    /// Name written to the result file.
    pub fn display_name(&self) -> &str {
        self.policy.name.as_deref().unwrap_or(&self.dirname)
    }

    pub fn is_suite(&self) -> bool {
        match self.kind {
            NodeKind::Suite { .. } => true,
            NodeKind::Leaf(_) => false,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(_) => 1,
            NodeKind::Suite { children } => children.iter().map(SuiteNode::leaf_count).sum(),
        }
    }

    /// Makes failure the passing condition of every leaf below this node.
    pub fn expect_failure(&mut self) {
        match &mut self.kind {
            NodeKind::Leaf(leaf) => leaf.expect_failure = true,
            NodeKind::Suite { children } => children.iter_mut().for_each(SuiteNode::expect_failure),
        }
    }
}

impl Leaf {
    pub fn new<S: Into<String>>(name: S, case: Box<dyn TestCase>) -> Self {
        Self {
            name: name.into(),
            case,
            expect_failure: false,
            class: None,
            input_params: None,
        }
    }
}
