//! Code-level test units.
//!
//! A dotted name that does not match a specification file is looked up
//! here. The longest registered prefix of the name wins and the remaining
//! segments are walked inside that unit: a module yields its case types, a
//! case type yields its methods, a factory gets the whole remaining suffix.

use crate::app::case::{ClassFixture, TestCase};
use crate::app::tree::{ClassBinding, Leaf, NodeKind, SuiteNode};
use crate::configuration::constants::layout::DEFAULT_METHOD;
use crate::configuration::settings::Settings;
use crate::specification::error::LoadError;
use crate::specification::policy::Policy;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

/// What a unit gets to build itself from.
pub struct UnitArgs<'a> {
    pub params: &'a Mapping,
    pub policy: &'a Policy,
    pub settings: &'a Settings,
}

impl<'a> UnitArgs<'a> {
    /// Reads parameter `key` as `T`. Absent and null are both `None`.
    pub fn param<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, String> {
        match self.params.get(&Value::from(key)) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|e| format!("parameter {}: {}", key, e)),
        }
    }

    /// The device configuration selected by `cfg_idx`, the first one by default.
    pub fn device(&self) -> Option<&'a Mapping> {
        self.settings.device(self.policy.cfg_idx.unwrap_or(0))
    }
}

/// Extension point for units that build their own subtree from the rest
/// of the dotted name.
pub trait LoadTest {
    /// `prefix` is the name the factory is registered under, `suffix` the
    /// remaining dotted segments (possibly empty). `None` means the suffix
    /// names nothing.
    fn load_test(&self, prefix: &str, suffix: &str, args: &UnitArgs) -> Result<Option<SuiteNode>, String>;
}

pub type Constructor = Rc<dyn Fn(&str, &UnitArgs) -> Result<Box<dyn TestCase>, String>>;
pub type Callable = Rc<dyn Fn(&UnitArgs) -> Result<SuiteNode, String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub expected_failure: bool,
}

impl Method {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            expected_failure: false,
        }
    }

    pub fn expected_failure(mut self) -> Self {
        self.expected_failure = true;
        self
    }
}

/// A constructor plus the test methods it can be instantiated for.
#[derive(Clone)]
pub struct CaseType {
    pub name: String,
    pub description: Option<String>,
    methods: Vec<Method>,
    constructor: Constructor,
    fixture: Option<Rc<dyn ClassFixture>>,
}

impl CaseType {
    pub fn new<S, F>(name: S, constructor: F) -> Self
    where
        S: Into<String>,
        F: Fn(&str, &UnitArgs) -> Result<Box<dyn TestCase>, String> + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            methods: vec![],
            constructor: Rc::new(constructor),
            fixture: None,
        }
    }

    pub fn describe<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn fixture(mut self, fixture: Rc<dyn ClassFixture>) -> Self {
        self.fixture = Some(fixture);
        self
    }

    fn declared(&self) -> Vec<Method> {
        if self.methods.is_empty() {
            vec![Method::new(DEFAULT_METHOD)]
        } else {
            self.methods.clone()
        }
    }

    fn select(&self, qualified: &str, rest: &[&str], args: &UnitArgs) -> Result<SuiteNode, String> {
        match rest {
            [] => self.expand(qualified, args),
            [name] => {
                let method = self
                    .declared()
                    .into_iter()
                    .find(|method| method.name == *name)
                    .ok_or_else(|| format!("{} has no test method {}", qualified, name))?;
                self.instantiate(qualified, &method, args)
            }
            _ => Err(format!(
                "{} has nothing below a test method, got {}",
                qualified,
                rest.join(".")
            )),
        }
    }

    /// Every declared method. A single method yields a leaf, several a
    /// suite of leaves.
    fn expand(&self, qualified: &str, args: &UnitArgs) -> Result<SuiteNode, String> {
        let methods = self.declared();
        if let [method] = methods.as_slice() {
            let mut node = self.instantiate(qualified, method, args)?;
            node.dirname = self.name.clone();
            return Ok(node);
        }
        let children = methods
            .iter()
            .map(|method| self.instantiate(qualified, method, args))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SuiteNode::suite(
            self.name.clone(),
            self.description.clone(),
            children,
        ))
    }

    fn instantiate(&self, qualified: &str, method: &Method, args: &UnitArgs) -> Result<SuiteNode, String> {
        let case = (self.constructor)(&method.name, args)?;
        let mut leaf = Leaf::new(format!("{}.{}", qualified, method.name), case);
        leaf.expect_failure = method.expected_failure;
        leaf.class = self.fixture.as_ref().map(|fixture| ClassBinding {
            name: qualified.to_owned(),
            fixture: fixture.clone(),
        });
        if !args.params.is_empty() {
            leaf.input_params = Some(args.params.clone());
        }
        Ok(SuiteNode::leaf(method.name.clone(), leaf))
    }
}

/// A named group of case types.
#[derive(Clone, Default)]
pub struct Module {
    pub description: Option<String>,
    types: Vec<CaseType>,
}

impl Module {
    pub fn new<S: Into<String>>(description: S) -> Self {
        Self {
            description: Some(description.into()),
            types: vec![],
        }
    }

    pub fn case_type(mut self, case_type: CaseType) -> Self {
        self.types.push(case_type);
        self
    }

    fn expand(&self, qualified: &str, args: &UnitArgs) -> Result<SuiteNode, String> {
        let children = self
            .types
            .iter()
            .map(|case_type| case_type.expand(&format!("{}.{}", qualified, case_type.name), args))
            .collect::<Result<Vec<_>, _>>()?;
        let dirname = qualified.rsplit('.').next().unwrap_or(qualified);
        Ok(SuiteNode::suite(dirname, self.description.clone(), children))
    }
}

pub enum Unit {
    Module(Module),
    CaseType(CaseType),
    Factory(Rc<dyn LoadTest>),
    Callable(Callable),
}

#[derive(Default)]
pub struct Registry {
    units: BTreeMap<String, Unit>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the units shipped with the binary.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::suite::register(&mut registry);
        registry
    }

    pub fn register<S: Into<String>>(&mut self, name: S, unit: Unit) -> &mut Self {
        let name = name.into();
        if self.units.insert(name.clone(), unit).is_some() {
            warn!("Test unit {} registered twice, keeping the last one", name);
        }
        self
    }

    pub fn register_module<S: Into<String>>(&mut self, name: S, module: Module) -> &mut Self {
        self.register(name, Unit::Module(module))
    }

    pub fn register_case_type<S: Into<String>>(&mut self, name: S, case_type: CaseType) -> &mut Self {
        self.register(name, Unit::CaseType(case_type))
    }

    pub fn register_factory<S: Into<String>, L: LoadTest + 'static>(&mut self, name: S, factory: L) -> &mut Self {
        self.register(name, Unit::Factory(Rc::new(factory)))
    }

    pub fn register_callable<S, F>(&mut self, name: S, callable: F) -> &mut Self
    where
        S: Into<String>,
        F: Fn(&UnitArgs) -> Result<SuiteNode, String> + 'static,
    {
        self.register(name, Unit::Callable(Rc::new(callable)))
    }

    /// `Ok(None)` when no prefix of `name` is registered.
    pub fn resolve(&self, name: &str, args: &UnitArgs) -> Result<Option<SuiteNode>, LoadError> {
        let segments: Vec<&str> = name.split('.').collect();
        for split in (1..=segments.len()).rev() {
            let prefix = segments[..split].join(".");
            if let Some(unit) = self.units.get(&prefix) {
                debug!("Resolving {} from test unit {}", name, prefix);
                return walk(unit, &prefix, &segments[split..], args)
                    .map(Some)
                    .map_err(|reason| LoadError::unit(name, reason));
            }
        }
        Ok(None)
    }
}

fn walk(unit: &Unit, prefix: &str, rest: &[&str], args: &UnitArgs) -> Result<SuiteNode, String> {
    match unit {
        Unit::Module(module) => match rest.split_first() {
            None => module.expand(prefix, args),
            Some((type_name, rest)) => {
                let case_type = module
                    .types
                    .iter()
                    .find(|case_type| case_type.name == *type_name)
                    .ok_or_else(|| format!("module {} has no test case type {}", prefix, type_name))?;
                case_type.select(&format!("{}.{}", prefix, type_name), rest, args)
            }
        },
        Unit::CaseType(case_type) => case_type.select(prefix, rest, args),
        Unit::Factory(factory) => {
            let suffix = rest.join(".");
            factory
                .load_test(prefix, &suffix, args)?
                .map(|node| with_input_params(node, args))
                .ok_or_else(|| format!("load_test of {} returned nothing for '{}'", prefix, suffix))
        }
        Unit::Callable(callable) => {
            if rest.is_empty() {
                callable(args).map(|node| with_input_params(node, args))
            } else {
                Err(format!("{} is a callable, cannot look up {}", prefix, rest.join(".")))
            }
        }
    }
}

/// Records the given parameters on a leaf built by a factory or a callable.
fn with_input_params(mut node: SuiteNode, args: &UnitArgs) -> SuiteNode {
    if let NodeKind::Leaf(leaf) = &mut node.kind {
        if leaf.input_params.is_none() && !args.params.is_empty() {
            leaf.input_params = Some(args.params.clone());
        }
    }
    node
}
