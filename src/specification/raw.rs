use crate::specification::error::LoadError;
use crate::specification::placeholder::Substitution;
use serde_derive::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// A suite specification file as written.
#[derive(Debug, Deserialize, Default)]
pub struct RawSuiteSpec {
    #[serde(default)]
    pub description: Option<String>,
    /// Suite-wide default directives, a list of single-entry mappings.
    #[serde(default)]
    pub testargs: Option<Value>,
    #[serde(default, with = "crate::configuration::deserialize::present")]
    pub setup: Option<Option<Vec<Mapping>>>,
    #[serde(default, with = "crate::configuration::deserialize::present")]
    pub tests: Option<Option<Vec<Mapping>>>,
    #[serde(default, with = "crate::configuration::deserialize::present")]
    pub teardown: Option<Option<Vec<Mapping>>>,
}

/// One `name: attributes` list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteEntry {
    pub name: String,
    pub attributes: Mapping,
}

impl SuiteEntry {
    pub fn from_mapping(mapping: Mapping) -> Result<Self, String> {
        if mapping.len() != 1 {
            return Err(format!(
                "each entry must map exactly one test name to its attributes, got {} keys",
                mapping.len()
            ));
        }
        let (name, attributes) = match mapping.into_iter().next() {
            Some(entry) => entry,
            None => return Err("empty entry".to_owned()),
        };
        let name = match name {
            Value::String(name) => name,
            other => return Err(format!("test name must be a string, got {:?}", other)),
        };
        let attributes = match attributes {
            Value::Null => Mapping::new(),
            Value::Mapping(attributes) => attributes,
            other => {
                return Err(format!(
                    "attributes of {} must be a mapping, got {:?}",
                    name, other
                ))
            }
        };
        Ok(Self { name, attributes })
    }

    pub fn params(&self) -> Mapping {
        match self.attributes.get(&Value::from("params")) {
            Some(Value::Mapping(params)) => params.clone(),
            _ => Mapping::new(),
        }
    }
}

impl RawSuiteSpec {
    /// Parses `text`, then resolves its parameter placeholders against
    /// `params`. Returns the specification and the parameters nothing used.
    pub fn parse(path: &Path, text: &str, params: &Mapping) -> Result<(Self, Vec<String>), LoadError> {
        let malformed = |source| LoadError::Malformed {
            path: path.to_path_buf(),
            source,
        };
        let document: Value = serde_yaml::from_str(text).map_err(malformed)?;
        let mut substitution = Substitution::new(params);
        let document = substitution
            .apply(document)
            .map_err(|reason| LoadError::Placeholder {
                path: path.to_path_buf(),
                reason,
            })?;
        let spec = match document {
            Value::Null => RawSuiteSpec::default(),
            document => serde_yaml::from_value(document).map_err(malformed)?,
        };
        Ok((spec, substitution.unused()))
    }

    /// `testargs` flattened into one mapping. A malformed section is
    /// ignored with a warning.
    pub fn default_directives(&self, path: &Path) -> Mapping {
        let mut defaults = Mapping::new();
        match &self.testargs {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(mapping)) => defaults.extend(mapping.clone()),
            Some(Value::Sequence(items)) => {
                for item in items {
                    match item {
                        Value::Mapping(mapping) => defaults.extend(mapping.clone()),
                        _ => {
                            warn!(
                                "testargs in suite {} not properly defined. Must be a list of dicts. Setting ignored",
                                path.display()
                            );
                            return Mapping::new();
                        }
                    }
                }
            }
            Some(_) => warn!(
                "testargs in suite {} not properly defined. Must be a list of dicts. Setting ignored",
                path.display()
            ),
        }
        defaults
    }
}
