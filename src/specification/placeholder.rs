//! Suite parameters.
//!
//! A specification declares a parameter with a `!param` node, either
//! required (`!param board`) or with a default (`!param { min: 12 }`).
//! The document is parsed first; substitution then walks the parsed tree
//! and replaces every placeholder with the supplied value or its default.
//! YAML anchors and aliases keep working, so a value declared once as
//! `&min !param { min: 12 }` can be reused with `*min`.

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

pub const TAG: &str = "param";

#[derive(Debug)]
pub struct Substitution<'a> {
    params: &'a Mapping,
    used: BTreeSet<String>,
}

impl<'a> Substitution<'a> {
    pub fn new(params: &'a Mapping) -> Self {
        Self {
            params,
            used: BTreeSet::new(),
        }
    }

    pub fn apply(&mut self, value: Value) -> Result<Value, String> {
        match value {
            Value::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                if tag == TAG {
                    self.placeholder(value)
                } else {
                    Ok(Value::Tagged(Box::new(TaggedValue {
                        tag,
                        value: self.apply(value)?,
                    })))
                }
            }
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| self.apply(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            Value::Mapping(mapping) => {
                let mut resolved = Mapping::new();
                for (key, item) in mapping {
                    resolved.insert(key, self.apply(item)?);
                }
                Ok(Value::Mapping(resolved))
            }
            scalar => Ok(scalar),
        }
    }

    /// Supplied parameters no placeholder asked for.
    pub fn unused(&self) -> Vec<String> {
        self.params
            .keys()
            .filter_map(Value::as_str)
            .filter(|key| !self.used.contains(*key))
            .map(str::to_owned)
            .collect()
    }

    fn placeholder(&mut self, declaration: Value) -> Result<Value, String> {
        let (key, default) = match declaration {
            Value::String(key) => (key, None),
            Value::Mapping(mapping) if mapping.len() == 1 => {
                match mapping.into_iter().next() {
                    Some((Value::String(key), default)) => (key, Some(default)),
                    _ => return Err("parameter name must be a string".to_owned()),
                }
            }
            other => {
                return Err(format!(
                    "expected `!{} name` or `!{} {{ name: default }}`, got {:?}",
                    TAG, TAG, other
                ))
            }
        };
        match self.params.get(&Value::from(key.as_str())) {
            Some(supplied) => {
                trace!("Substituting suite parameter {}", key);
                self.used.insert(key);
                Ok(supplied.clone())
            }
            None => default.ok_or_else(|| format!("parameter '{}' is required", key)),
        }
    }
}

/// Drops parameters explicitly set to null, which means the same as not
/// passing them at all.
pub fn without_nulls(params: Mapping) -> Mapping {
    params
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_supplied_value_replaces_default() {
        let doc: Value = serde_yaml::from_str(
            "tests:\n  - sensor: { params: { min: &min !param { min: 12 }, max: !param max } }\n  - other: { params: { min: *min } }",
        )
        .unwrap();
        let supplied = params("{min: 3, max: 9, stray: 1}");
        let mut substitution = Substitution::new(&supplied);
        let resolved = substitution.apply(doc).unwrap();

        let text = serde_yaml::to_string(&resolved).unwrap();
        assert!(text.contains("min: 3"));
        assert!(text.contains("max: 9"));
        assert!(!text.contains("12"));
        assert_eq!(substitution.unused(), vec!["stray".to_owned()]);
    }

    #[test]
    fn test_default_used_without_params() {
        let doc: Value = serde_yaml::from_str("count: !param { loops: 4 }").unwrap();
        let empty = Mapping::new();
        let resolved = Substitution::new(&empty).apply(doc).unwrap();
        assert_eq!(resolved, serde_yaml::from_str::<Value>("count: 4").unwrap());
    }

    #[test]
    fn test_missing_required_param() {
        let doc: Value = serde_yaml::from_str("board: !param board").unwrap();
        let empty = Mapping::new();
        assert!(Substitution::new(&empty).apply(doc).is_err());
    }

    #[test]
    fn test_other_tags_are_kept() {
        let doc: Value = serde_yaml::from_str("value: !custom { inner: !param { x: 1 } }").unwrap();
        let empty = Mapping::new();
        match Substitution::new(&empty).apply(doc).unwrap() {
            Value::Mapping(mapping) => match mapping.get(&Value::from("value")) {
                Some(Value::Tagged(tagged)) => {
                    assert_eq!(tagged.tag, "custom");
                    assert_eq!(tagged.value, serde_yaml::from_str::<Value>("inner: 1").unwrap());
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_null_params_are_dropped() {
        let cleaned = without_nulls(params("{a: ~, b: 2}"));
        assert_eq!(cleaned.len(), 1);
        assert!(cleaned.contains_key(&Value::from("b")));
    }
}
