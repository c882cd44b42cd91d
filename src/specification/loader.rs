use crate::app::tree::SuiteNode;
use crate::configuration::constants::layout::{SPEC_DIRECTORY_INDEX, SPEC_EXTENSION};
use crate::configuration::settings::Settings;
use crate::specification::error::LoadError;
use crate::specification::placeholder::without_nulls;
use crate::specification::policy::{Directives, Policy, Section};
use crate::specification::raw::{RawSuiteSpec, SuiteEntry};
use crate::specification::registry::{Registry, UnitArgs};
use serde_yaml::Mapping;
use std::fs;
use std::iter;
use std::path::{Path, PathBuf};

/// Turns dotted test names into suite trees.
///
/// A name is looked up as a specification file first, in every overlay and
/// every search path, and then in the registry of code units.
pub struct Loader<'a> {
    settings: &'a Settings,
    registry: &'a Registry,
    search_paths: Vec<PathBuf>,
}

impl<'a> Loader<'a> {
    pub fn new(settings: &'a Settings, registry: &'a Registry) -> Self {
        Self {
            settings,
            registry,
            search_paths: settings.search_paths(),
        }
    }

    /// Loads `name` as the top of a tree.
    pub fn load(&self, name: &str, params: Mapping) -> Result<SuiteNode, LoadError> {
        self.resolve(name, params, Directives::new())
    }

    /// Resolves `name` with the directives its parent hands down.
    pub fn resolve(&self, name: &str, params: Mapping, directives: Directives) -> Result<SuiteNode, LoadError> {
        self.resolve_in(name, params, directives, &[])
    }

    fn resolve_in(
        &self,
        name: &str,
        params: Mapping,
        mut directives: Directives,
        trail: &[PathBuf],
    ) -> Result<SuiteNode, LoadError> {
        let params = without_nulls(params);
        let (mut node, policy) = match self.locate(name) {
            Some(path) => {
                if trail.contains(&path) {
                    return Err(LoadError::Entry {
                        path,
                        reason: format!("{} includes itself", name),
                    });
                }
                let spec = self.read(&path, &params)?;
                directives.fill_missing(&spec.default_directives(&path));
                let policy = validate(name, &directives)?;
                let mut trail = trail.to_vec();
                trail.push(path.clone());
                let node = self.suite(&path, spec, &directives, &trail)?;
                (node, policy)
            }
            None => {
                let policy = validate(name, &directives)?;
                let args = UnitArgs {
                    params: &params,
                    policy: &policy,
                    settings: self.settings,
                };
                let node = self
                    .registry
                    .resolve(name, &args)?
                    .ok_or_else(|| LoadError::NotFound(name.to_owned()))?;
                (node, policy)
            }
        };

        if policy.expect_failure {
            node.expect_failure();
        }
        node.dirname = policy.id.clone().unwrap_or_else(|| name.to_owned());
        node.policy = policy;
        Ok(node)
    }

    /// First `<root>/a/b.yaml` or `<root>/a/b/all.yaml` for name `a.b`,
    /// trying overlay prefixes before the plain name.
    fn locate(&self, name: &str) -> Option<PathBuf> {
        let overlays = self
            .settings
            .overlays
            .iter()
            .map(String::as_str)
            .chain(iter::once(""));
        for overlay in overlays {
            let dotted = if overlay.is_empty() {
                name.to_owned()
            } else {
                format!("{}.{}", overlay, name)
            };
            let relative: PathBuf = dotted.split('.').collect();
            for root in &self.search_paths {
                let candidates = [
                    root.join(&relative).with_extension(SPEC_EXTENSION),
                    root.join(&relative)
                        .join(SPEC_DIRECTORY_INDEX)
                        .with_extension(SPEC_EXTENSION),
                ];
                for candidate in candidates.iter() {
                    trace!("Trying {}", candidate.display());
                    if candidate.is_file() {
                        return Some(candidate.clone());
                    }
                }
            }
        }
        None
    }

    fn read(&self, path: &Path, params: &Mapping) -> Result<RawSuiteSpec, LoadError> {
        debug!("Loading test suite {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (spec, unused) = RawSuiteSpec::parse(path, &text, params)?;
        for key in unused {
            warn!("Parameter {} is not used by {}", key, path.display());
        }
        Ok(spec)
    }

    fn suite(
        &self,
        path: &Path,
        spec: RawSuiteSpec,
        directives: &Directives,
        trail: &[PathBuf],
    ) -> Result<SuiteNode, LoadError> {
        let description = spec
            .description
            .clone()
            .unwrap_or_else(|| format!("Test suite ({})", path.display()));

        let sections = [
            (Section::Setup, &spec.setup),
            (Section::Tests, &spec.tests),
            (Section::Teardown, &spec.teardown),
        ];
        let mut children = vec![];
        for (section, entries) in sections.iter() {
            let entries = match entries {
                None => {
                    if *section == Section::Tests {
                        warn!("No tests in suite {}", path.display());
                    }
                    continue;
                }
                Some(None) => {
                    return Err(LoadError::NullSection {
                        path: path.to_path_buf(),
                        section: section.key(),
                    })
                }
                Some(Some(entries)) => entries,
            };
            if entries.is_empty() && *section == Section::Tests {
                warn!("Empty tests section in suite {}", path.display());
            }

            for mapping in entries {
                let entry = SuiteEntry::from_mapping(mapping.clone()).map_err(|reason| LoadError::Entry {
                    path: path.to_path_buf(),
                    reason,
                })?;
                let mut inherited = directives.inherited(*section);
                inherited.extend(&Directives::from_attributes(&entry.attributes));
                let child = self.resolve_in(&entry.name, entry.params(), inherited, trail)?;
                if child.leaf_count() == 0 {
                    debug!("Dropping {} from {}, it has no test cases", entry.name, path.display());
                    continue;
                }
                children.push(child);
            }
        }

        Ok(SuiteNode::suite(String::new(), Some(description), children))
    }
}

fn validate(name: &str, directives: &Directives) -> Result<Policy, LoadError> {
    directives
        .validate()
        .map_err(|source| LoadError::Configuration {
            name: name.to_owned(),
            source,
        })
}
