pub(crate) mod case;
pub(crate) mod context;
pub(crate) mod error;
pub(crate) mod executor;
pub(crate) mod fixtures;
pub(crate) mod tally;
pub(crate) mod tree;

#[cfg(test)]
mod test;

use crate::app::error::EngineError;
use crate::app::executor::{Attempt, Engine};
use crate::app::tally::Tally;
use crate::app::tree::SuiteNode;
use crate::configuration::constants::common::{LATEST_LINK, RUN_DIR_FORMAT};
use crate::configuration::settings::Settings;
use crate::specification::error::LoadError;
use crate::specification::loader::Loader;
use crate::specification::registry::Registry;
use serde_yaml::Mapping;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("cannot prepare run directory {}: {source}", .path.display())]
    RunDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct App {
    settings: Settings,
    registry: Registry,
    failfast: bool,
}

impl App {
    pub fn new(settings: Settings, registry: Registry) -> Self {
        App {
            settings,
            registry,
            failfast: false,
        }
    }

    pub fn failfast(mut self, failfast: bool) -> Self {
        self.failfast = failfast;
        self
    }

    /// Resolves every name up front, so that a broken specification fails
    /// before anything has executed.
    pub fn load(&self, tests: &[String], params: &Mapping) -> Result<Vec<SuiteNode>, LoadError> {
        let loader = Loader::new(&self.settings, &self.registry);
        let mut nodes = Vec::with_capacity(tests.len());
        for name in tests {
            let node = loader.load(name, params.clone())?;
            if node.leaf_count() == 0 {
                warn!("Nothing to run in {}", name);
                continue;
            }
            info!("Loaded {} with {} test cases", name, node.leaf_count());
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Loads and runs `tests` in a fresh timestamped run directory.
    pub fn run(&self, tests: &[String], params: &Mapping) -> Result<Tally, AppError> {
        let nodes = self.load(tests, params)?;
        let stamp = chrono::Local::now().format(RUN_DIR_FORMAT).to_string();
        let result_dir = prepare_run_dir(&self.settings.result_root, &stamp)?;
        let tmp_dir = prepare_run_dir(&self.settings.tmp_root, &stamp)?;
        info!("Results are written to {}", result_dir.display());
        self.execute(&nodes, result_dir, tmp_dir)
    }

    /// Runs already loaded trees below the given roots.
    pub fn execute(&self, nodes: &[SuiteNode], result_dir: PathBuf, tmp_dir: PathBuf) -> Result<Tally, AppError> {
        let started = Instant::now();
        let mut engine = Engine::new(result_dir, tmp_dir).failfast(self.failfast);
        for node in nodes {
            if engine.tally().should_stop {
                break;
            }
            if engine.run(node)? != Attempt::Pass {
                warn!("{} did not pass", node.display_name());
            }
        }
        let tally = engine.into_tally();
        tally.log_summary(started.elapsed());
        Ok(tally)
    }
}

fn prepare_run_dir(root: &Path, stamp: &str) -> Result<PathBuf, AppError> {
    let dir = root.join(stamp);
    fs::create_dir_all(&dir).map_err(|source| AppError::RunDir {
        path: dir.clone(),
        source,
    })?;
    point_latest(root, stamp);
    Ok(dir)
}

#[cfg(unix)]
fn point_latest(root: &Path, stamp: &str) {
    let link = root.join(LATEST_LINK);
    if fs::symlink_metadata(&link).is_ok() {
        if let Err(e) = fs::remove_file(&link) {
            warn!("Cannot replace {}: {}", link.display(), e);
            return;
        }
    }
    if let Err(e) = std::os::unix::fs::symlink(stamp, &link) {
        warn!("Cannot link {}: {}", link.display(), e);
    }
}

#[cfg(not(unix))]
fn point_latest(_root: &Path, _stamp: &str) {}
