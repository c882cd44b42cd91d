use crate::app::error::EngineError;
use crate::configuration::constants::layout::RUN_DIR_PREFIX;
use std::fs;
use std::path::{Path, PathBuf};

/// The directory pair handed to one execution of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    result_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl ExecutionContext {
    pub fn new(result_dir: PathBuf, tmp_dir: PathBuf) -> Self {
        Self {
            result_dir,
            tmp_dir,
        }
    }

    /// Where the descriptor and any report material go.
    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    /// Scratch space private to this execution.
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// The `run-<n>` pair below this one.
    pub fn iteration(&self, n: u32) -> Self {
        let name = iteration_dirname(n);
        Self {
            result_dir: self.result_dir.join(&name),
            tmp_dir: self.tmp_dir.join(&name),
        }
    }

    /// Creates both directories. Either one already existing means the
    /// allocation went wrong, which is never retried.
    pub fn create(&self) -> Result<(), EngineError> {
        for dir in &[&self.result_dir, &self.tmp_dir] {
            if dir.exists() {
                return Err(EngineError::DirectoryCollision(dir.to_path_buf()));
            }
            fs::create_dir_all(dir).map_err(|source| EngineError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

pub fn iteration_dirname(n: u32) -> String {
    format!("{}{}", RUN_DIR_PREFIX, n)
}

/// Picks `dirname`, or `dirname-1`, `dirname-2`, ... under `parent`
/// (relative to `result_root`), whichever does not exist yet.
pub fn unique_dirname(result_root: &Path, parent: &Path, dirname: &str) -> PathBuf {
    let mut candidate = parent.join(dirname);
    let mut suffix = 0;
    while result_root.join(&candidate).exists() {
        debug!(
            "Result path {} already exists",
            result_root.join(&candidate).display()
        );
        suffix += 1;
        candidate = parent.join(format!("{}-{}", dirname, suffix));
    }
    candidate
}
