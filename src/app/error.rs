use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal engine conditions. These point at a state bug or a broken
/// filesystem and end the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("directory {} already exists, refusing to reuse it", .0.display())]
    DirectoryCollision(PathBuf),
    #[error("cannot create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
