use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::error::MocapError;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("File not found ({})", .0.display())]
    FileNotFound(PathBuf),

    #[error("Decode error ({})", .0.display())]
    Decode(PathBuf),

    #[error("Could not parse {}: {}", .0.display(), .1)]
    Mocap(PathBuf, #[source] MocapError),

    #[error("Unknown error ({}): {}", .0.display(), .1)]
    Unknown(PathBuf, String),
}

impl AssetError {
    pub fn from_io_error(error: std::io::Error, path: &Path) -> Self {
        match error {
            err if err.kind() == std::io::ErrorKind::NotFound => {
                Self::FileNotFound(path.to_path_buf())
            }
            err => Self::Unknown(path.to_path_buf(), err.kind().to_string()),
        }
    }
}

pub struct AssetLoadContext<'a> {
    pub path: &'a Path,
}

impl AssetLoadContext<'_> {
    /// Interpret the raw bytes as ASCII/UTF-8 text.
    pub fn text<'r>(&self, raw: &'r [u8]) -> Result<&'r str, AssetError> {
        std::str::from_utf8(raw).map_err(|_| AssetError::Decode(self.path.to_path_buf()))
    }

    pub fn mocap_error(&self, error: MocapError) -> AssetError {
        AssetError::Mocap(self.path.to_path_buf(), error)
    }
}

/// Something that can be decoded from the raw contents of a file.
pub trait AssetType: Sized {
    fn from_raw(raw: &[u8], context: &AssetLoadContext) -> Result<Self, AssetError>;
}

pub trait AssetFileSystem {
    fn load(&self, path: &Path) -> Result<Vec<u8>, AssetError>;
}

#[derive(Clone)]
pub struct Assets {
    file_system: Arc<dyn AssetFileSystem>,
}

impl Default for Assets {
    fn default() -> Self {
        Self {
            file_system: Arc::new(PlatformFileSystem {
                root: std::env::current_dir().unwrap_or_default(),
            }),
        }
    }
}

impl Assets {
    pub fn with_file_system(file_system: Arc<dyn AssetFileSystem>) -> Self {
        Self { file_system }
    }

    pub fn load_direct<A: AssetType>(&self, path: impl AsRef<Path>) -> Result<A, AssetError> {
        let data = self.file_system.load(path.as_ref())?;
        let load_context = AssetLoadContext {
            path: path.as_ref(),
        };
        let asset = A::from_raw(&data, &load_context)?;
        tracing::debug!("Loaded {} ({} bytes)", path.as_ref().display(), data.len());
        Ok(asset)
    }
}

/// Reads files relative to `root`. Absolute paths are read as is.
pub struct PlatformFileSystem {
    root: PathBuf,
}

impl PlatformFileSystem {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl AssetFileSystem for PlatformFileSystem {
    fn load(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        std::fs::read(self.root.join(path)).map_err(|err| AssetError::from_io_error(err, path))
    }
}
