//! Filesystem-backed resource lookup.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use crate::application::ports::{ResourceError, ResourceProvider};

/// Serves resource paths from beneath a root directory.
///
/// Resource paths are rooted at the directory, so `/js/app.js` and
/// `js/app.js` name the same file. Contents are decoded as UTF-8.
#[derive(Debug, Clone)]
pub struct FsResourceProvider {
    root: PathBuf,
}

impl FsResourceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ResourceError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ResourceError::Rejected {
                path: path.to_string(),
                reason: "parent directory traversal",
            });
        }
        Ok(self.root.join(relative))
    }
}

impl ResourceProvider for FsResourceProvider {
    fn open(&self, path: &str) -> Result<Option<Box<dyn Read + Send + '_>>, ResourceError> {
        let absolute = self.resolve(path)?;
        if absolute.is_dir() {
            return Ok(None);
        }
        match File::open(&absolute) {
            Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ResourceError::io(path, err)),
        }
    }
}
