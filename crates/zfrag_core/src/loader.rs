//! Fragment loader contracts and implementations.
//!
//! # Responsibility
//! - Resolve a `remote-src` value to fragment HTML text.
//! - Surface load failures as typed errors the mount path can return,
//!   instead of letting them escape as opaque panics or silent drops.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};

pub type LoadResult<T> = Result<T, LoadError>;

/// Fragment load errors. Always carry the requested url.
#[derive(Debug)]
pub enum LoadError {
    NotFound(String),
    InvalidUrl { url: String, reason: String },
    Io {
        url: String,
        source: std::io::Error,
    },
    #[cfg(feature = "http")]
    Http {
        url: String,
        source: reqwest::Error,
    },
    Status { url: String, status: u16 },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(url) => write!(f, "fragment not found: {url}"),
            Self::InvalidUrl { url, reason } => {
                write!(f, "fragment url is invalid: {url} ({reason})")
            }
            Self::Io { url, source } => write!(f, "failed to read fragment {url}: {source}"),
            #[cfg(feature = "http")]
            Self::Http { url, source } => write!(f, "failed to fetch fragment {url}: {source}"),
            Self::Status { url, status } => {
                write!(f, "fragment request failed: {url} returned status {status}")
            }
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            #[cfg(feature = "http")]
            Self::Http { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Source of fragment text for component connect sequences.
pub trait FragmentLoader {
    fn load(&self, url: &str) -> LoadResult<String>;
}

/// Loader resolving urls as paths under a base directory.
pub struct FileFragmentLoader {
    base: PathBuf,
}

impl FileFragmentLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, url: &str) -> LoadResult<PathBuf> {
        let relative = url.trim_start_matches('/');
        if relative.is_empty() {
            return Err(LoadError::InvalidUrl {
                url: url.to_string(),
                reason: "empty path".to_string(),
            });
        }
        let path = Path::new(relative);
        // Escaping the base directory is always a caller bug.
        if path
            .components()
            .any(|part| matches!(part, Component::ParentDir | Component::RootDir))
        {
            return Err(LoadError::InvalidUrl {
                url: url.to_string(),
                reason: "path escapes the fragment base directory".to_string(),
            });
        }
        Ok(self.base.join(path))
    }
}

impl FragmentLoader for FileFragmentLoader {
    fn load(&self, url: &str) -> LoadResult<String> {
        let path = self.resolve(url)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(LoadError::NotFound(url.to_string()))
            }
            Err(source) => Err(LoadError::Io {
                url: url.to_string(),
                source,
            }),
        }
    }
}

/// In-memory loader for tests and embedded fragments.
#[derive(Debug, Default)]
pub struct StaticFragmentLoader {
    fragments: BTreeMap<String, String>,
}

impl StaticFragmentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.fragments.insert(url.into(), text.into());
        self
    }
}

impl FragmentLoader for StaticFragmentLoader {
    fn load(&self, url: &str) -> LoadResult<String> {
        self.fragments
            .get(url)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(url.to_string()))
    }
}

/// Blocking HTTP loader.
#[cfg(feature = "http")]
pub struct HttpFragmentLoader {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFragmentLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

#[cfg(feature = "http")]
impl Default for HttpFragmentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http")]
impl FragmentLoader for HttpFragmentLoader {
    fn load(&self, url: &str) -> LoadResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| LoadError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(|source| LoadError::Http {
            url: url.to_string(),
            source,
        })
    }
}
