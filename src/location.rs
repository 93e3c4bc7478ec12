//! Where bytes come from and go to.
//!
//! A location string is classified once, at the boundary:
//!
//! - `https://host/a.png`, `sftp://host/a.png`, `dfs://a.png` → [`Location::Remote`]
//! - `file:///tmp/a.png` → [`Location::Local`] (`/tmp/a.png`)
//! - anything else → [`Location::Local`]
//!
//! Code past the boundary matches on the variant and never re-inspects
//! prefixes.

use std::fmt;
use std::path::{Path, PathBuf};

/// A destination or source reached through a non-local scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    /// Lower-cased scheme without `://`.
    pub scheme: String,
    /// The full location as given.
    pub url: String,
}

impl RemoteLocation {
    /// Last path segment, ignoring any query string or fragment.
    pub fn file_name(&self) -> Option<&str> {
        let rest = self.url.split_once("://").map_or(self.url.as_str(), |(_, r)| r);
        let path = rest.split(['?', '#']).next().unwrap_or(rest);
        path.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(RemoteLocation),
}

fn scheme_of(s: &str) -> Option<&str> {
    let (scheme, _) = s.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

impl Location {
    pub fn parse(s: &str) -> Location {
        match scheme_of(s) {
            Some(scheme) if scheme.eq_ignore_ascii_case("file") => {
                Location::Local(PathBuf::from(&s[scheme.len() + 3..]))
            }
            Some(scheme) => Location::Remote(RemoteLocation {
                scheme: scheme.to_ascii_lowercase(),
                url: s.to_string(),
            }),
            None => Location::Local(PathBuf::from(s)),
        }
    }

    pub fn as_local(&self) -> Option<&Path> {
        match self {
            Location::Local(path) => Some(path),
            Location::Remote(_) => None,
        }
    }

    pub fn file_name(&self) -> Option<String> {
        match self {
            Location::Local(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            Location::Remote(remote) => remote.file_name().map(str::to_string),
        }
    }

    /// Lower-cased file extension, if the file name has one.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        Path::new(&name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Local(path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(remote) => f.write_str(&remote.url),
        }
    }
}
