//! Reading bytes from, and publishing files to, a [`Location`].
//!
//! Local paths go through `std::fs`. `http(s)` uses a blocking `reqwest`
//! client: `GET` to fetch, `PUT` to publish. Any other scheme can only be
//! published, through a per-scheme command template from the config:
//!
//! ```toml
//! [publish.commands]
//! sftp = "scp {local} {path}"
//! ```
//!
//! Template variables: `{local}` (staged file), `{remote}` (full URL),
//! `{path}` (URL without the scheme), `{name}` (remote file name).

use super::{ExternalError, fill_template, run_command};
use crate::location::{Location, RemoteLocation};
use log::{debug, info};
use reqwest::blocking::Client;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub trait ByteSource {
    fn fetch(&self, location: &Location) -> Result<Vec<u8>, ExternalError>;
}

pub trait Publisher {
    /// Copy the staged file at `local` to `remote`.
    fn publish(&self, local: &Path, remote: &RemoteLocation) -> Result<(), ExternalError>;
}

fn is_http(scheme: &str) -> bool {
    matches!(scheme, "http" | "https")
}

fn http_client() -> Result<Client, ExternalError> {
    Ok(Client::builder()
        .user_agent(concat!("easyimg/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Local files and `http(s)` URLs.
#[derive(Debug, Default)]
pub struct DefaultByteSource;

impl ByteSource for DefaultByteSource {
    fn fetch(&self, location: &Location) -> Result<Vec<u8>, ExternalError> {
        match location {
            Location::Local(path) => Ok(fs::read(path)?),
            Location::Remote(remote) if is_http(&remote.scheme) => {
                debug!("GET {}", remote.url);
                let response = http_client()?.get(&remote.url).send()?.error_for_status()?;
                Ok(response.bytes()?.to_vec())
            }
            Location::Remote(remote) => Err(ExternalError::UnsupportedScheme(remote.scheme.clone())),
        }
    }
}

/// Publishes through configured command templates, falling back to HTTP `PUT`.
#[derive(Debug, Default)]
pub struct CommandPublisher {
    commands: BTreeMap<String, String>,
}

impl CommandPublisher {
    pub fn new(commands: BTreeMap<String, String>) -> Self {
        Self { commands }
    }

    /// Program and arguments for `remote`, if a template is configured.
    ///
    /// The template is split on whitespace before substitution, so a path
    /// with spaces stays one argument.
    pub fn command_line(&self, local: &Path, remote: &RemoteLocation) -> Option<Vec<String>> {
        let template = self.commands.get(&remote.scheme)?;
        let local = local.to_string_lossy();
        let path = remote
            .url
            .split_once("://")
            .map_or(remote.url.as_str(), |(_, rest)| rest);
        let name = remote.file_name().unwrap_or_default();
        let vars = [
            ("local", local.as_ref()),
            ("remote", remote.url.as_str()),
            ("path", path),
            ("name", name),
        ];
        let argv: Vec<String> = template
            .split_whitespace()
            .map(|token| fill_template(token, &vars))
            .collect();
        (!argv.is_empty()).then_some(argv)
    }
}

impl Publisher for CommandPublisher {
    fn publish(&self, local: &Path, remote: &RemoteLocation) -> Result<(), ExternalError> {
        if let Some(argv) = self.command_line(local, remote) {
            info!("Publishing {} via {}", remote.url, argv[0]);
            run_command(&argv[0], &argv[1..])?;
            return Ok(());
        }
        if is_http(&remote.scheme) {
            info!("Publishing {} via PUT", remote.url);
            let body = fs::read(local)?;
            http_client()?
                .put(&remote.url)
                .body(body)
                .send()?
                .error_for_status()?;
            return Ok(());
        }
        Err(ExternalError::UnsupportedScheme(remote.scheme.clone()))
    }
}
