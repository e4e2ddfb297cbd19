//! imgix configuration: the settings bag, lazy validation, and the
//! normalized client descriptor.
//!
//! Host applications expose their imgix settings as a small mapping,
//! conventionally under an `imgix` key. [`ImgixConfig`] accepts that mapping
//! as-is — both snake_case and camelCase key spellings parse — and defers all
//! validation to [`ImgixConfig::resolve`], which every tag-building call runs.
//! A misconfigured `source` therefore surfaces at the first tag build, not at
//! load time, and configuration edits take effect on the next call without
//! any cache to invalidate. Callers that want to pay the validation cost once
//! can hold on to the returned [`ResolvedConfig`] and build tags from that.
//!
//! ## Configuration Options
//!
//! ```toml
//! # Required. A single source hostname, or an array of hostnames.
//! source = "assets.imgix.net"
//!
//! # Optional shared secret; enables MD5 token signing of generated URLs.
//! secure_url_token = "FACEBEEF"
//!
//! # Emit the ixlib analytics parameter (default true).
//! include_library_param = true
//!
//! # Hostnames stripped from fully-qualified input URLs before substitution.
//! hostname_to_replace = "s3.amazonaws.com"
//! hostnames_to_replace = ["s3-us-west-2.amazonaws.com"]
//!
//! # Generate https:// URLs instead of http:// (default false).
//! use_https = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Fatal misconfiguration, raised synchronously at the first tag build.
///
/// The two messages are stable strings relied upon by host applications
/// (typically surfaced at boot or on the first request); do not reword them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("imgix source is not configured. Please set config.imgix[:source].")]
    MissingSource,
    #[error("imgix source must be a String or an Array.")]
    InvalidSource,
}

/// Failure to read or parse a configuration file or document.
///
/// Distinct from [`ConfigurationError`]: these are I/O and syntax problems in
/// the loading helpers, not semantic misconfiguration of the imgix settings.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The `source` setting as the host application wrote it.
///
/// Untagged so a plain string, an array of strings, and anything else all
/// deserialize successfully; the `Invalid` arm preserves wrong-typed values
/// (an integer, a mixed array) so that rejection happens lazily in
/// [`ImgixConfig::resolve`] with the stable error message, not as an opaque
/// parse error at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceSetting {
    One(String),
    Many(Vec<String>),
    Invalid(serde_json::Value),
}

impl From<&str> for SourceSetting {
    fn from(host: &str) -> Self {
        SourceSetting::One(host.to_string())
    }
}

impl From<String> for SourceSetting {
    fn from(host: String) -> Self {
        SourceSetting::One(host)
    }
}

impl From<Vec<String>> for SourceSetting {
    fn from(hosts: Vec<String>) -> Self {
        SourceSetting::Many(hosts)
    }
}

/// Per-application imgix settings, exactly as the host supplied them.
///
/// All fields are optional at this layer; [`resolve`](Self::resolve) decides
/// what is actually required. Every field accepts its camelCase spelling as
/// an alias, so settings exported from JavaScript-shaped config files parse
/// unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImgixConfig {
    /// Source hostname(s) images are served from. Required; a string or an
    /// array of strings. Anything else is a [`ConfigurationError`] at the
    /// first tag build.
    pub source: Option<SourceSetting>,
    /// Shared secret for MD5 URL signing. Absent means unsigned URLs.
    #[serde(alias = "secureUrlToken")]
    pub secure_url_token: Option<String>,
    /// Whether to append the `ixlib` analytics parameter. Defaults to true.
    #[serde(alias = "includeLibraryParam")]
    pub include_library_param: Option<bool>,
    /// A single hostname to strip from fully-qualified input URLs.
    #[serde(alias = "hostnameToReplace")]
    pub hostname_to_replace: Option<String>,
    /// Additional hostnames to strip; merged with the singular form.
    #[serde(alias = "hostnamesToReplace")]
    pub hostnames_to_replace: Option<Vec<String>>,
    /// Generate `https://` URLs. Defaults to false (`http://`).
    #[serde(alias = "useHttps")]
    pub use_https: Option<bool>,
}

impl ImgixConfig {
    /// Minimal configuration with a single source host and all defaults.
    pub fn new(source: impl Into<SourceSetting>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse configuration from a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Validate the settings bag and produce the normalized descriptor.
    ///
    /// Deterministic and side-effect free: the same input always yields the
    /// same descriptor or the same error. Tag-building operations call this
    /// on every invocation, so configuration is re-validated each time.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigurationError> {
        let sources = match &self.source {
            None => return Err(ConfigurationError::MissingSource),
            Some(SourceSetting::One(host)) => vec![host.clone()],
            Some(SourceSetting::Many(hosts)) if !hosts.is_empty() => hosts.clone(),
            // Wrong-typed values and empty arrays alike: no usable host.
            Some(_) => return Err(ConfigurationError::InvalidSource),
        };

        let mut hostnames_to_replace = Vec::new();
        if let Some(hostname) = &self.hostname_to_replace {
            hostnames_to_replace.push(hostname.clone());
        }
        if let Some(hostnames) = &self.hostnames_to_replace {
            hostnames_to_replace.extend(hostnames.iter().cloned());
        }

        Ok(ResolvedConfig {
            sources,
            secure_url_token: self.secure_url_token.clone(),
            include_library_param: self.include_library_param.unwrap_or(true),
            hostnames_to_replace,
            use_https: self.use_https.unwrap_or(false),
        })
    }
}

/// Normalized, validated client descriptor.
///
/// Produced by [`ImgixConfig::resolve`]. `sources` is always non-empty, and
/// the singular/plural hostname-stripping settings are merged into one list
/// (singular first). Holding one of these is the explicit opt-in to caching
/// validation across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Source hostnames; URL construction picks one deterministically per path.
    pub sources: Vec<String>,
    /// Shared secret for MD5 URL signing, if configured.
    pub secure_url_token: Option<String>,
    /// Whether generated URLs carry the `ixlib` analytics parameter.
    pub include_library_param: bool,
    /// Hostnames stripped from fully-qualified input URLs (exact match).
    pub hostnames_to_replace: Vec<String>,
    /// Scheme for generated URLs: `https` when true, `http` otherwise.
    pub use_https: bool,
}

impl ResolvedConfig {
    /// Scheme prefix for generated URLs.
    pub fn scheme(&self) -> &'static str {
        if self.use_https { "https" } else { "http" }
    }
}
