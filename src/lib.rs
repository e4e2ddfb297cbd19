//! # imgix-tags
//!
//! Framework-agnostic view helpers that generate `<img>`, responsive
//! `srcset`, and `<picture>` markup pointing at the [imgix](https://imgix.com)
//! image CDN. Feed it a small configuration mapping and an image path, get
//! back either a structured attribute set ([`ResolvedTag`]) for your
//! templating layer to serialize, or finished markup for the composed
//! `<picture>` case.
//!
//! ```
//! use imgix_tags::{ImgixConfig, Options, image_tag};
//!
//! let config = ImgixConfig::new("assets.imgix.net");
//! let mut options = Options::new();
//! options.insert("w".to_string(), 400.into());
//! options.insert("h".to_string(), 300.into());
//!
//! let tag = image_tag(&config, "image.jpg", &options).unwrap();
//! assert!(tag.src.starts_with("http://assets.imgix.net/image.jpg?ixlib="));
//! assert!(tag.src.ends_with("&h=300&w=400"));
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Settings bag, lazy validation, normalized [`ResolvedConfig`] descriptor |
//! | [`url`] | Hostname stripping, percent-encoding, host selection, query assembly, MD5 token signing |
//! | [`tag`] | Option partitioning, `ixlib` injection, alt derivation, the three tag operations |
//! | [`render`] | `<img>` / `<source>` serialization and `<picture>` composition |
//!
//! # Design Decisions
//!
//! ## Data Out, Not Framework Mixins
//!
//! The core never touches a web framework. Every operation is a pure
//! function from (configuration, path, options) to an immutable value; the
//! host's templating layer owns serialization and standard attribute
//! escaping. The one escaping exception is the `srcset` attribute value,
//! which is returned pre-escaped (`&` as `&amp;`) because that exact byte
//! shape is pinned by existing markup snapshots.
//!
//! ## Lazy, Per-Call Validation
//!
//! Configuration is validated at the first tag build, not at load time, and
//! then again on every call — a mutated settings bag takes effect on the
//! next call with nothing to invalidate. Callers wanting to validate once
//! hold a [`ResolvedConfig`] and build tags from it directly.
//!
//! ## Snapshot Compatibility Over Cleanliness
//!
//! Several behaviors are reproduced byte-for-byte even where they look like
//! artifacts: non-matching fully-qualified URLs become a percent-encoded
//! literal path segment, signed URLs with an empty query render `?&s=…`,
//! and derived alt text downcases everything after its first character.
//! Host applications have years of rendered markup and cached CDN URLs that
//! depend on these bytes.
//!
//! ## Explicit Library Identity
//!
//! The `ixlib` analytics parameter is built from the compile-time constants
//! [`LIBRARY_NAME`] and [`VERSION`] — no ambient global state, and tests can
//! compute expected strings from the same constants.

pub mod config;
pub mod render;
pub mod tag;
pub mod url;

pub use config::{ConfigurationError, ImgixConfig, LoadError, ResolvedConfig, SourceSetting};
pub use render::{render_img, render_source};
pub use tag::{
    OptionValue, Options, ResolvedTag, SrcsetEntry, image_tag, picture_tag, responsive_image_tag,
    responsive_image_tag_with_densities,
};

/// Integration name carried in the `ixlib` parameter.
pub const LIBRARY_NAME: &str = "rust";

/// Library version carried in the `ixlib` parameter.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
