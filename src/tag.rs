//! Tag building: option partitioning, `ixlib` injection, alt-text
//! derivation, and the three tag operations (`image_tag`,
//! `responsive_image_tag`, `picture_tag`).
//!
//! Each operation is a pure function of its inputs plus the configuration:
//! it resolves the configuration (validating it afresh on every call),
//! builds one or more CDN URLs through [`crate::url`], and returns an
//! immutable [`ResolvedTag`] attribute set — or, for the picture case,
//! composed markup — for the host's templating layer to serialize.
//!
//! ## Option routing
//!
//! The caller supplies a single options mapping. A fixed allow-list of HTML
//! attribute names (`alt` plus the standard `<img>` attributes, and any
//! `data-`/`aria-` key) routes entries to pass-through HTML attributes;
//! everything else is a CDN parameter. `width`, `height`, and `sizes` are
//! deliberately not on the list — they are legitimate imgix parameter names.
//!
//! ## Parameter order
//!
//! `ixlib` first, remaining CDN parameters sorted by key, `dpr` last for
//! srcset variants. This order is pinned by existing markup snapshots.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{ConfigurationError, ImgixConfig, ResolvedConfig};
use crate::render;
use crate::url;
use crate::{LIBRARY_NAME, VERSION};

/// Option keys routed to pass-through HTML attributes instead of the CDN.
const HTML_PASSTHROUGH_ATTRIBUTES: &[&str] = &[
    "alt",
    "class",
    "crossorigin",
    "decoding",
    "draggable",
    "id",
    "ismap",
    "loading",
    "longdesc",
    "referrerpolicy",
    "style",
    "title",
    "usemap",
];

/// Pixel-density multipliers used when the caller does not override them:
/// a 1x entry and a 2x entry, in that order.
const DEFAULT_DENSITIES: &[u32] = &[1, 2];

/// A single option value: CDN parameters take numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Str(s) => f.write_str(s),
            OptionValue::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(value as i64)
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Int(value as i64)
    }
}

/// The caller-supplied options mapping, partitioned by key during the build.
///
/// A `BTreeMap` so CDN parameters come out sorted by key with no extra work.
pub type Options = BTreeMap<String, OptionValue>;

/// One `url descriptor` pair of a `srcset` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetEntry {
    pub url: String,
    /// Density descriptor, e.g. `"2x"`.
    pub descriptor: String,
}

/// The finished attribute set for one tag, immutable once built.
///
/// The host's templating layer owns standard attribute escaping; the one
/// exception is [`srcset_attr`](Self::srcset_attr), which returns the
/// already entity-escaped attribute value (`&` as `&amp;`). `src` is never
/// entity-escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTag {
    /// The (possibly signed) CDN URL.
    pub src: String,
    /// Ordered srcset variants; `None` for single-source tags.
    pub srcset: Option<Vec<SrcsetEntry>>,
    /// Caller-supplied or derived alternative text.
    pub alt: String,
    /// Pass-through HTML attributes other than `alt`.
    pub extra_attributes: BTreeMap<String, String>,
}

impl ResolvedTag {
    /// The joined, entity-escaped `srcset` attribute value.
    ///
    /// Entries are joined by `", "` and ampersands become `&amp;`, matching
    /// the markup snapshots this library is pinned to.
    pub fn srcset_attr(&self) -> Option<String> {
        self.srcset.as_ref().map(|entries| {
            let joined = entries
                .iter()
                .map(|entry| format!("{} {}", entry.url, entry.descriptor))
                .collect::<Vec<_>>()
                .join(", ");
            render::escape_attribute(&joined)
        })
    }
}

fn is_html_attribute(key: &str) -> bool {
    HTML_PASSTHROUGH_ATTRIBUTES.contains(&key)
        || key.starts_with("data-")
        || key.starts_with("aria-")
}

/// Split the options mapping into CDN parameters (sorted by key) and
/// pass-through HTML attributes. Unrecognized keys default to CDN
/// parameters.
fn partition(options: &Options) -> (Vec<(String, String)>, BTreeMap<String, String>) {
    let mut cdn = Vec::new();
    let mut html = BTreeMap::new();
    for (key, value) in options {
        if is_html_attribute(key) {
            html.insert(key.clone(), value.to_string());
        } else {
            cdn.push((key.clone(), value.to_string()));
        }
    }
    (cdn, html)
}

/// Assemble the ordered CDN parameter list: `ixlib` first (unless
/// disabled), then the sorted caller parameters, then `dpr` last.
fn request_params(
    config: &ResolvedConfig,
    cdn: &[(String, String)],
    dpr: Option<u32>,
) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(cdn.len() + 2);
    if config.include_library_param {
        params.push(("ixlib".to_string(), format!("{LIBRARY_NAME}-{VERSION}")));
    }
    params.extend(cdn.iter().cloned());
    if let Some(density) = dpr {
        params.push(("dpr".to_string(), density.to_string()));
    }
    params
}

/// Uppercase the first ASCII character and lowercase the rest, matching the
/// capitalization existing markup snapshots were generated with.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => {
            first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
        }
        None => String::new(),
    }
}

/// Derive the default `alt` attribute from the finished src URL.
///
/// Takes the final path segment of the src, strips everything from the last
/// `.` onward, turns dashes into spaces, and capitalizes. Because the src
/// normally ends in `ixlib=<name>-<maj>.<min>.<patch>[&…]`, the strip
/// removes `.<patch>` together with any trailing parameters, leaving a
/// truncated `<maj>.<min>` library marker:
///
/// - `…/image.jpg?ixlib=rust-0.1.0&h=300` → `"Image.jpg?ixlib=rust 0.1"`
/// - `…/users/1.png?&s=3d97…` → `"1"`
/// - `…/https%3A%2F%2Fother.com%2Fa.jpg?ixlib=rust-0.1.0` →
///   `"Https%3a%2f%2fother.com%2fa.jpg?ixlib=rust 0.1"`
fn derive_alt(src: &str) -> String {
    let basename = src.rsplit('/').next().unwrap_or(src);
    let stem = match basename.rfind('.') {
        Some(position) if position > 0 => &basename[..position],
        _ => basename,
    };
    capitalize(&stem.replace('-', " "))
}

impl ResolvedConfig {
    /// Build a single-source image tag from an already-resolved descriptor.
    pub fn image_tag(&self, path: &str, options: &Options) -> ResolvedTag {
        let (cdn, mut html) = partition(options);
        let src = url::build_url(self, path, &request_params(self, &cdn, None));
        let alt = html.remove("alt").unwrap_or_else(|| derive_alt(&src));
        ResolvedTag {
            src,
            srcset: None,
            alt,
            extra_attributes: html,
        }
    }

    /// Build a responsive image tag with the default 1x/2x densities.
    pub fn responsive_image_tag(&self, path: &str, options: &Options) -> ResolvedTag {
        self.responsive_image_tag_with_densities(path, options, DEFAULT_DENSITIES)
    }

    /// Build a responsive image tag with caller-chosen density multipliers.
    ///
    /// Densities keep the caller's order. A density of 1 reuses the plain
    /// src (no `dpr` parameter); any other density builds a fresh URL with
    /// `dpr=<n>` as the final parameter, so signed variants verify.
    pub fn responsive_image_tag_with_densities(
        &self,
        path: &str,
        options: &Options,
        densities: &[u32],
    ) -> ResolvedTag {
        let (cdn, mut html) = partition(options);
        let src = url::build_url(self, path, &request_params(self, &cdn, None));
        let srcset = densities
            .iter()
            .map(|&density| SrcsetEntry {
                url: if density == 1 {
                    src.clone()
                } else {
                    url::build_url(self, path, &request_params(self, &cdn, Some(density)))
                },
                descriptor: format!("{density}x"),
            })
            .collect();
        let alt = html.remove("alt").unwrap_or_else(|| derive_alt(&src));
        ResolvedTag {
            src,
            srcset: Some(srcset),
            alt,
            extra_attributes: html,
        }
    }

    /// Build `<picture>` markup: one `<source>` (responsive rules) followed
    /// by one `<img>` (single-source rules).
    pub fn picture_tag(&self, path: &str, options: &Options) -> String {
        let responsive = self.responsive_image_tag(path, options);
        let image = self.image_tag(path, options);
        render::picture(&responsive, &image).into_string()
    }
}

/// Build a single-source image tag, resolving (and re-validating) the
/// configuration for this call.
pub fn image_tag(
    config: &ImgixConfig,
    path: &str,
    options: &Options,
) -> Result<ResolvedTag, ConfigurationError> {
    Ok(config.resolve()?.image_tag(path, options))
}

/// Build a responsive image tag with the default 1x/2x srcset.
pub fn responsive_image_tag(
    config: &ImgixConfig,
    path: &str,
    options: &Options,
) -> Result<ResolvedTag, ConfigurationError> {
    Ok(config.resolve()?.responsive_image_tag(path, options))
}

/// Build a responsive image tag with caller-chosen density multipliers.
pub fn responsive_image_tag_with_densities(
    config: &ImgixConfig,
    path: &str,
    options: &Options,
    densities: &[u32],
) -> Result<ResolvedTag, ConfigurationError> {
    Ok(config
        .resolve()?
        .responsive_image_tag_with_densities(path, options, densities))
}

/// Build composed `<picture>` markup.
pub fn picture_tag(
    config: &ImgixConfig,
    path: &str,
    options: &Options,
) -> Result<String, ConfigurationError> {
    Ok(config.resolve()?.picture_tag(path, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(pairs: &[(&str, OptionValue)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn truncated_version() -> String {
        let parts: Vec<&str> = VERSION.split('.').collect();
        format!("{}.{}", parts[0], parts[1])
    }

    // =========================================================================
    // Option partitioning
    // =========================================================================

    #[test]
    fn unrecognized_keys_are_cdn_params() {
        let (cdn, html) = partition(&opts(&[
            ("w", 400.into()),
            ("h", 300.into()),
            ("fit", "crop".into()),
        ]));
        assert_eq!(
            cdn,
            vec![
                ("fit".to_string(), "crop".to_string()),
                ("h".to_string(), "300".to_string()),
                ("w".to_string(), "400".to_string()),
            ]
        );
        assert!(html.is_empty());
    }

    #[test]
    fn allow_listed_keys_are_html_attributes() {
        let (cdn, html) = partition(&opts(&[
            ("alt", "A caption".into()),
            ("class", "thumb".into()),
            ("data-caption", "x".into()),
            ("aria-hidden", "true".into()),
            ("w", 400.into()),
        ]));
        assert_eq!(cdn, vec![("w".to_string(), "400".to_string())]);
        assert_eq!(html.get("alt").unwrap(), "A caption");
        assert_eq!(html.get("class").unwrap(), "thumb");
        assert_eq!(html.get("data-caption").unwrap(), "x");
        assert_eq!(html.get("aria-hidden").unwrap(), "true");
    }

    #[test]
    fn width_and_height_are_cdn_params_not_attributes() {
        // They collide with imgix parameter names, so they go to the CDN.
        let (cdn, html) = partition(&opts(&[("width", 400.into()), ("height", 300.into())]));
        assert_eq!(cdn.len(), 2);
        assert!(html.is_empty());
    }

    // =========================================================================
    // image_tag
    // =========================================================================

    #[test]
    fn plain_image_tag() {
        let tag = image_tag(&ImgixConfig::new("assets.imgix.net"), "image.jpg", &Options::new())
            .unwrap();
        assert_eq!(
            tag.src,
            format!("http://assets.imgix.net/image.jpg?ixlib={LIBRARY_NAME}-{VERSION}")
        );
        assert_eq!(
            tag.alt,
            format!("Image.jpg?ixlib={LIBRARY_NAME} {}", truncated_version())
        );
        assert!(tag.srcset.is_none());
        assert!(tag.extra_attributes.is_empty());
    }

    #[test]
    fn library_param_is_on_by_default() {
        let tag = image_tag(&ImgixConfig::new("assets.imgix.net"), "image.jpg", &Options::new())
            .unwrap();
        assert!(tag.src.contains(&format!("ixlib={LIBRARY_NAME}-")));
    }

    #[test]
    fn library_param_can_be_disabled() {
        let config = ImgixConfig {
            include_library_param: Some(false),
            ..ImgixConfig::new("assets.imgix.net")
        };
        let tag = image_tag(&config, "image.jpg", &Options::new()).unwrap();
        assert_eq!(tag.src, "http://assets.imgix.net/image.jpg");
        assert_eq!(tag.alt, "Image");
    }

    #[test]
    fn cdn_params_follow_ixlib_sorted() {
        let config = ImgixConfig::new("assets.imgix.net");
        let tag = image_tag(&config, "image.jpg", &opts(&[("w", 400.into()), ("h", 300.into())]))
            .unwrap();
        assert_eq!(
            tag.src,
            format!("http://assets.imgix.net/image.jpg?ixlib={LIBRARY_NAME}-{VERSION}&h=300&w=400")
        );
    }

    #[test]
    fn explicit_alt_wins_over_derived() {
        let config = ImgixConfig::new("assets.imgix.net");
        let tag = image_tag(
            &config,
            "image.jpg",
            &opts(&[("alt", "No Church in the Wild".into()), ("w", 400.into())]),
        )
        .unwrap();
        assert_eq!(tag.alt, "No Church in the Wild");
        // alt must not leak into the query string
        assert!(!tag.src.contains("alt="));
    }

    #[test]
    fn configuration_errors_propagate() {
        let err = image_tag(&ImgixConfig::default(), "image.jpg", &Options::new()).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingSource);
    }

    #[test]
    fn signed_tag_matches_known_fixture() {
        let config = ImgixConfig {
            secure_url_token: Some("FOO123bar".to_string()),
            include_library_param: Some(false),
            ..ImgixConfig::new("assets.imgix.net")
        };
        let tag = image_tag(&config, "/users/1.png", &Options::new()).unwrap();
        assert_eq!(
            tag.src,
            "http://assets.imgix.net/users/1.png?&s=3d97566c016f6e1e6679bf981941e6f4"
        );
        assert_eq!(tag.alt, "1");
    }

    #[test]
    fn hostname_stripping_applies() {
        let config = ImgixConfig {
            hostname_to_replace: Some("s3.amazonaws.com".to_string()),
            ..ImgixConfig::new("assets.imgix.net")
        };
        let tag = image_tag(
            &config,
            "https://s3.amazonaws.com/image.jpg",
            &opts(&[("w", 400.into()), ("h", 300.into())]),
        )
        .unwrap();
        assert_eq!(
            tag.src,
            format!("http://assets.imgix.net/image.jpg?ixlib={LIBRARY_NAME}-{VERSION}&h=300&w=400")
        );
    }

    #[test]
    fn unmatched_hostname_passes_through_encoded() {
        let config = ImgixConfig {
            hostname_to_replace: Some("s3.amazonaws.com".to_string()),
            ..ImgixConfig::new("assets.imgix.net")
        };
        let tag = image_tag(
            &config,
            "https://adifferenthostname.com/image.jpg",
            &Options::new(),
        )
        .unwrap();
        assert_eq!(
            tag.src,
            format!(
                "http://assets.imgix.net/https%3A%2F%2Fadifferenthostname.com%2Fimage.jpg?ixlib={LIBRARY_NAME}-{VERSION}"
            )
        );
        // Ruby-style capitalize downcases the encoded remainder.
        assert_eq!(
            tag.alt,
            format!(
                "Https%3a%2f%2fadifferenthostname.com%2fimage.jpg?ixlib={LIBRARY_NAME} {}",
                truncated_version()
            )
        );
    }

    // =========================================================================
    // Alt derivation
    // =========================================================================

    #[test]
    fn derive_alt_truncates_version_and_params() {
        assert_eq!(
            derive_alt("http://assets.imgix.net/image.jpg?ixlib=rust-0.1.0&h=300&w=400"),
            "Image.jpg?ixlib=rust 0.1"
        );
    }

    #[test]
    fn derive_alt_without_query() {
        assert_eq!(derive_alt("http://assets.imgix.net/image.jpg"), "Image");
        assert_eq!(derive_alt("http://assets.imgix.net/logo"), "Logo");
    }

    #[test]
    fn derive_alt_dashes_become_spaces() {
        assert_eq!(derive_alt("http://assets.imgix.net/my-photo.jpg"), "My photo");
    }

    #[test]
    fn capitalize_downcases_remainder() {
        assert_eq!(capitalize("hTTps%3A"), "Https%3a");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("1"), "1");
    }

    // =========================================================================
    // responsive_image_tag
    // =========================================================================

    #[test]
    fn responsive_default_is_1x_then_2x() {
        let config = ImgixConfig::new("assets.imgix.net");
        let tag = responsive_image_tag(&config, "image.jpg", &Options::new()).unwrap();
        let entries = tag.srcset.as_ref().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].descriptor, "1x");
        assert_eq!(
            entries[0].url,
            format!("http://assets.imgix.net/image.jpg?ixlib={LIBRARY_NAME}-{VERSION}")
        );
        assert_eq!(entries[1].descriptor, "2x");
        assert_eq!(
            entries[1].url,
            format!("http://assets.imgix.net/image.jpg?ixlib={LIBRARY_NAME}-{VERSION}&dpr=2")
        );
        assert_eq!(tag.src, entries[0].url);
    }

    #[test]
    fn srcset_attr_joins_and_escapes_ampersands() {
        let config = ImgixConfig::new("assets.imgix.net");
        let tag = responsive_image_tag(&config, "image.jpg", &Options::new()).unwrap();
        assert_eq!(
            tag.srcset_attr().unwrap(),
            format!(
                "http://assets.imgix.net/image.jpg?ixlib={LIBRARY_NAME}-{VERSION} 1x, \
                 http://assets.imgix.net/image.jpg?ixlib={LIBRARY_NAME}-{VERSION}&amp;dpr=2 2x"
            )
        );
        // src stays unescaped
        assert!(!tag.src.contains("&amp;"));
    }

    #[test]
    fn custom_densities_keep_caller_order() {
        let config = ImgixConfig::new("assets.imgix.net");
        let tag = responsive_image_tag_with_densities(
            &config,
            "image.jpg",
            &Options::new(),
            &[3, 1, 2],
        )
        .unwrap();
        let entries = tag.srcset.as_ref().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].descriptor, "3x");
        assert!(entries[0].url.ends_with("&dpr=3"));
        assert_eq!(entries[1].descriptor, "1x");
        assert!(!entries[1].url.contains("dpr="));
        assert_eq!(entries[2].descriptor, "2x");
        assert!(entries[2].url.ends_with("&dpr=2"));
    }

    #[test]
    fn responsive_dpr_comes_after_sorted_params() {
        let config = ImgixConfig::new("assets.imgix.net");
        let tag = responsive_image_tag(
            &config,
            "image.jpg",
            &opts(&[("w", 400.into()), ("h", 300.into())]),
        )
        .unwrap();
        let two_x = &tag.srcset.as_ref().unwrap()[1];
        assert_eq!(
            two_x.url,
            format!(
                "http://assets.imgix.net/image.jpg?ixlib={LIBRARY_NAME}-{VERSION}&h=300&w=400&dpr=2"
            )
        );
    }

    #[test]
    fn signed_responsive_variants_sign_dpr() {
        let config = ImgixConfig {
            secure_url_token: Some("FOO123bar".to_string()),
            include_library_param: Some(false),
            ..ImgixConfig::new("assets.imgix.net")
        };
        let tag = responsive_image_tag(&config, "/users/1.png", &Options::new()).unwrap();
        let entries = tag.srcset.as_ref().unwrap();
        // Each density is signed over its own query, so the signatures differ.
        let sig_1x = entries[0].url.rsplit("&s=").next().unwrap().to_string();
        let sig_2x = entries[1].url.rsplit("&s=").next().unwrap().to_string();
        assert_ne!(sig_1x, sig_2x);
        assert!(entries[1].url.contains("dpr=2&s="));
    }

    // =========================================================================
    // picture_tag
    // =========================================================================

    #[test]
    fn picture_nests_source_then_img() {
        let config = ImgixConfig::new("assets.imgix.net");
        let markup = picture_tag(&config, "image.jpg", &Options::new()).unwrap();
        assert!(markup.starts_with("<picture><source srcset=\""));
        assert!(markup.ends_with("/></picture>"));
        let source_at = markup.find("<source").unwrap();
        let img_at = markup.find("<img").unwrap();
        assert!(source_at < img_at);
    }

    #[test]
    fn picture_matches_expected_markup() {
        let config = ImgixConfig::new("assets.imgix.net");
        let markup = picture_tag(&config, "image.jpg", &Options::new()).unwrap();
        let base = format!("http://assets.imgix.net/image.jpg?ixlib={LIBRARY_NAME}-{VERSION}");
        let expected = format!(
            "<picture><source srcset=\"{base} 1x, {base}&amp;dpr=2 2x\" />\
             <img src=\"{base}\" alt=\"Image.jpg?ixlib={LIBRARY_NAME} {}\" /></picture>",
            truncated_version()
        );
        assert_eq!(markup, expected);
    }
}
