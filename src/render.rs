//! Markup serialization for [`ResolvedTag`](crate::tag::ResolvedTag).
//!
//! The library's contract is to return data; these helpers exist for hosts
//! without a templating layer of their own and for the `<picture>` case,
//! which composes two nested elements. Tags are emitted in the XHTML
//! self-closing style (`<img … />`) existing markup snapshots use.
//!
//! Escaping split: `alt` and pass-through attributes are HTML-escaped here
//! (maud's escaper). `srcset` arrives pre-escaped from
//! [`srcset_attr`](crate::tag::ResolvedTag::srcset_attr) and is written
//! through untouched. `src` is written verbatim: it is either a URL this
//! library percent-encoded itself, or the intentional byte-for-byte
//! passthrough of the caller's input, and entity-escaping its ampersands
//! would diverge from the pinned snapshots.

use maud::{Escaper, Markup, PreEscaped, html};
use std::fmt::Write;

use crate::tag::ResolvedTag;

/// HTML-escape an attribute value (`&` `<` `>` `"`).
pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    // Writing into a String cannot fail.
    let _ = Escaper::new(&mut escaped).write_str(value);
    escaped
}

/// Render `<img … />` markup for a tag.
///
/// Attribute order: `srcset` (when present), `src`, `alt`, then the
/// pass-through attributes sorted by name.
pub fn render_img(tag: &ResolvedTag) -> Markup {
    let mut attrs = String::new();
    if let Some(srcset) = tag.srcset_attr() {
        let _ = write!(attrs, " srcset=\"{srcset}\"");
    }
    let _ = write!(attrs, " src=\"{}\"", tag.src);
    let _ = write!(attrs, " alt=\"{}\"", escape_attribute(&tag.alt));
    for (name, value) in &tag.extra_attributes {
        let _ = write!(attrs, " {name}=\"{}\"", escape_attribute(value));
    }
    PreEscaped(format!("<img{attrs} />"))
}

/// Render `<source srcset="…" />` markup from a tag's srcset variants.
pub fn render_source(tag: &ResolvedTag) -> Markup {
    match tag.srcset_attr() {
        Some(srcset) => PreEscaped(format!("<source srcset=\"{srcset}\" />")),
        None => PreEscaped("<source />".to_string()),
    }
}

/// Compose `<picture>` markup: the responsive tag's `<source>` followed by
/// the single-source `<img>`.
pub(crate) fn picture(responsive: &ResolvedTag, image: &ResolvedTag) -> Markup {
    html! {
        picture {
            (render_source(responsive))
            (render_img(image))
        }
    }
}
