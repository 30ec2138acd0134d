//! Serialized-phase fragment normalization.
//!
//! These are deliberately string-level rewrites over the full serialized
//! document: fragment normalization needs the complete synthesized id set,
//! and re-parsing for a second tree pass would be redundant.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::slug::to_fragment_id;

/// Matches `id="…"` attributes and fragment-only `href="#…"` values.
///
/// The optional trailing group detects the hidden original-id spans, whose
/// values must keep their pre-normalization form.
static FRAGMENT_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r##"(\s+)(id\s*="|href\s*="#)([^"]+)"( class="invisible-id")?"##)
        .expect("invalid fragment-value regex")
});

/// Matches an opening tag still carrying a `data-original-id` attribute.
static ORIGINAL_ID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r##"<([[:alnum:]]+)([^>]*?)\s*data-original-id\s*=\s*"([^"]+)"([^>]*)>"##)
        .expect("invalid original-id regex")
});

/// Rewrite fragment identifiers in serialized markup.
///
/// Two rewrites run in order:
/// 1. every `id` and fragment `href` value becomes its fragment-safe token
///    (see [`to_fragment_id`]), keeping internal links resolvable after
///    normalization;
/// 2. every element still carrying `data-original-id` loses the attribute
///    and gains a hidden `<span id="…" class="invisible-id">` first child,
///    so external links written against the pre-normalization ids keep
///    resolving.
///
/// Calling this on already-normalized markup is a no-op.
#[must_use]
pub fn normalize_fragments(html: &str) -> String {
    let normalized = FRAGMENT_VALUE.replace_all(html, |caps: &Captures| {
        if caps.get(4).is_some() {
            // Hidden original-id anchor - keep as-is.
            return caps[0].to_owned();
        }
        format!("{}{}{}\"", &caps[1], &caps[2], to_fragment_id(&caps[3]))
    });

    ORIGINAL_ID_TAG
        .replace_all(&normalized, |caps: &Captures| {
            format!(
                r##"<{}{}{}><span id="{}" class="invisible-id">#{}</span>"##,
                &caps[1], &caps[2], &caps[4], &caps[3], &caps[3]
            )
        })
        .into_owned()
}
