//! Fragment-safe identifier derivation.
//!
//! The slug rule is part of the external URL contract: inbound links are
//! written against these tokens, so the derivation (diacritic stripping,
//! punctuation collapse, lowercase) must stay stable.

/// Derive a fragment-safe token from a display identifier.
///
/// Diacritics are stripped, runs of non-alphanumeric characters collapse
/// to a single `_`, and the result is lowercased. Applying the function to
/// its own output is a no-op.
///
/// ```
/// use vd_postprocess::to_fragment_id;
///
/// assert_eq!(to_fragment_id("Foo Bar"), "foo_bar");
/// assert_eq!(to_fragment_id("Útok zblízka"), "utok_zblizka");
/// assert_eq!(to_fragment_id("foo_bar"), "foo_bar");
/// ```
#[must_use]
pub fn to_fragment_id(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_separator = false;

    let push = |base: char, out: &mut String, pending: &mut bool| {
        if *pending && !out.is_empty() {
            out.push('_');
        }
        *pending = false;
        out.push(base.to_ascii_lowercase());
    };

    for ch in value.chars() {
        if let Some(mapped) = strip_diacritic(ch) {
            for base in mapped.chars() {
                push(base, &mut out, &mut pending_separator);
            }
        } else if ch.is_ascii_alphanumeric() {
            push(ch, &mut out, &mut pending_separator);
        } else {
            pending_separator = true;
        }
    }

    out
}

/// Map an accented Latin letter to its base form.
///
/// Covers Latin-1 and the Latin-2 letters used by Czech and its neighbors.
fn strip_diacritic(ch: char) -> Option<&'static str> {
    let base = match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' | 'ą' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ą' => "a",
        'č' | 'ç' | 'ć' | 'Č' | 'Ç' | 'Ć' => "c",
        'ď' | 'Ď' => "d",
        'é' | 'è' | 'ê' | 'ë' | 'ě' | 'ę' | 'É' | 'È' | 'Ê' | 'Ë' | 'Ě' | 'Ę' => "e",
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => "i",
        'ľ' | 'ĺ' | 'ł' | 'Ľ' | 'Ĺ' | 'Ł' => "l",
        'ň' | 'ñ' | 'ń' | 'Ň' | 'Ñ' | 'Ń' => "n",
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'ř' | 'ŕ' | 'Ř' | 'Ŕ' => "r",
        'š' | 'ś' | 'Š' | 'Ś' => "s",
        'ť' | 'Ť' => "t",
        'ú' | 'ù' | 'û' | 'ü' | 'ů' | 'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ů' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        'ž' | 'ź' | 'ż' | 'Ž' | 'Ź' | 'Ż' => "z",
        'æ' | 'Æ' => "ae",
        'ß' => "ss",
        _ => return None,
    };
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slug() {
        assert_eq!(to_fragment_id("Foo Bar"), "foo_bar");
        assert_eq!(to_fragment_id("Boj beze zbraně"), "boj_beze_zbrane");
    }

    #[test]
    fn test_diacritics_stripped() {
        assert_eq!(to_fragment_id("Přehled úprav"), "prehled_uprav");
        assert_eq!(to_fragment_id("ŠKOLA"), "skola");
    }

    #[test]
    fn test_punctuation_collapsed() {
        assert_eq!(to_fragment_id("a, b; c!"), "a_b_c");
        assert_eq!(
            to_fragment_id("  leading and trailing  "),
            "leading_and_trailing"
        );
    }

    #[test]
    fn test_idempotent() {
        for input in ["Foo Bar", "Útok", "already_safe_1"] {
            let once = to_fragment_id(input);
            assert_eq!(to_fragment_id(&once), once);
        }
    }

    #[test]
    fn test_empty_and_symbol_only() {
        assert_eq!(to_fragment_id(""), "");
        assert_eq!(to_fragment_id("!!!"), "");
    }
}
