//! Address/pattern matching.
//!
//! A pattern is compared against an address in one of two modes:
//!
//! - **Glob mode**, whenever the pattern contains the glob character. Each
//!   glob matches any run of characters (delimiters included) and the match
//!   is anchored at the start of the address only. `/users/*` therefore
//!   matches `/users/123` and also `/users/123/news/0`: once the pattern is
//!   consumed, any remaining address characters are accepted.
//! - **Segment mode** otherwise. Both strings are split on the delimiter and
//!   compared position by position. A pattern segment starting with the
//!   parameter prefix absorbs any address segment that is not itself a
//!   parameter.
//!
//! Glob matching uses a two-pointer scan with a single backtrack point, so
//! patterns with many globs cost at most `O(address * pattern)`.

/// Returns true if `address` matches `pattern`.
///
/// One trailing delimiter is ignored on both sides. `param_prefix` enables
/// parameter segments; without it segment mode is plain segment equality.
///
/// # Examples
///
/// ```
/// use routecache_core::matcher::matches;
///
/// assert!(matches("/users/123", "/users/:id", '/', Some(':'), '*'));
/// assert!(!matches("/users/:other", "/users/:id", '/', Some(':'), '*'));
/// assert!(matches("/users/123/news/0", "/users/*", '/', Some(':'), '*'));
/// ```
pub fn matches(
    address: &str,
    pattern: &str,
    delimiter: char,
    param_prefix: Option<char>,
    glob: char,
) -> bool {
    let address = strip_trailing(address, delimiter);
    let pattern = strip_trailing(pattern, delimiter);

    if pattern.contains(glob) {
        return glob_prefix_match(address, pattern, glob);
    }

    let address_segments: Vec<&str> = address.split(delimiter).collect();
    let pattern_segments: Vec<&str> = pattern.split(delimiter).collect();

    if address_segments.len() != pattern_segments.len() {
        return false;
    }

    if address.is_empty() || pattern.is_empty() {
        return address == pattern;
    }

    if is_single_char(address) && is_single_char(pattern) {
        return address == pattern;
    }

    address_segments
        .iter()
        .zip(pattern_segments.iter())
        .all(|(address_segment, pattern_segment)| {
            segment_matches(address_segment, pattern_segment, param_prefix)
        })
}

fn segment_matches(address_segment: &str, pattern_segment: &str, param_prefix: Option<char>) -> bool {
    if address_segment == pattern_segment {
        return true;
    }

    match param_prefix {
        Some(prefix) => {
            pattern_segment.starts_with(prefix) && !address_segment.starts_with(prefix)
        },
        None => false,
    }
}

/// Start-anchored glob match: true if some prefix of `text` matches `pattern`.
fn glob_prefix_match(text: &str, pattern: &str, glob: char) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let mut t = 0;
    let mut p = 0;
    // (pattern index of the last glob, text index it is currently absorbing up to)
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p == pattern.len() {
            return true;
        }

        if pattern[p] == glob {
            backtrack = Some((p, t));
            p += 1;
        } else if pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((glob_at, absorbed)) = backtrack {
            p = glob_at + 1;
            t = absorbed + 1;
            backtrack = Some((glob_at, absorbed + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == glob)
}

fn strip_trailing(value: &str, delimiter: char) -> &str {
    value.strip_suffix(delimiter).unwrap_or(value)
}

fn is_single_char(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some() && chars.next().is_none()
}
