//! URL shape check for inbound messages.

use once_cell::sync::Lazy;
use regex::Regex;

/// http/https scheme, optional www., a domain with at least one dot and a
/// 2-6 character top-level label, then an optional path/query. Anchored at
/// the start only, so trailing text after a valid URL shape is accepted.
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(www\.)?[-A-Za-z0-9@:%._+~#=]{1,256}\.[a-z]{2,6}\b[-A-Za-z0-9@:%._+~#?&/=]*")
        .unwrap()
});

/// Whether the text looks like a downloadable web URL. Syntactic filter
/// only; says nothing about reachability.
pub fn is_url(text: &str) -> bool {
    URL_RE.is_match(text)
}
