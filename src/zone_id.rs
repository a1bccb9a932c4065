use std::sync::OnceLock;

use fancy_regex::Regex;

// Zone identifiers are slash-separated segments of letters, digits,
// underscores, plus, minus and dots, e.g. America/Argentina/Buenos_Aires
// or Etc/GMT+9.
const ZONE_ID_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_+.\-]*(?:/[A-Za-z0-9_+.\-]+)*$";

fn pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(ZONE_ID_PATTERN).ok())
        .as_ref()
}

pub(crate) fn is_valid(zone: &str) -> bool {
    !zone.is_empty()
        && pattern()
            .map(|re| re.is_match(zone).unwrap_or(false))
            .unwrap_or(false)
}

/// IANA zone of the host locale, when the platform exposes one that
/// passes the identifier grammar.
pub(crate) fn host_zone() -> Option<String> {
    iana_time_zone::get_timezone()
        .ok()
        .filter(|zone| is_valid(zone))
}
