use std::sync::LazyLock;

use regex::Regex;

// ASCII word characters, ASCII whitespace and `-`.
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_\t\n\x0C\r -]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\t\n\x0C\r ]").unwrap());
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// Derives the URL slug of a topic name.
///
/// Lowercases, drops everything but ASCII alphanumerics, `_`, whitespace
/// and `-`, turns whitespace into hyphens, then collapses and trims hyphens.
pub fn generate_slug(name: &str) -> String {
    let lower = name.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lower, "");
    let hyphenated = WHITESPACE.replace_all(&stripped, "-");
    let collapsed = HYPHEN_RUNS.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}
