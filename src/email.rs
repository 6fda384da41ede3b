//! Email extraction from free-form channel text
//!
//! Purely syntactic: `local@domain.tld` where the final label has at least two
//! letters. No MX or DNS checks.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email pattern is valid")
});

/// Collect the distinct email-like tokens found across `fragments`
///
/// Absent and empty fragments are skipped. Emails are returned in first-seen
/// order, so identical input always yields identical output.
///
/// # Examples
///
/// ```
/// use channel_scout::email::extract_emails;
///
/// let emails = extract_emails([
///     Some("Business: hello@studio.tv"),
///     None,
///     Some("hello@studio.tv or press@studio.tv"),
/// ]);
/// assert_eq!(emails, vec!["hello@studio.tv", "press@studio.tv"]);
/// ```
pub fn extract_emails<'a, I>(fragments: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut seen = HashSet::new();
    let mut emails = Vec::new();

    for text in fragments.into_iter().flatten() {
        if text.is_empty() {
            continue;
        }
        for m in EMAIL_PATTERN.find_iter(text) {
            if seen.insert(m.as_str()) {
                emails.push(m.as_str().to_string());
            }
        }
    }

    emails
}
