//! Admin detection.
//!
//! There are no stored roles: a user is an admin exactly when their email
//! appears in the static allow-list loaded from `ADMIN_EMAILS`.

/// Parse a comma-separated allow-list into normalized (trimmed, lowercase)
/// email addresses. Empty entries are dropped.
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Returns `true` if `email` matches an entry of the allow-list.
///
/// Comparison ignores ASCII case and surrounding whitespace.
pub fn is_admin_email(email: &str, allow_list: &[String]) -> bool {
    let needle = email.trim();
    !needle.is_empty()
        && allow_list
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_list() {
        let list = parse_admin_emails(" Boss@Example.com, ,ops@example.com ");
        assert_eq!(list, vec!["boss@example.com", "ops@example.com"]);
    }

    #[test]
    fn match_is_case_insensitive() {
        let list = parse_admin_emails("boss@example.com");
        assert!(is_admin_email("BOSS@example.COM", &list));
        assert!(is_admin_email("  boss@example.com ", &list));
    }

    #[test]
    fn non_member_is_not_admin() {
        let list = parse_admin_emails("boss@example.com");
        assert!(!is_admin_email("intern@example.com", &list));
    }

    #[test]
    fn empty_email_never_matches() {
        let list = parse_admin_emails("boss@example.com");
        assert!(!is_admin_email("", &list));
        assert!(!is_admin_email("x@example.com", &[]));
    }
}
