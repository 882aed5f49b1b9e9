//! Platform identifier validation and user-mention extraction.

use std::sync::LazyLock;

use regex::Regex;

static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{17,20}$").expect("invalid identifier regex"));

static MENTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?([0-9]{17,20})>").expect("invalid mention regex"));

/// Returns true when `value` is a platform identifier: 17 to 20 ASCII decimal digits.
pub fn is_platform_identifier(value: &str) -> bool {
    IDENTIFIER_REGEX.is_match(value)
}

/// Returns the identifier of the first user mention in `text`, if any.
pub fn first_mention(text: &str) -> Option<&str> {
    MENTION_REGEX
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|matched| matched.as_str())
}

/// Returns true when `text` mentions `user_id` anywhere.
pub fn mentions_user(text: &str, user_id: &str) -> bool {
    MENTION_REGEX
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .any(|matched| matched.as_str() == user_id)
}

pub fn mention_of(user_id: &str) -> String {
    format!("<@{user_id}>")
}

#[cfg(test)]
mod tests {
    use super::{first_mention, is_platform_identifier, mentions_user};

    #[test]
    fn unit_identifier_accepts_only_17_to_20_digits() {
        assert!(is_platform_identifier("12345678901234567"));
        assert!(is_platform_identifier("12345678901234567890"));
        assert!(!is_platform_identifier("abc"));
        assert!(!is_platform_identifier("123"));
        assert!(!is_platform_identifier("1234567890123456"));
        assert!(!is_platform_identifier("123456789012345678901"));
        assert!(!is_platform_identifier(" 12345678901234567"));
        assert!(!is_platform_identifier("1234567890123456a7"));
    }

    #[test]
    fn regression_identifier_rejects_non_ascii_decimal_digits() {
        assert!(!is_platform_identifier("١٢٣٤٥٦٧٨٩٠١٢٣٤٥٦٧"));
        assert!(!is_platform_identifier("１２３４５６７８９０１２３４５６７"));
        assert!(!is_platform_identifier("1234567890123456７"));
        assert_eq!(first_mention("<@١٢٣٤٥٦٧٨٩٠١٢٣٤٥٦٧>"), None);
        assert_eq!(first_mention("<@１２３４５６７８９０１２３４５６７>"), None);
        assert!(!mentions_user(
            "<@１２３４５６７８９０１２３４５６７>",
            "１２３４５６７８９０１２３４５６７"
        ));
    }

    #[test]
    fn unit_first_mention_returns_first_identifier_only() {
        let text = "**<@111111111111111111> handled it** for <@222222222222222222>";
        assert_eq!(first_mention(text), Some("111111111111111111"));
        assert_eq!(first_mention("no mentions here"), None);
        assert_eq!(first_mention("<@123>"), None);
        assert_eq!(
            first_mention("nick <@!333333333333333333>"),
            Some("333333333333333333")
        );
    }

    #[test]
    fn regression_mentions_user_requires_exact_identifier_match() {
        let text = "<@1111111111111111112> and <@111111111111111111>";
        assert!(mentions_user(text, "111111111111111111"));
        assert!(mentions_user(text, "1111111111111111112"));
        assert!(!mentions_user(text, "11111111111111111"));
    }
}
