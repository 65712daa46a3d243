// Helper functions for safe logging and serialization

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            // First character, not first byte: the local part may start
            // with a multi-byte character
            match parts[0].chars().next() {
                Some(first) => format!("{}***@{}", first, parts[1]),
                None => format!("***@{}", parts[1]),
            }
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
///
/// # Example
/// ```
/// let masked = safe_token_log("AQVzE5nF8kWm2pQr7sTx9yLbCdGhJkMnOaUvXwYz");
/// // Returns: "AQVz...XwYz"
/// ```
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Serializes a hashtag list to the JSON string stored in the database.
/// Returns None for a missing or empty list so the column stays NULL.
pub fn serialize_hashtags(hashtags: Option<&[String]>) -> Option<String> {
    match hashtags {
        Some(tags) if !tags.is_empty() => serde_json::to_string(tags).ok(),
        _ => None,
    }
}

/// Parses the stored hashtags JSON back into a list. Bad data reads as empty.
pub fn parse_hashtags(hashtags: Option<&str>) -> Vec<String> {
    hashtags
        .and_then(|h| serde_json::from_str::<Vec<String>>(h).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_email_log_masks_local_part() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
    }

    #[test]
    fn test_safe_email_log_handles_garbage() {
        assert_eq!(safe_email_log("ab"), "***@***.***");
        assert_eq!(safe_email_log("no-at-sign"), "***@***.***");
    }

    #[test]
    fn test_safe_email_log_multibyte_first_char() {
        assert_eq!(safe_email_log("émile@example.com"), "é***@example.com");
        assert_eq!(safe_email_log("日本@example.com"), "日***@example.com");
        assert_eq!(safe_email_log("@example.com"), "***@example.com");
    }

    #[test]
    fn test_safe_token_log_masks_middle() {
        let masked = safe_token_log("AQVzE5nF8kWm2pQr");
        assert!(masked.starts_with("AQVz"));
        assert!(masked.ends_with("2pQr"));
        assert!(masked.contains("..."));
    }

    #[test]
    fn test_safe_token_log_short_token() {
        assert_eq!(safe_token_log("short"), "***");
    }

    #[test]
    fn test_hashtags_round_trip() {
        let tags = vec!["rust".to_string(), "#automation".to_string()];
        let json = serialize_hashtags(Some(&tags)).expect("serialized");
        assert_eq!(parse_hashtags(Some(&json)), tags);
    }

    #[test]
    fn test_hashtags_empty_stays_null() {
        assert_eq!(serialize_hashtags(None), None);
        assert_eq!(serialize_hashtags(Some(&[])), None);
        assert!(parse_hashtags(None).is_empty());
        assert!(parse_hashtags(Some("not json")).is_empty());
    }
}
