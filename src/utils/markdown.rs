//! Helpers for Telegram MarkdownV2 text.
//!
//! Every user-supplied string (pod and player names in particular) must pass
//! through [`escape_markdown`] before it is embedded in a MarkdownV2 message.

/// Escapes all characters that have special meaning in MarkdownV2.
///
/// # Example
/// ```
/// use edh_pod_bot::utils::markdown::escape_markdown;
///
/// let text = "Hello *world* (test)";
/// let escaped = escape_markdown(text);
/// assert_eq!(escaped, "Hello \\*world\\* \\(test\\)");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|' | '{' | '}' | '.' | '!'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Bold text with its content escaped.
pub fn bold(text: &str) -> String {
    format!("*{}*", escape_markdown(text))
}

/// Shortens a name to `max` characters, marking the cut with an ellipsis.
pub fn truncate_name(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let mut short: String = name.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Formats a ratio as a whole percentage, or a dash when there is none.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:.0}%", rate * 100.0),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_basic_markdown() {
        assert_eq!(escape_markdown("Hello *world*"), "Hello \\*world\\*");
        assert_eq!(escape_markdown("_italic_"), "\\_italic\\_");
        assert_eq!(escape_markdown("`code`"), "\\`code\\`");
    }

    #[test]
    fn test_escape_backslash() {
        assert_eq!(escape_markdown("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_escape_player_name() {
        let input = "Atraxa [Praetors' Voice] (4c) - 1st!";
        let expected = "Atraxa \\[Praetors' Voice\\] \\(4c\\) \\- 1st\\!";
        assert_eq!(escape_markdown(input), expected);
    }

    #[test]
    fn test_escape_plain_text() {
        assert_eq!(escape_markdown(""), "");
        assert_eq!(escape_markdown("plain text"), "plain text");
    }

    #[test]
    fn test_bold() {
        assert_eq!(bold("Pod #1"), "*Pod \\#1*");
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Alice", 10), "Alice");
        assert_eq!(truncate_name("Bartholomew", 6), "Barth…");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(Some(0.756)), "76%");
        assert_eq!(format_rate(Some(0.0)), "0%");
        assert_eq!(format_rate(None), "-");
    }
}
