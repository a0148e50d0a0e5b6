/// Escapes the characters Telegram MarkdownV2 reserves in plain text.
///
/// The reserved set is
/// `\`, `_`, `*`, `[`, `]`, `(`, `)`, `~`, `` ` ``, `>`, `#`, `+`, `-`, `=`, `|`, `{`, `}`, `.`, `!`.
///
/// # Example
///
/// ```
/// use carrierbot::core::utils::escape_markdown_v2;
///
/// let escaped = escape_markdown_v2("Hello. World!");
/// assert_eq!(escaped, "Hello\\. World\\!");
/// ```
pub fn escape_markdown_v2(text: &str) -> String {
    let mut result = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '_' => result.push_str("\\_"),
            '*' => result.push_str("\\*"),
            '[' => result.push_str("\\["),
            ']' => result.push_str("\\]"),
            '(' => result.push_str("\\("),
            ')' => result.push_str("\\)"),
            '~' => result.push_str("\\~"),
            '`' => result.push_str("\\`"),
            '>' => result.push_str("\\>"),
            '#' => result.push_str("\\#"),
            '+' => result.push_str("\\+"),
            '-' => result.push_str("\\-"),
            '=' => result.push_str("\\="),
            '|' => result.push_str("\\|"),
            '{' => result.push_str("\\{"),
            '}' => result.push_str("\\}"),
            '.' => result.push_str("\\."),
            '!' => result.push_str("\\!"),
            _ => result.push(c),
        }
    }

    result
}

/// Escapes text placed inside a MarkdownV2 `code` or ```` ```pre``` ```` entity.
///
/// Only `` ` `` and `\` are special there.
pub fn escape_markdown_v2_code(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '`' => result.push_str("\\`"),
            _ => result.push(c),
        }
    }

    result
}

/// Reads the integer a text starts with.
///
/// Leading whitespace and one sign are accepted and anything after the digits
/// is ignored, so `" 12 apples"` gives 12. Returns `None` when no digit
/// follows, or when the number does not fit in an `i64`.
///
/// # Example
///
/// ```
/// use carrierbot::core::utils::parse_leading_int;
///
/// assert_eq!(parse_leading_int("-7 below"), Some(-7));
/// assert_eq!(parse_leading_int("seven"), None);
/// ```
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Text up to the first line break
pub fn first_line(text: &str) -> &str {
    text.split('\n').next().unwrap_or(text)
}
