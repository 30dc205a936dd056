/// Number of leading principal characters kept for display.
const PRINCIPAL_HEAD_CHARS: usize = 8;

/// Number of trailing principal characters kept for display.
const PRINCIPAL_TAIL_CHARS: usize = 4;

/// Shorten a principal to its first 8 and last 4 characters:
/// `abcd1234-xyz` becomes `abcd1234...-xyz`.
///
/// Short principals are not special-cased, so head and tail may overlap.
pub fn short_principal(principal: &str) -> String {
    let chars: Vec<char> = principal.chars().collect();
    let head: String = chars.iter().take(PRINCIPAL_HEAD_CHARS).collect();
    let tail: String = chars[chars.len().saturating_sub(PRINCIPAL_TAIL_CHARS)..]
        .iter()
        .collect();
    format!("{}...{}", head, tail)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
