//! YAML frontmatter splitting.

/// Splits a Markdown buffer into its YAML frontmatter and body.
///
/// Frontmatter is the block between a leading `---` fence and the next
/// `---` fence. The closing fence's newline is consumed; any blank line
/// the author left after it stays in the body.
pub fn split(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text.strip_prefix("---\n") else {
        return (None, text);
    };
    let Some(end) = rest.find("\n---") else {
        return (None, text);
    };
    let frontmatter = &rest[..end];
    let body = rest[end + 4..].strip_prefix('\n').unwrap_or(&rest[end + 4..]);
    (Some(frontmatter), body)
}
