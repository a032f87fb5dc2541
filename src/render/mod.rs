//! Rendering of parsed docstrings.
//!
//! - [`html`] builds HTML pages, plain or with same-page member anchors
//! - [`text`] builds plain text
//! - [`links`] computes relative links and resolves references

pub mod html;
pub mod links;
pub mod text;

pub use html::HtmlRenderer;
pub use links::{page_and_anchor, page_href, relative_link, resolve_local_reference, resolve_reference};
pub use text::render_text;

/// Append `text` to `output` with HTML special characters escaped.
pub fn push_escaped(output: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(c),
        }
    }
}

/// Lowercased anchor slug of `title`, prefixed with `prefix` when non-empty.
pub fn anchor(prefix: &str, title: &str) -> String {
    let mut slug = String::with_capacity(prefix.len() + title.len() + 1);
    if !prefix.is_empty() {
        slug.push_str(prefix);
        slug.push('-');
    }
    let mut dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() || c == '_' {
            if dash && !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
            slug.extend(c.to_lowercase());
            dash = false;
        } else {
            dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        let mut output = String::new();
        push_escaped(&mut output, "<a href=\"x\">&'</a>");
        assert_eq!(output, "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_anchor() {
        assert_eq!(anchor("", "Parameters"), "parameters");
        assert_eq!(anchor("guild", "Other  Attributes"), "guild-other-attributes");
        assert_eq!(anchor("guild", "get_channel"), "guild-get_channel");
    }
}
