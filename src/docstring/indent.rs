//! Indentation normalization for docstring lines.

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn strip_chars(line: &str, count: usize) -> String {
    line.chars().skip(count).collect()
}

/// Normalize the lines of a whole docstring.
///
/// Trailing whitespace is removed and blank lines at both ends are dropped.
/// The first remaining line is left-trimmed, even when blank lines preceded
/// it, and never counts toward the common indentation stripped from the
/// other lines. This keeps the result stable under a second pass. Returns
/// `None` when nothing but blank lines remain.
pub fn remove_indents<S: AsRef<str>>(lines: &[S]) -> Option<Vec<String>> {
    let mut lines: Vec<String> = lines
        .iter()
        .map(|line| line.as_ref().trim_end().to_string())
        .collect();

    let end = lines.iter().rposition(|line| !line.is_empty())? + 1;
    lines.truncate(end);
    let start = lines.iter().position(|line| !line.is_empty())?;
    lines.drain(..start);

    let common = lines[1..]
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| indent_width(line))
        .min()
        .unwrap_or(0);

    Some(
        lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                if index == 0 {
                    line.trim_start().to_string()
                } else if line.is_empty() {
                    line
                } else {
                    strip_chars(&line, common)
                }
            })
            .collect(),
    )
}

/// Strip the indentation shared by every content line, first line included.
///
/// Used for nested blocks, whose first line carries the same indentation as
/// the rest. Blank lines at both ends are dropped; `None` for blank input.
pub fn dedent_lines<S: AsRef<str>>(lines: &[S]) -> Option<Vec<String>> {
    let mut lines: Vec<String> = lines
        .iter()
        .map(|line| line.as_ref().trim_end().to_string())
        .collect();

    let end = lines.iter().rposition(|line| !line.is_empty())? + 1;
    lines.truncate(end);
    let start = lines.iter().position(|line| !line.is_empty())?;
    lines.drain(..start);

    let common = lines
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| indent_width(line))
        .min()
        .unwrap_or(0);

    Some(
        lines
            .into_iter()
            .map(|line| if line.is_empty() { line } else { strip_chars(&line, common) })
            .collect(),
    )
}

/// Whether the line begins with whitespace and has content.
pub fn is_indented(line: &str) -> bool {
    line.starts_with(char::is_whitespace) && !is_blank(line)
}
