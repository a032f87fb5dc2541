//! Splitting docstring lines into named sections.

use std::sync::OnceLock;

use regex::Regex;

use super::lazy_regex;

/// A raw section: `None` names the leading untitled section.
pub type RawSection = (Option<String>, Vec<String>);

fn title_regex() -> Option<&'static Regex> {
    static TITLE: OnceLock<Option<Regex>> = OnceLock::new();
    lazy_regex(&TITLE, r"^[A-Z][A-Za-z]*(?: [A-Za-z]+)*$")
}

fn underline_regex() -> Option<&'static Regex> {
    static UNDERLINE: OnceLock<Option<Regex>> = OnceLock::new();
    lazy_regex(&UNDERLINE, r"^-+$")
}

/// Whether `lines[index]` opens a section (title followed by a dash line and
/// at least one more line).
fn is_section_start(lines: &[String], index: usize) -> bool {
    let (Some(title), Some(underline)) = (title_regex(), underline_regex()) else {
        return false;
    };
    index + 2 < lines.len()
        && title.is_match(&lines[index])
        && underline.is_match(&lines[index + 1])
}

/// Split normalized lines into sections.
///
/// The leading untitled section is omitted when it has no lines; named
/// sections are always returned, possibly with an empty body.
pub fn parse_sections(lines: &[String]) -> Vec<RawSection> {
    let mut sections = Vec::new();
    let mut name = None;
    let mut buffer = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        if is_section_start(lines, index) {
            close_section(&mut sections, name.take(), std::mem::take(&mut buffer));
            name = Some(lines[index].clone());
            index += 2;
            continue;
        }
        buffer.push(lines[index].clone());
        index += 1;
    }
    close_section(&mut sections, name, buffer);

    sections
}

fn close_section(sections: &mut Vec<RawSection>, name: Option<String>, mut buffer: Vec<String>) {
    while buffer.last().is_some_and(|line| line.trim().is_empty()) {
        buffer.pop();
    }
    if name.is_none() && buffer.is_empty() {
        return;
    }
    sections.push((name, buffer));
}
