//! Structural blocks of a docstring section.
//!
//! `parse_section` walks the lines of one section with a cursor and tries the
//! block detectors in a fixed priority order: blank run, indented block,
//! table, listing, code block, block quote, description.

use std::sync::OnceLock;

use regex::Regex;

use super::indent::{dedent_lines, is_indented};
use super::lazy_regex;
use crate::qualpath::QualPath;
use crate::warnings::WarningSink;

/// Code lines longer than this are truncated.
pub const MAX_CODE_LINE_LENGTH: usize = 120;

/// A paragraph, its lines joined with spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDescription {
    pub text: String,
}

/// A grid table. Border rows are dropped; cells are `None` when empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTable {
    columns: usize,
    rows: Vec<Vec<Option<String>>>,
}

impl TextTable {
    /// Build a table from rows, padding short rows with empty cells.
    pub fn from_rows(mut rows: Vec<Vec<Option<String>>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(columns, None);
        }
        Self { columns, rows }
    }

    /// `(columns, rows)`.
    pub fn size(&self) -> (usize, usize) {
        (self.columns, self.rows.len())
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Rows in order, the header first.
    pub fn iter(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// One `- ` element of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextListingElement {
    pub head: Option<String>,
    pub content: Option<Vec<TextBlock>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextListing {
    pub elements: Vec<TextListingElement>,
}

/// A fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCodeBlock {
    pub language: Option<String>,
    pub lines: Vec<String>,
}

/// `>` quoted paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlockQuote {
    pub descriptions: Vec<TextDescription>,
}

/// An indented sub-section, parsed after dedenting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextIndent {
    pub blocks: Vec<TextBlock>,
}

/// Closed set of block kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextBlock {
    Description(TextDescription),
    Table(TextTable),
    Listing(TextListing),
    CodeBlock(TextCodeBlock),
    BlockQuote(TextBlockQuote),
    Indent(TextIndent),
}

impl TextBlock {
    pub fn as_description(&self) -> Option<&TextDescription> {
        match self {
            TextBlock::Description(description) => Some(description),
            _ => None,
        }
    }
}

/// Result of a detector: lines consumed and the block built from them, if
/// any survived.
type Detected = Option<(usize, Option<TextBlock>)>;

struct SectionParser<'a> {
    path: &'a QualPath,
    warnings: &'a mut WarningSink,
}

/// Parse the lines of one section into blocks. `None` when no block survives.
pub fn parse_section(
    lines: &[String],
    path: &QualPath,
    warnings: &mut WarningSink,
) -> Option<Vec<TextBlock>> {
    SectionParser { path, warnings }.parse(lines)
}

impl SectionParser<'_> {
    fn parse(&mut self, lines: &[String]) -> Option<Vec<TextBlock>> {
        let mut blocks = Vec::new();
        let mut cursor = 0;

        while cursor < lines.len() {
            let rest = &lines[cursor..];

            if let Some(consumed) = detect_void(rest) {
                cursor += consumed;
                continue;
            }

            let detected = self
                .detect_indent(rest)
                .or_else(|| self.detect_table(rest))
                .or_else(|| self.detect_listing(rest))
                .or_else(|| self.detect_code_block(rest))
                .or_else(|| self.detect_block_quote(rest))
                .or_else(|| detect_description(rest));

            match detected {
                Some((consumed, block)) if consumed > 0 => {
                    blocks.extend(block);
                    cursor += consumed;
                }
                _ => {
                    tracing::warn!(
                        path = %self.path,
                        line = %lines[cursor],
                        "no block detector advanced; skipping line"
                    );
                    cursor += 1;
                }
            }
        }

        let blocks = merge_descriptions(blocks);
        (!blocks.is_empty()).then_some(blocks)
    }

    fn warn(&mut self, reason: impl Into<String>) {
        self.warnings.warn(self.path, reason);
    }

    fn detect_indent(&mut self, rest: &[String]) -> Detected {
        if !is_indented(&rest[0]) {
            return None;
        }
        let mut end = 1;
        let mut index = 1;
        while index < rest.len() {
            if is_indented(&rest[index]) {
                index += 1;
                end = index;
            } else if is_blank(&rest[index]) {
                index += 1;
            } else {
                break;
            }
        }

        let block = dedent_lines(&rest[..end])
            .and_then(|lines| self.parse(&lines))
            .map(|blocks| TextBlock::Indent(TextIndent { blocks }));
        if block.is_none() {
            self.warn("Empty indented block.");
        }
        Some((end, block))
    }

    fn detect_table(&mut self, rest: &[String]) -> Detected {
        let count = rest.iter().take_while(|line| is_table_row(line)).count();
        if count < 2 {
            return None;
        }

        let mut logical: Vec<Vec<Vec<String>>> = Vec::new();
        let mut current: Option<Vec<Vec<String>>> = None;
        for line in &rest[..count] {
            if is_table_border(line) {
                logical.extend(current.take());
                continue;
            }
            let cells = split_table_row(line);
            match current.as_mut() {
                None => current = Some(cells.into_iter().map(|cell| vec![cell]).collect()),
                Some(row) => {
                    for (column, cell) in cells.into_iter().enumerate() {
                        match row.get_mut(column) {
                            Some(pieces) => pieces.push(cell),
                            None => row.push(vec![cell]),
                        }
                    }
                }
            }
        }
        logical.extend(current);

        let rows: Vec<Vec<Option<String>>> = logical
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|pieces| {
                        let joined = pieces
                            .iter()
                            .map(|piece| piece.trim())
                            .filter(|piece| !piece.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ");
                        (!joined.is_empty()).then_some(joined)
                    })
                    .collect()
            })
            .collect();

        if rows.iter().flatten().all(Option::is_none) {
            self.warn("Empty table.");
            return Some((count, None));
        }
        Some((count, Some(TextBlock::Table(TextTable::from_rows(rows)))))
    }

    fn detect_listing(&mut self, rest: &[String]) -> Detected {
        if !is_listing_item(&rest[0]) {
            return None;
        }

        let mut elements = Vec::new();
        let mut index = 0;
        while index < rest.len() && is_listing_item(&rest[index]) {
            let mut head = rest[index][1..].trim().to_string();
            index += 1;

            while index < rest.len()
                && !is_blank(&rest[index])
                && !is_indented(&rest[index])
                && !is_listing_item(&rest[index])
            {
                head.push(' ');
                head.push_str(rest[index].trim());
                index += 1;
            }

            let nested_start = index;
            let mut nested_end = index;
            while index < rest.len() && (is_blank(&rest[index]) || is_indented(&rest[index])) {
                index += 1;
                if !is_blank(&rest[index - 1]) {
                    nested_end = index;
                }
            }

            let content = dedent_lines(&rest[nested_start..nested_end])
                .and_then(|lines| self.parse(&lines));
            let head = (!head.is_empty()).then_some(head);

            if head.is_none() && content.is_none() {
                self.warn("Empty listing element.");
                continue;
            }
            elements.push(TextListingElement { head, content });
        }

        if elements.is_empty() {
            self.warn("Empty listing.");
            return Some((index, None));
        }
        Some((index, Some(TextBlock::Listing(TextListing { elements }))))
    }

    fn detect_code_block(&mut self, rest: &[String]) -> Detected {
        let opening = rest[0].strip_prefix("```")?;
        let language = opening.trim();
        let language = (!language.is_empty()).then(|| language.to_lowercase());

        let mut lines = Vec::new();
        let mut consumed = rest.len();
        let mut closed = false;
        for (index, line) in rest.iter().enumerate().skip(1) {
            if let Some(last) = line.trim_end().strip_suffix("```") {
                if !last.trim().is_empty() {
                    lines.push(last.to_string());
                }
                consumed = index + 1;
                closed = true;
                break;
            }
            lines.push(line.clone());
        }
        if !closed {
            self.warn("Unclosed code block; taking the rest of the section.");
        }

        while lines.first().is_some_and(|line| is_blank(line)) {
            lines.remove(0);
        }
        while lines.last().is_some_and(|line| is_blank(line)) {
            lines.pop();
        }
        if lines.is_empty() {
            self.warn("Empty code block.");
            return Some((consumed, None));
        }

        for line in &mut lines {
            if line.chars().count() > MAX_CODE_LINE_LENGTH {
                self.warnings.warn(
                    self.path,
                    format!(
                        "Code line over {} characters, truncated: {:?}",
                        MAX_CODE_LINE_LENGTH, line
                    ),
                );
                *line = line.chars().take(MAX_CODE_LINE_LENGTH).collect();
            }
        }

        Some((
            consumed,
            Some(TextBlock::CodeBlock(TextCodeBlock { language, lines })),
        ))
    }

    fn detect_block_quote(&mut self, rest: &[String]) -> Detected {
        let count = rest.iter().take_while(|line| line.starts_with('>')).count();
        if count == 0 {
            return None;
        }

        let mut descriptions = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        for line in &rest[..count] {
            let stripped = &line[1..];
            let stripped = stripped.strip_prefix(' ').unwrap_or(stripped).trim();
            if stripped.is_empty() {
                flush_paragraph(&mut paragraph, &mut descriptions);
            } else {
                paragraph.push(stripped);
            }
        }
        flush_paragraph(&mut paragraph, &mut descriptions);

        if descriptions.is_empty() {
            self.warn("Empty block quote.");
            return Some((count, None));
        }
        Some((
            count,
            Some(TextBlock::BlockQuote(TextBlockQuote { descriptions })),
        ))
    }
}

fn flush_paragraph(paragraph: &mut Vec<&str>, descriptions: &mut Vec<TextDescription>) {
    if !paragraph.is_empty() {
        descriptions.push(TextDescription {
            text: paragraph.join(" "),
        });
        paragraph.clear();
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn detect_void(rest: &[String]) -> Option<usize> {
    let count = rest.iter().take_while(|line| is_blank(line)).count();
    (count > 0).then_some(count)
}

fn detect_description(rest: &[String]) -> Detected {
    if is_blank(&rest[0]) || is_indented(&rest[0]) {
        return None;
    }
    let count = 1 + rest[1..]
        .iter()
        .take_while(|line| !is_blank(line) && !is_indented(line) && !starts_structure(line))
        .count();
    let text = rest[..count]
        .iter()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join(" ");
    Some((count, Some(TextBlock::Description(TextDescription { text }))))
}

fn starts_structure(line: &str) -> bool {
    is_listing_item(line) || line.starts_with("```") || line.starts_with('>') || is_table_row(line)
}

fn listing_regex() -> Option<&'static Regex> {
    static LISTING: OnceLock<Option<Regex>> = OnceLock::new();
    lazy_regex(&LISTING, r"^-\s+\S")
}

/// A `- ` line with content after the dash.
fn is_listing_item(line: &str) -> bool {
    listing_regex().is_some_and(|regex| regex.is_match(line))
}

fn is_table_border(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 2
        && line.starts_with(['|', '+'])
        && line.ends_with(['|', '+'])
        && line.contains(['-', '='])
        && line.chars().all(|c| matches!(c, '|' | '+' | '-' | '=' | ':' | ' '))
}

fn is_table_text_row(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 2 && line.starts_with('|') && line.ends_with('|')
}

fn is_table_row(line: &str) -> bool {
    is_table_border(line) || is_table_text_row(line)
}

fn split_table_row(line: &str) -> Vec<String> {
    let line = line.trim();
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn header_regex() -> Option<&'static Regex> {
    static HEADER: OnceLock<Option<Regex>> = OnceLock::new();
    lazy_regex(&HEADER, r"^[A-Za-z_][A-Za-z0-9_]*\s*[:(]")
}

/// `name :` or `name(` at the start of a paragraph.
pub(crate) fn has_attribute_header(text: &str) -> bool {
    header_regex().is_some_and(|regex| regex.is_match(text))
}

/// Fold `Description` + `Indent([Description])` into one description.
///
/// Stray indentation in running text produces this shape.
///
/// Exception: a description with the attribute-header shape (`name :` or
/// `name(`) is never merged. Its indented block is the attribute's body and
/// attribute extraction reads it from there.
fn merge_descriptions(blocks: Vec<TextBlock>) -> Vec<TextBlock> {
    let mut merged: Vec<TextBlock> = Vec::with_capacity(blocks.len());
    for block in blocks {
        if let TextBlock::Indent(indent) = &block {
            if let [TextBlock::Description(inner)] = indent.blocks.as_slice() {
                if let Some(TextBlock::Description(previous)) = merged.last_mut() {
                    if !has_attribute_header(&previous.text) {
                        previous.text.push(' ');
                        previous.text.push_str(&inner.text);
                        continue;
                    }
                }
            }
        }
        merged.push(block);
    }
    merged
}
