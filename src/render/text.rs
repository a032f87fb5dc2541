//! Plain-text rendering.

use crate::docstring::{DocString, GravedBlock};
use crate::graver::graved_to_plain;

const INDENT: &str = "    ";

/// Render `doc` as plain text. Section titles are underlined with dashes
/// and blocks are separated by blank lines.
pub fn render_text(doc: &DocString) -> String {
    let mut output = String::new();
    for section in doc.sections() {
        if let Some(name) = &section.name {
            push_paragraph_break(&mut output);
            output.push_str(name);
            output.push('\n');
            output.push_str(&"-".repeat(name.chars().count()));
            output.push('\n');
        }
        push_blocks(&mut output, &section.blocks, "");
    }
    while output.ends_with('\n') {
        output.pop();
    }
    output
}

fn push_paragraph_break(output: &mut String) {
    if output.is_empty() {
        return;
    }
    while !output.ends_with("\n\n") {
        output.push('\n');
    }
}

fn push_line(output: &mut String, indent: &str, line: &str) {
    output.push_str(indent);
    output.push_str(line);
    output.push('\n');
}

fn push_blocks(output: &mut String, blocks: &[GravedBlock], indent: &str) {
    for block in blocks {
        if !output.is_empty() && !output.ends_with("-\n") {
            push_paragraph_break(output);
        }
        match block {
            GravedBlock::Description(description) => {
                push_line(output, indent, &graved_to_plain(&description.content));
            }
            GravedBlock::Table(table) => {
                for row in &table.rows {
                    let cells: Vec<String> = row
                        .iter()
                        .map(|cell| cell.as_deref().map(graved_to_plain).unwrap_or_default())
                        .collect();
                    push_line(output, indent, &cells.join(" | "));
                }
            }
            GravedBlock::Listing(listing) => {
                let nested = format!("{indent}{INDENT}");
                for element in &listing.elements {
                    let head = element.head.as_deref().map(graved_to_plain).unwrap_or_default();
                    push_line(output, indent, &format!("- {head}"));
                    if let Some(content) = &element.content {
                        push_blocks(output, content, &nested);
                    }
                }
            }
            GravedBlock::CodeBlock(code) => {
                let nested = format!("{indent}{INDENT}");
                for line in &code.lines {
                    push_line(output, &nested, line);
                }
            }
            GravedBlock::BlockQuote(quote) => {
                for description in &quote.descriptions {
                    push_line(output, indent, &format!("> {}", graved_to_plain(&description.content)));
                }
            }
            GravedBlock::Indent(inner) => {
                push_blocks(output, &inner.blocks, &format!("{indent}{INDENT}"));
            }
        }
    }
}
