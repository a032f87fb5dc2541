//! Attribute sections (`Attributes`, `Class Attributes`, ...).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::graved::GravedBlock;
use super::lazy_regex;
use super::DocSection;
use crate::graver::{GravedSpan, GravedText};

/// Documentation of one attribute taken from an attribute section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDoc {
    pub name: String,
    /// `:` or `(`.
    pub separator: char,
    /// What followed the separator on the header line.
    pub head: GravedText,
    pub body: Option<Vec<GravedBlock>>,
    /// Title of the section the attribute was found in.
    pub section: String,
}

/// Attribute docs keyed by attribute name, plus the trailing content of each
/// attribute section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSections {
    docs: HashMap<String, AttributeDoc>,
    order: Vec<String>,
    extras: HashMap<String, Vec<GravedBlock>>,
}

impl AttributeSections {
    pub fn get(&self, name: &str) -> Option<&AttributeDoc> {
        self.docs.get(name)
    }

    /// Attribute docs in document order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeDoc> {
        self.order.iter().filter_map(|name| self.docs.get(name))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Extra content of the attribute section titled `title`.
    pub fn extra(&self, title: &str) -> Option<&[GravedBlock]> {
        self.extras.get(&extra_key(title)).map(Vec::as_slice)
    }
}

/// Lookup key of the extra content of a section: `___` followed by the title
/// lowercased with spaces turned into underscores.
pub fn extra_key(title: &str) -> String {
    format!("___{}", title.to_lowercase().replace(' ', "_"))
}

fn attribute_section_regex() -> Option<&'static Regex> {
    static SECTION: OnceLock<Option<Regex>> = OnceLock::new();
    lazy_regex(&SECTION, r"(?i)^.*attributes?$")
}

fn attribute_header_regex() -> Option<&'static Regex> {
    static HEADER: OnceLock<Option<Regex>> = OnceLock::new();
    lazy_regex(&HEADER, r"^([A-Za-z_][A-Za-z0-9_]*)\s*([:(])\s*(.*)$")
}

pub fn is_attribute_section(title: &str) -> bool {
    attribute_section_regex().is_some_and(|regex| regex.is_match(title))
}

/// Split the header of an attribute entry into `(name, separator, head)`.
fn split_header(content: &[GravedSpan]) -> Option<(String, char, GravedText)> {
    let (first, rest) = content.split_first()?;
    let text = first.as_text()?;
    let captures = attribute_header_regex()?.captures(text)?;

    let name = captures.get(1)?.as_str().to_string();
    let separator = captures.get(2)?.as_str().chars().next()?;
    let remainder = captures.get(3).map_or("", |m| m.as_str()).trim();

    let mut head = GravedText::with_capacity(rest.len() + 1);
    if !remainder.is_empty() {
        head.push(GravedSpan::Text(remainder.to_string()));
    }
    head.extend(rest.iter().cloned());
    Some((name, separator, head))
}

/// Collect the attribute docs of every attribute section.
///
/// Each section contributes its leading `(description, optional indent)`
/// pairs whose description starts with `name :` or `name(`. The first block
/// that does not fit ends the scan; it and everything after it become the
/// section's extra content.
pub fn get_attribute_docs_for(sections: &[DocSection]) -> AttributeSections {
    let mut result = AttributeSections::default();

    for section in sections {
        let Some(title) = section.name.as_deref() else {
            continue;
        };
        if !is_attribute_section(title) {
            continue;
        }

        let blocks = &section.blocks;
        let mut index = 0;
        while index < blocks.len() {
            let GravedBlock::Description(description) = &blocks[index] else {
                break;
            };
            let Some((name, separator, head)) = split_header(&description.content) else {
                break;
            };
            index += 1;

            let body = match blocks.get(index) {
                Some(GravedBlock::Indent(indent)) => {
                    index += 1;
                    Some(indent.blocks.clone())
                }
                _ => None,
            };

            if !result.docs.contains_key(&name) {
                result.order.push(name.clone());
            }
            result.docs.insert(
                name.clone(),
                AttributeDoc {
                    name,
                    separator,
                    head,
                    body,
                    section: title.to_string(),
                },
            );
        }

        if index < blocks.len() {
            result
                .extras
                .entry(extra_key(title))
                .or_default()
                .extend(blocks[index..].iter().cloned());
        }
    }

    result
}
