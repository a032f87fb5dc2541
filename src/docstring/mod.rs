//! Docstring parsing.
//!
//! Raw docstring text goes through [`remove_indents`], [`parse_sections`],
//! [`parse_section`] and the graving pass to become a [`DocString`]: an
//! ordered list of sections holding graved blocks.

mod attributes;
mod blocks;
mod graved;
mod indent;
mod sections;

use std::cell::OnceCell;
use std::sync::OnceLock;

use regex::Regex;

use crate::graver::GravedText;
use crate::qualpath::QualPath;
use crate::warnings::WarningSink;

pub use attributes::{extra_key, get_attribute_docs_for, is_attribute_section, AttributeDoc, AttributeSections};
pub use blocks::{
    parse_section, TextBlock, TextBlockQuote, TextCodeBlock, TextDescription, TextIndent,
    TextListing, TextListingElement, TextTable, MAX_CODE_LINE_LENGTH,
};
pub use graved::{
    build_graves_on_subsection, GraveContext, GravedBlock, GravedBlockQuote, GravedCodeBlock,
    GravedDescription, GravedIndent, GravedListing, GravedListingElement, GravedTable,
};
pub use indent::{dedent_lines, remove_indents};
pub use sections::{parse_sections, RawSection};

/// Compile `pattern` once into `cell`. `None` if it does not compile.
pub(crate) fn lazy_regex(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// One section of a docstring. `name` is `None` for the leading section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSection {
    pub name: Option<String>,
    pub blocks: Vec<GravedBlock>,
}

/// A parsed docstring.
#[derive(Debug, Clone)]
pub struct DocString {
    path: QualPath,
    sections: Vec<DocSection>,
    attribute_sections: OnceCell<AttributeSections>,
}

impl DocString {
    /// Parse `text` as the docstring of the unit at `path`.
    ///
    /// Returns `None` when the text is blank or every section turned out
    /// empty. Problems are recorded in `warnings`.
    pub fn parse(text: &str, path: &QualPath, warnings: &mut WarningSink) -> Option<Self> {
        let raw: Vec<&str> = text.lines().collect();

        if raw
            .first()
            .is_some_and(|line| line.starts_with(char::is_whitespace) && !line.trim().is_empty())
        {
            warnings.warn(path, "Docstring starts with indentation.");
        }

        let lines = remove_indents(&raw)?;
        let mut sections = Vec::new();

        for (name, body) in parse_sections(&lines) {
            let blocks = parse_section(&body, path, warnings).and_then(|blocks| {
                let mut ctx = GraveContext::new(path, warnings);
                build_graves_on_subsection(&blocks, &mut ctx)
            });

            match blocks {
                Some(blocks) => sections.push(DocSection { name, blocks }),
                None => {
                    if let Some(name) = name {
                        warnings.warn(path, format!("Empty section: {name:?}."));
                    }
                }
            }
        }

        if sections.is_empty() {
            return None;
        }

        Some(Self {
            path: path.clone(),
            sections,
            attribute_sections: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &QualPath {
        &self.path
    }

    pub fn sections(&self) -> &[DocSection] {
        &self.sections
    }

    /// First section titled `name`.
    pub fn section(&self, name: &str) -> Option<&DocSection> {
        self.sections
            .iter()
            .find(|section| section.name.as_deref() == Some(name))
    }

    /// The first paragraph of the leading section.
    pub fn summary(&self) -> Option<&GravedText> {
        let first = self.sections.first()?;
        if first.name.is_some() {
            return None;
        }
        match first.blocks.first()? {
            GravedBlock::Description(description) => Some(&description.content),
            _ => None,
        }
    }

    /// Attribute docs of every attribute section, computed on first use.
    pub fn attribute_sections(&self) -> &AttributeSections {
        self.attribute_sections
            .get_or_init(|| get_attribute_docs_for(&self.sections))
    }

    /// Documentation of the attribute `name` from an attribute section.
    pub fn attribute_docstring_for(&self, name: &str) -> Option<&AttributeDoc> {
        self.attribute_sections().get(name)
    }

    /// Blocks of an attribute section that followed its attribute entries.
    pub fn extra_for(&self, title: &str) -> Option<&[GravedBlock]> {
        self.attribute_sections().extra(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graver::{GraveType, GravedSpan};

    fn path() -> QualPath {
        QualPath::parse("hata.Guild").unwrap()
    }

    fn parse(text: &str) -> (Option<DocString>, WarningSink) {
        let mut warnings = WarningSink::new();
        let docstring = DocString::parse(text, &path(), &mut warnings);
        (docstring, warnings)
    }

    #[test]
    fn test_summary_and_parameters() {
        let (docstring, warnings) =
            parse("Summary.\n\nParameters\n----------\nx : int\n    The value.");
        let docstring = docstring.unwrap();
        assert!(warnings.is_empty());

        let sections = docstring.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, None);
        assert_eq!(
            sections[0].blocks,
            vec![GravedBlock::Description(GravedDescription {
                content: vec![GravedSpan::Text("Summary.".into())]
            })]
        );

        assert_eq!(sections[1].name.as_deref(), Some("Parameters"));
        let GravedBlock::Description(header) = &sections[1].blocks[0] else {
            panic!("expected the attribute header first");
        };
        assert_eq!(header.content, vec![GravedSpan::Text("x : int".into())]);
        assert!(matches!(sections[1].blocks[1], GravedBlock::Indent(_)));
    }

    #[test]
    fn test_blank_docstring_is_none() {
        let (docstring, _) = parse("   \n\n  ");
        assert!(docstring.is_none());
    }

    #[test]
    fn test_empty_section_warns() {
        let (docstring, warnings) = parse("Summary.\n\nNotes\n-----\n\n\nReturns\n-------\n`int`");
        let docstring = docstring.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings.iter().next().unwrap().reason.contains("Notes"));
        assert!(docstring.section("Notes").is_none());
        assert!(docstring.section("Returns").is_some());
    }

    #[test]
    fn test_indented_start_warns() {
        let (docstring, warnings) = parse("    Summary.\n    More.");
        assert!(docstring.is_some());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_summary() {
        let (docstring, _) = parse("Represents a ``Guild``.\n\nMore text.");
        let docstring = docstring.unwrap();
        let summary = docstring.summary().unwrap();
        assert_eq!(summary.len(), 3);
        assert_eq!(
            summary[1].as_grave().map(|grave| grave.kind),
            Some(GraveType::GlobalReference)
        );
    }

    #[test]
    fn test_attribute_docstring_lookup() {
        let text = "A guild.\n\nAttributes\n----------\nid : `int`\n    The guild's id.\nname : `str`\n    The guild's name.\n\nNotes about them.";
        let (docstring, _) = parse(text);
        let docstring = docstring.unwrap();

        let id = docstring.attribute_docstring_for("id").unwrap();
        assert_eq!(id.name, "id");
        assert_eq!(id.separator, ':');
        assert!(id.body.is_some());
        assert!(docstring.attribute_docstring_for("name").is_some());
        assert!(docstring.attribute_docstring_for("missing").is_none());

        let extra = docstring.extra_for("Attributes").unwrap();
        assert_eq!(extra.len(), 1);
    }
}
