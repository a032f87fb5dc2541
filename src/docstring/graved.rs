//! Blocks after the graving pass.

use super::blocks::{
    TextBlock, TextBlockQuote, TextCodeBlock, TextDescription, TextIndent, TextListing,
    TextListingElement, TextTable,
};
use crate::graver::{build_graves, GravedText};
use crate::qualpath::QualPath;
use crate::warnings::WarningSink;

/// Where graving warnings go.
pub struct GraveContext<'a> {
    pub path: &'a QualPath,
    pub warnings: &'a mut WarningSink,
}

impl<'a> GraveContext<'a> {
    pub fn new(path: &'a QualPath, warnings: &'a mut WarningSink) -> Self {
        Self { path, warnings }
    }

    fn grave(&mut self, text: &str) -> Option<GravedText> {
        let (spans, reasons) = build_graves(text);
        self.warnings.extend(self.path, reasons);
        (!spans.is_empty()).then_some(spans)
    }

    fn warn(&mut self, reason: &str) {
        self.warnings.warn(self.path, reason);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GravedDescription {
    pub content: GravedText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GravedTable {
    pub size: (usize, usize),
    pub rows: Vec<Vec<Option<GravedText>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GravedListingElement {
    pub head: Option<GravedText>,
    pub content: Option<Vec<GravedBlock>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GravedListing {
    pub elements: Vec<GravedListingElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GravedCodeBlock {
    pub language: Option<String>,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GravedBlockQuote {
    pub descriptions: Vec<GravedDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GravedIndent {
    pub blocks: Vec<GravedBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GravedBlock {
    Description(GravedDescription),
    Table(GravedTable),
    Listing(GravedListing),
    CodeBlock(GravedCodeBlock),
    BlockQuote(GravedBlockQuote),
    Indent(GravedIndent),
}

impl TextDescription {
    pub fn graved(&self, ctx: &mut GraveContext<'_>) -> Option<GravedDescription> {
        let content = ctx.grave(&self.text);
        if content.is_none() {
            ctx.warn("Empty description.");
        }
        content.map(|content| GravedDescription { content })
    }
}

impl TextTable {
    pub fn graved(&self, ctx: &mut GraveContext<'_>) -> Option<GravedTable> {
        let rows: Vec<Vec<Option<GravedText>>> = self
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_deref().and_then(|cell| ctx.grave(cell)))
                    .collect()
            })
            .collect();

        if rows.iter().flatten().all(Option::is_none) {
            ctx.warn("Empty table.");
            return None;
        }
        Some(GravedTable {
            size: self.size(),
            rows,
        })
    }
}

impl TextListingElement {
    pub fn graved(&self, ctx: &mut GraveContext<'_>) -> Option<GravedListingElement> {
        let head = self.head.as_deref().and_then(|head| ctx.grave(head));
        let content = self
            .content
            .as_deref()
            .and_then(|blocks| build_graves_on_subsection(blocks, ctx));
        if head.is_none() && content.is_none() {
            return None;
        }
        Some(GravedListingElement { head, content })
    }
}

impl TextListing {
    pub fn graved(&self, ctx: &mut GraveContext<'_>) -> Option<GravedListing> {
        let elements: Vec<_> = self
            .elements
            .iter()
            .filter_map(|element| element.graved(ctx))
            .collect();
        if elements.is_empty() {
            ctx.warn("Empty listing.");
            return None;
        }
        Some(GravedListing { elements })
    }
}

impl TextCodeBlock {
    pub fn graved(&self, _ctx: &mut GraveContext<'_>) -> Option<GravedCodeBlock> {
        Some(GravedCodeBlock {
            language: self.language.clone(),
            lines: self.lines.clone(),
        })
    }
}

impl TextBlockQuote {
    pub fn graved(&self, ctx: &mut GraveContext<'_>) -> Option<GravedBlockQuote> {
        let descriptions: Vec<_> = self
            .descriptions
            .iter()
            .filter_map(|description| description.graved(ctx))
            .collect();
        (!descriptions.is_empty()).then_some(GravedBlockQuote { descriptions })
    }
}

impl TextIndent {
    pub fn graved(&self, ctx: &mut GraveContext<'_>) -> Option<GravedIndent> {
        build_graves_on_subsection(&self.blocks, ctx).map(|blocks| GravedIndent { blocks })
    }
}

impl TextBlock {
    pub fn graved(&self, ctx: &mut GraveContext<'_>) -> Option<GravedBlock> {
        match self {
            TextBlock::Description(block) => block.graved(ctx).map(GravedBlock::Description),
            TextBlock::Table(block) => block.graved(ctx).map(GravedBlock::Table),
            TextBlock::Listing(block) => block.graved(ctx).map(GravedBlock::Listing),
            TextBlock::CodeBlock(block) => block.graved(ctx).map(GravedBlock::CodeBlock),
            TextBlock::BlockQuote(block) => block.graved(ctx).map(GravedBlock::BlockQuote),
            TextBlock::Indent(block) => block.graved(ctx).map(GravedBlock::Indent),
        }
    }
}

/// Grave every block, dropping the ones that come out empty. `None` when
/// nothing is left.
pub fn build_graves_on_subsection(
    blocks: &[TextBlock],
    ctx: &mut GraveContext<'_>,
) -> Option<Vec<GravedBlock>> {
    let graved: Vec<GravedBlock> = blocks.iter().filter_map(|block| block.graved(ctx)).collect();
    (!graved.is_empty()).then_some(graved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graver::{GraveType, GravedSpan};

    #[test]
    fn test_listing_graved_recursively() {
        let listing = TextBlock::Listing(TextListing {
            elements: vec![TextListingElement {
                head: Some("uses `int`".into()),
                content: Some(vec![TextBlock::Description(TextDescription {
                    text: "see ``Guild``".into(),
                })]),
            }],
        });
        let path = QualPath::parse("pkg").unwrap();
        let mut warnings = WarningSink::new();
        let mut ctx = GraveContext::new(&path, &mut warnings);

        let Some(GravedBlock::Listing(graved)) = listing.graved(&mut ctx) else {
            panic!("expected listing");
        };
        let head = graved.elements[0].head.as_ref().unwrap();
        assert_eq!(head[1].as_grave().map(|grave| grave.kind), Some(GraveType::Builtin));
        let content = graved.elements[0].content.as_ref().unwrap();
        let GravedBlock::Description(description) = &content[0] else {
            panic!("expected description");
        };
        assert_eq!(description.content[0], GravedSpan::Text("see".into()));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_grave_warnings_forwarded() {
        let block = TextBlock::Description(TextDescription {
            text: "broken `markup".into(),
        });
        let path = QualPath::parse("pkg").unwrap();
        let mut warnings = WarningSink::new();
        let mut ctx = GraveContext::new(&path, &mut warnings);
        assert!(block.graved(&mut ctx).is_some());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_table_keeps_size() {
        let block = TextBlock::Table(TextTable::from_rows(vec![
            vec![Some("A".into()), Some("B".into())],
            vec![Some("1".into()), None],
        ]));
        let path = QualPath::parse("pkg").unwrap();
        let mut warnings = WarningSink::new();
        let mut ctx = GraveContext::new(&path, &mut warnings);
        let Some(GravedBlock::Table(table)) = block.graved(&mut ctx) else {
            panic!("expected table");
        };
        assert_eq!(table.size, (2, 2));
        assert_eq!(table.rows[1][1], None);
    }
}
