//! HTML rendering of docstrings and unit pages.

use crate::docstring::{
    AttributeDoc, DocString, GravedBlock, GravedCodeBlock, GravedListing, GravedTable,
};
use crate::graver::{needs_glue, Grave, GraveType, GravedSpan};
use crate::highlight::HighlightTheme;
use crate::mapper::{Unit, UnitGraph, UnitId};
use crate::qualpath::QualPath;
use crate::warnings::WarningSink;

use super::links::{link_to, page_and_anchor, resolve_local_reference, resolve_reference};
use super::{anchor, push_escaped};

const PYTHON_LANGUAGES: &[&str] = &["py", "py3", "python", "python3", "pycon"];

/// A member shown on a page together with its parsed docstring.
#[derive(Debug, Clone, Copy)]
pub struct MemberDoc<'d> {
    pub unit: &'d Unit,
    pub docstring: Option<&'d DocString>,
    /// Entry of the parent's attribute sections, for members without a
    /// docstring of their own.
    pub attribute: Option<&'d AttributeDoc>,
}

/// Renders the docstring of one unit.
///
/// Plain renderers link every unit to its own page. Extended renderers put
/// functions, properties and attributes on their parent's page, linking to
/// them as `#name`.
#[derive(Debug, Clone)]
pub struct HtmlRenderer<'a> {
    graph: &'a UnitGraph,
    theme: &'a HighlightTheme,
    path: &'a QualPath,
    unit: Option<&'a Unit>,
    page: QualPath,
    extended: bool,
}

impl<'a> HtmlRenderer<'a> {
    pub fn new(graph: &'a UnitGraph, theme: &'a HighlightTheme, path: &'a QualPath) -> Self {
        let unit = graph.lookup(path).and_then(|id| graph.get(id));
        Self {
            graph,
            theme,
            path,
            unit,
            page: path.clone(),
            extended: false,
        }
    }

    /// Switch to anchored member links.
    pub fn extended(mut self) -> Self {
        self.extended = true;
        if let Some(unit) = self.unit {
            self.page = page_and_anchor(self.graph, unit).0;
        }
        self
    }

    /// Renderer for a member shown on the same page.
    fn for_member<'m>(&self, member: &'m Unit) -> HtmlRenderer<'m>
    where
        'a: 'm,
    {
        HtmlRenderer {
            graph: self.graph,
            theme: self.theme,
            path: &member.path,
            unit: Some(member),
            page: self.page.clone(),
            extended: self.extended,
        }
    }

    fn anchor_prefix(&self) -> String {
        anchor("", self.path.name())
    }

    /// Render every section of `doc`.
    pub fn render_docstring(&self, doc: &DocString, warnings: &mut WarningSink) -> String {
        let mut output = String::new();
        self.push_docstring(&mut output, doc, warnings);
        output
    }

    fn push_docstring(&self, output: &mut String, doc: &DocString, warnings: &mut WarningSink) {
        let prefix = self.anchor_prefix();
        for section in doc.sections() {
            if let Some(name) = &section.name {
                output.push_str("<h2 id=\"");
                output.push_str(&anchor(&prefix, name));
                output.push_str("\">");
                push_escaped(output, name);
                output.push_str("</h2>\n");
            }
            self.push_blocks(output, &section.blocks, warnings);
        }
    }

    /// Render a sequence of blocks.
    pub fn render_blocks(&self, blocks: &[GravedBlock], warnings: &mut WarningSink) -> String {
        let mut output = String::new();
        self.push_blocks(&mut output, blocks, warnings);
        output
    }

    fn push_blocks(&self, output: &mut String, blocks: &[GravedBlock], warnings: &mut WarningSink) {
        for block in blocks {
            match block {
                GravedBlock::Description(description) => {
                    output.push_str("<p>");
                    self.push_spans(output, &description.content, warnings);
                    output.push_str("</p>\n");
                }
                GravedBlock::Table(table) => self.push_table(output, table, warnings),
                GravedBlock::Listing(listing) => self.push_listing(output, listing, warnings),
                GravedBlock::CodeBlock(code) => self.push_code(output, code),
                GravedBlock::BlockQuote(quote) => {
                    output.push_str("<blockquote>\n");
                    for description in &quote.descriptions {
                        output.push_str("<p>");
                        self.push_spans(output, &description.content, warnings);
                        output.push_str("</p>\n");
                    }
                    output.push_str("</blockquote>\n");
                }
                GravedBlock::Indent(indent) => {
                    output.push_str("<div class=\"sub_section\">\n");
                    self.push_blocks(output, &indent.blocks, warnings);
                    output.push_str("</div>\n");
                }
            }
        }
    }

    fn push_table(&self, output: &mut String, table: &GravedTable, warnings: &mut WarningSink) {
        output.push_str("<table class=\"parameter_table\">\n");
        for (index, row) in table.rows.iter().enumerate() {
            let cell = if index == 0 { "th" } else { "td" };
            output.push_str("<tr>");
            for value in row {
                output.push('<');
                output.push_str(cell);
                output.push('>');
                if let Some(spans) = value {
                    self.push_spans(output, spans, warnings);
                }
                output.push_str("</");
                output.push_str(cell);
                output.push('>');
            }
            output.push_str("</tr>\n");
        }
        output.push_str("</table>\n");
    }

    fn push_listing(&self, output: &mut String, listing: &GravedListing, warnings: &mut WarningSink) {
        output.push_str("<ul>\n");
        for element in &listing.elements {
            output.push_str("<li>");
            if let Some(head) = &element.head {
                self.push_spans(output, head, warnings);
            }
            if let Some(content) = &element.content {
                output.push_str("\n<div class=\"sub_section\">\n");
                self.push_blocks(output, content, warnings);
                output.push_str("</div>\n");
            }
            output.push_str("</li>\n");
        }
        output.push_str("</ul>\n");
    }

    fn push_code(&self, output: &mut String, code: &GravedCodeBlock) {
        let is_python = code
            .language
            .as_deref()
            .map_or(true, |language| PYTHON_LANGUAGES.contains(&language.to_ascii_lowercase().as_str()));
        output.push_str("<pre><code");
        if let Some(language) = &code.language {
            output.push_str(" class=\"language-");
            push_escaped(output, language);
            output.push('"');
        }
        output.push('>');
        let source = code.lines.join("\n");
        if is_python {
            output.push_str(&self.theme.highlight(&source));
        } else {
            push_escaped(output, &source);
        }
        output.push_str("</code></pre>\n");
    }

    /// Render graved spans, joined the way plain text joins them.
    pub fn render_spans(&self, spans: &[GravedSpan], warnings: &mut WarningSink) -> String {
        let mut output = String::new();
        self.push_spans(&mut output, spans, warnings);
        output
    }

    fn push_spans(&self, output: &mut String, spans: &[GravedSpan], warnings: &mut WarningSink) {
        let mut previous = String::new();
        for span in spans {
            let raw = match span {
                GravedSpan::Text(text) => text.as_str(),
                GravedSpan::Grave(grave) => grave.content.as_str(),
            };
            if needs_glue(&previous, raw) {
                output.push(' ');
            }
            match span {
                GravedSpan::Text(text) => push_escaped(output, text),
                GravedSpan::Grave(grave) => self.push_grave(output, grave, warnings),
            }
            previous.clear();
            previous.push_str(raw);
        }
    }

    fn push_grave(&self, output: &mut String, grave: &Grave, warnings: &mut WarningSink) {
        match grave.kind {
            GraveType::Builtin => self.push_code_span(output, "builtin", &grave.content),
            GraveType::Quote => self.push_code_span(output, "quote", &grave.content),
            GraveType::Expression => {
                output.push_str("<code class=\"expression\">");
                output.push_str(&self.theme.highlight(&grave.content));
                output.push_str("</code>");
            }
            GraveType::Link => match grave.link_parts() {
                Some((title, url)) => {
                    output.push_str("<a href=\"");
                    push_escaped(output, url);
                    output.push_str("\">");
                    push_escaped(output, title);
                    output.push_str("</a>");
                }
                None => self.push_code_span(output, "quote", &grave.content),
            },
            GraveType::LocalReference => {
                let target = self
                    .unit
                    .and_then(|unit| resolve_local_reference(self.graph, unit, &grave.content));
                match target {
                    Some(id) => self.push_reference_link(output, id, &grave.content),
                    None => self.push_code_span(output, "reference", &grave.content),
                }
            }
            GraveType::GlobalReference => {
                match resolve_reference(self.graph, self.path, &grave.content) {
                    Some(id) => self.push_reference_link(output, id, &grave.content),
                    None => {
                        warnings.warn(
                            self.path,
                            format!("Unresolved reference: {:?}.", grave.content),
                        );
                        output.push_str("<code>");
                        push_escaped(output, &grave.content);
                        output.push_str("</code>");
                    }
                }
            }
        }
    }

    fn push_code_span(&self, output: &mut String, class: &str, content: &str) {
        output.push_str("<code class=\"");
        output.push_str(class);
        output.push_str("\">");
        push_escaped(output, content);
        output.push_str("</code>");
    }

    fn push_reference_link(&self, output: &mut String, id: UnitId, content: &str) {
        let Some(target) = self.graph.get(id) else {
            self.push_code_span(output, "reference", content);
            return;
        };
        output.push_str("<a class=\"reference\" href=\"");
        push_escaped(output, &link_to(self.graph, &self.page, target, self.extended));
        output.push_str("\">");
        push_escaped(output, content);
        output.push_str("</a>");
    }

    fn push_signature(&self, output: &mut String, unit: &Unit) {
        if let Some(signature) = &unit.signature {
            output.push_str("<pre><code class=\"signature\">");
            output.push_str(&self.theme.highlight(signature));
            output.push_str("</code></pre>\n");
        }
    }

    fn push_attribute_doc(&self, output: &mut String, doc: &AttributeDoc, warnings: &mut WarningSink) {
        output.push_str("<p>");
        self.push_spans(output, &doc.head, warnings);
        output.push_str("</p>\n");
        if let Some(body) = &doc.body {
            output.push_str("<div class=\"sub_section\">\n");
            self.push_blocks(output, body, warnings);
            output.push_str("</div>\n");
        }
    }

    /// Render the page of the unit: title, signature, docstring and members.
    ///
    /// Extended renderers inline non-page members as anchored sections; all
    /// other members are listed with links and summaries.
    pub fn render_page(
        &self,
        doc: Option<&DocString>,
        members: &[MemberDoc<'_>],
        warnings: &mut WarningSink,
    ) -> String {
        let mut output = String::with_capacity(4096);
        let prefix = self.anchor_prefix();

        output.push_str("<article id=\"");
        output.push_str(&prefix);
        output.push_str("\">\n<h1>");
        push_escaped(&mut output, &self.path.to_string());
        if let Some(unit) = self.unit {
            output.push_str(" <small>");
            output.push_str(unit.kind.as_str());
            output.push_str("</small>");
        }
        output.push_str("</h1>\n");

        if let Some(unit) = self.unit {
            self.push_signature(&mut output, unit);
        }
        if let Some(doc) = doc {
            self.push_docstring(&mut output, doc, warnings);
        }

        let (inline, listed): (Vec<&MemberDoc<'_>>, Vec<&MemberDoc<'_>>) =
            members.iter().partition(|member: &&MemberDoc<'_>| {
                self.extended && page_and_anchor(self.graph, member.unit).0 == self.page
            });

        if !listed.is_empty() {
            output.push_str("<h2 id=\"");
            output.push_str(&anchor(&prefix, "Members"));
            output.push_str("\">Members</h2>\n<ul class=\"unit_listing\">\n");
            for member in &listed {
                output.push_str("<li><a href=\"");
                push_escaped(
                    &mut output,
                    &link_to(self.graph, &self.page, member.unit, self.extended),
                );
                output.push_str("\">");
                push_escaped(&mut output, member.unit.name());
                output.push_str("</a> <em>");
                output.push_str(member.unit.kind.as_str());
                output.push_str("</em>");
                let summary = member
                    .docstring
                    .and_then(DocString::summary)
                    .or_else(|| member.attribute.map(|attribute| &attribute.head));
                if let Some(summary) = summary {
                    output.push_str(": ");
                    self.for_member(member.unit)
                        .push_spans(&mut output, summary, warnings);
                }
                output.push_str("</li>\n");
            }
            output.push_str("</ul>\n");
        }

        for member in inline {
            let renderer = self.for_member(member.unit);
            output.push_str("<section id=\"");
            output.push_str(&anchor("", member.unit.name()));
            output.push_str("\">\n<h3>");
            push_escaped(&mut output, member.unit.name());
            output.push_str(" <small>");
            output.push_str(member.unit.kind.as_str());
            output.push_str("</small></h3>\n");
            renderer.push_signature(&mut output, member.unit);
            match (member.docstring, member.attribute) {
                (Some(doc), _) => renderer.push_docstring(&mut output, doc, warnings),
                (None, Some(attribute)) => renderer.push_attribute_doc(&mut output, attribute, warnings),
                (None, None) => {}
            }
            output.push_str("</section>\n");
        }

        output.push_str("</article>\n");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::UnitKind;

    fn path(value: &str) -> QualPath {
        QualPath::parse(value).unwrap()
    }

    fn graph() -> UnitGraph {
        let mut graph = UnitGraph::new();
        for (kind, value) in [
            (UnitKind::Module, "hata"),
            (UnitKind::Type, "hata.Guild"),
            (UnitKind::Function, "hata.Guild.get_channel"),
            (UnitKind::Type, "hata.Channel"),
        ] {
            graph.insert(kind, path(value));
        }
        graph
    }

    fn parse(text: &str, at: &QualPath) -> DocString {
        let mut warnings = WarningSink::new();
        DocString::parse(text, at, &mut warnings).unwrap()
    }

    #[test]
    fn test_render_graves() {
        let graph = graph();
        let theme = HighlightTheme::default();
        let at = path("hata.Guild");
        let doc = parse(
            "Returns an `int` from ``Channel`` via `get_channel`, see `docs:https://example.com`.",
            &at,
        );
        let mut warnings = WarningSink::new();
        let html = HtmlRenderer::new(&graph, &theme, &at).render_docstring(&doc, &mut warnings);

        assert!(html.contains("<code class=\"builtin\">int</code>"));
        assert!(html.contains("<a class=\"reference\" href=\"../Channel/index.html\">Channel</a>"));
        assert!(html.contains("<a class=\"reference\" href=\"get_channel/index.html\">get_channel</a>"));
        assert!(html.contains("<a href=\"https://example.com\">docs</a>."));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_extended_member_anchor() {
        let graph = graph();
        let theme = HighlightTheme::default();
        let at = path("hata.Guild");
        let doc = parse("Use `get_channel`.", &at);
        let mut warnings = WarningSink::new();
        let html = HtmlRenderer::new(&graph, &theme, &at)
            .extended()
            .render_docstring(&doc, &mut warnings);
        assert!(html.contains("href=\"#get_channel\""));
    }

    #[test]
    fn test_unresolved_reference_warns() {
        let graph = graph();
        let theme = HighlightTheme::default();
        let at = path("hata.Guild");
        let doc = parse("See ``Missing``.", &at);
        let mut warnings = WarningSink::new();
        let html = HtmlRenderer::new(&graph, &theme, &at).render_docstring(&doc, &mut warnings);
        assert!(html.contains("<code>Missing</code>"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_block_classes() {
        let graph = graph();
        let theme = HighlightTheme::default();
        let at = path("hata.Guild");
        let doc = parse(
            "Summary.\n\nParameters\n----------\n| A | B |\n|---|---|\n| 1 | 2 |\n\nNotes\n-----\n- item\n    nested text\n",
            &at,
        );
        let mut warnings = WarningSink::new();
        let html = HtmlRenderer::new(&graph, &theme, &at).render_docstring(&doc, &mut warnings);
        assert!(html.contains("<h2 id=\"guild-parameters\">Parameters</h2>"));
        assert!(html.contains("<table class=\"parameter_table\">"));
        assert!(html.contains("<th>A</th>"));
        assert!(html.contains("<td>2</td>"));
        assert!(html.contains("<div class=\"sub_section\">"));
    }

    #[test]
    fn test_page_listing() {
        let graph = graph();
        let theme = HighlightTheme::default();
        let at = path("hata.Guild");
        let method = graph
            .get(graph.lookup_str("hata.Guild.get_channel").unwrap())
            .unwrap();
        let method_doc = parse("Returns a channel.", &method.path);
        let members = [MemberDoc {
            unit: method,
            docstring: Some(&method_doc),
            attribute: None,
        }];

        let mut warnings = WarningSink::new();
        let plain = HtmlRenderer::new(&graph, &theme, &at).render_page(None, &members, &mut warnings);
        assert!(plain.contains("<ul class=\"unit_listing\">"));
        assert!(plain.contains("<a href=\"get_channel/index.html\">get_channel</a> <em>function</em>: Returns a channel."));

        let extended = HtmlRenderer::new(&graph, &theme, &at)
            .extended()
            .render_page(None, &members, &mut warnings);
        assert!(extended.contains("<section id=\"get_channel\">"));
        assert!(!extended.contains("unit_listing"));
    }
}
