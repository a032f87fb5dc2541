//! Output formatting for the command line.
//!
//! Formats unit trees, search results, rendered docstrings and highlight
//! tokens as human-readable text or JSON.

use serde::Serialize;
use thiserror::Error;

use crate::highlight::Token;
use crate::mapper::{UnitGraph, UnitId, UnitKind};
use crate::qualpath::QualPath;
use crate::tree::{render_tree, Structure};

/// Errors that can occur during output formatting.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Box-drawing trees and plain lines (default).
    #[default]
    Text,
    /// JSON for programmatic access.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Serialize)]
struct JsonUnit {
    name: String,
    path: String,
    kind: UnitKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alternative_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    /// Defining path of a re-exported unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    alias_of: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonUnit>,
}

fn first_line(docstring: &str) -> Option<String> {
    docstring
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn unit_to_json(
    graph: &UnitGraph,
    id: UnitId,
    name: &str,
    parent: Option<&QualPath>,
    depth: usize,
    max_depth: Option<usize>,
) -> Option<JsonUnit> {
    let unit = graph.get(id)?;
    let aliased = parent.is_some_and(|parent| unit.path.parent() != *parent);

    let mut children = Vec::new();
    if !aliased && max_depth.map_or(true, |max| depth < max) {
        for (child_name, child) in graph.children(id) {
            if let Some(entry) =
                unit_to_json(graph, child.id, child_name, Some(&unit.path), depth + 1, max_depth)
            {
                children.push(entry);
            }
        }
    }

    Some(JsonUnit {
        name: name.to_string(),
        path: unit.path.to_string(),
        kind: unit.kind,
        alternative_paths: unit.alternative_paths.iter().map(QualPath::to_string).collect(),
        signature: unit.signature.clone(),
        summary: unit.docstring.as_deref().and_then(first_line),
        line: unit.line,
        alias_of: aliased.then(|| unit.path.to_string()),
        children,
    })
}

/// Format the unit tree rooted at `id`.
pub fn format_map(
    graph: &UnitGraph,
    id: UnitId,
    max_depth: Option<usize>,
    format: OutputFormat,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Text => Ok(Structure::unit_tree(graph, id, max_depth)
            .map(|tree| render_tree(&tree, false))
            .unwrap_or_default()),
        OutputFormat::Json => {
            let name = graph.get(id).map(|unit| unit.path.to_string()).unwrap_or_default();
            let root = unit_to_json(graph, id, &name, None, 0, max_depth);
            Ok(serde_json::to_string_pretty(&root)?)
        }
    }
}

/// Format fuzzy search results, best match first.
pub fn format_search(
    query: &str,
    results: &[QualPath],
    format: OutputFormat,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for path in results {
                output.push_str(&path.to_string());
                output.push('\n');
            }
            Ok(output)
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Output<'a> {
                query: &'a str,
                results: &'a [QualPath],
            }
            Ok(serde_json::to_string_pretty(&Output { query, results })?)
        }
    }
}

/// A rendered unit documentation.
#[derive(Debug, Clone, Serialize)]
pub struct DocOutput {
    pub path: String,
    pub kind: UnitKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Structure>,
    pub warnings: Vec<String>,
}

/// Format a rendered documentation. Text output prefers HTML when present.
pub fn format_doc(doc: &DocOutput, format: OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(doc)?),
        OutputFormat::Text => {
            if let Some(html) = &doc.html {
                return Ok(html.clone());
            }
            let mut output = format!("{} ({})\n", doc.path, doc.kind);
            if let Some(signature) = &doc.signature {
                output.push_str("\n    ");
                output.push_str(signature);
                output.push('\n');
            }
            if let Some(contents) = &doc.contents {
                output.push('\n');
                output.push_str(&render_tree(contents, true));
            }
            if !doc.text.is_empty() {
                output.push('\n');
                output.push_str(&doc.text);
                output.push('\n');
            }
            Ok(output)
        }
    }
}

/// Format highlight output: the HTML, or the token list as JSON.
pub fn format_highlight(
    tokens: &[Token],
    html: &str,
    format: OutputFormat,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Text => Ok(html.to_string()),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Output<'a> {
                tokens: &'a [Token],
                html: &'a str,
            }
            Ok(serde_json::to_string_pretty(&Output { tokens, html })?)
        }
    }
}
