//! Table-of-contents structures and their tree rendering.
//!
//! A [`Structure`] is a titled node with a prefixed anchor, built from a unit
//! and its docstring sections, or from a whole unit graph. [`render_tree`]
//! draws it with box-drawing characters.

use serde::Serialize;

use crate::docstring::{is_attribute_section, DocString};
use crate::mapper::{UnitGraph, UnitId};
use crate::render::anchor;

/// A node of a table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Structure {
    pub title: String,
    /// Anchor of the title on its page.
    pub anchor: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Structure>,
}

impl Structure {
    pub fn new(title: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            anchor: anchor.into(),
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: Structure) {
        self.children.push(child);
    }

    /// Contents of the page of `id`: named docstring sections, the attributes
    /// of attribute sections, then the unit's members.
    pub fn for_unit(graph: &UnitGraph, id: UnitId, doc: Option<&DocString>) -> Option<Self> {
        let unit = graph.get(id)?;
        let prefix = anchor("", unit.name());
        let mut root = Structure::new(unit.name(), prefix.clone());

        if let Some(doc) = doc {
            for section in doc.sections() {
                let Some(name) = &section.name else {
                    continue;
                };
                let section_anchor = anchor(&prefix, name);
                let mut node = Structure::new(name.as_str(), section_anchor.clone());
                if is_attribute_section(name) {
                    for attribute in doc.attribute_sections().iter() {
                        if &attribute.section == name {
                            node.add_child(Structure::new(
                                attribute.name.as_str(),
                                anchor(&section_anchor, &attribute.name),
                            ));
                        }
                    }
                }
                root.add_child(node);
            }
        }

        for (name, _) in graph.children(id) {
            root.add_child(Structure::new(name, anchor("", name)));
        }
        Some(root)
    }

    /// Unit tree under `id`, `max_depth` levels deep. Titles carry the kind.
    pub fn unit_tree(graph: &UnitGraph, id: UnitId, max_depth: Option<usize>) -> Option<Self> {
        let unit = graph.get(id)?;
        let title = format!("{} ({})", unit.name(), unit.kind);
        let mut root = Structure::new(title, anchor("", &unit.path.to_string()));
        let mut visited = vec![id];
        collect_units(graph, id, &mut root, 1, max_depth, &mut visited);
        Some(root)
    }

    /// Count of nodes in this tree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Structure::count).sum::<usize>()
    }
}

fn collect_units(
    graph: &UnitGraph,
    id: UnitId,
    node: &mut Structure,
    depth: usize,
    max_depth: Option<usize>,
    visited: &mut Vec<UnitId>,
) {
    if max_depth.is_some_and(|max| depth > max) {
        return;
    }
    for (name, child) in graph.children(id) {
        let parent_path = graph.get(id).map(|unit| unit.path.to_string()).unwrap_or_default();
        let mut title = format!("{name} ({})", child.kind);
        // Re-exported units point at their defining path.
        let defined_here = child.path.parent().to_string() == parent_path;
        if !defined_here {
            title.push_str(" -> ");
            title.push_str(&child.path.to_string());
        }
        let mut entry = Structure::new(title, anchor(&node.anchor, name));
        if defined_here && !visited.contains(&child.id) {
            visited.push(child.id);
            collect_units(graph, child.id, &mut entry, depth + 1, max_depth, visited);
        }
        node.add_child(entry);
    }
}

/// Box-drawing characters for tree rendering.
const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const SPACE: &str = "    ";

/// Render a structure with box-drawing characters, optionally with anchors.
pub fn render_tree(root: &Structure, show_anchors: bool) -> String {
    let mut output = String::with_capacity(1024);
    render_node(&mut output, root, "", true, true, show_anchors);
    output
}

fn render_node(
    output: &mut String,
    node: &Structure,
    prefix: &str,
    is_last: bool,
    is_root: bool,
    show_anchors: bool,
) {
    let branch = if is_root {
        ""
    } else if is_last {
        LAST_BRANCH
    } else {
        BRANCH
    };

    output.push_str(prefix);
    output.push_str(branch);
    output.push_str(&node.title);
    if show_anchors {
        output.push_str(" #");
        output.push_str(&node.anchor);
    }
    output.push('\n');

    let child_count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let new_prefix = if is_root {
            String::new()
        } else {
            let continuation = if is_last { SPACE } else { VERTICAL };
            format!("{prefix}{continuation}")
        };
        render_node(output, child, &new_prefix, i + 1 == child_count, false, show_anchors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::UnitKind;
    use crate::qualpath::QualPath;
    use crate::warnings::WarningSink;

    fn graph() -> UnitGraph {
        let mut graph = UnitGraph::new();
        for (kind, path) in [
            (UnitKind::Module, "hata"),
            (UnitKind::Type, "hata.Guild"),
            (UnitKind::Function, "hata.Guild.get_channel"),
            (UnitKind::Property, "hata.Guild.name"),
        ] {
            graph.insert(kind, QualPath::parse(path).unwrap());
        }
        graph
    }

    #[test]
    fn test_for_unit() {
        let graph = graph();
        let id = graph.lookup_str("hata.Guild").unwrap();
        let path = QualPath::parse("hata.Guild").unwrap();
        let mut warnings = WarningSink::new();
        let doc = DocString::parse(
            "A guild.\n\nAttributes\n----------\nid : `int`\n    The id.\nname : `str`\n    The name.\n",
            &path,
            &mut warnings,
        )
        .unwrap();

        let structure = Structure::for_unit(&graph, id, Some(&doc)).unwrap();
        assert_eq!(structure.title, "Guild");
        assert_eq!(structure.anchor, "guild");
        let section = &structure.children[0];
        assert_eq!(section.title, "Attributes");
        assert_eq!(section.anchor, "guild-attributes");
        let names: Vec<_> = section.children.iter().map(|c| c.anchor.as_str()).collect();
        assert_eq!(names, ["guild-attributes-id", "guild-attributes-name"]);
        assert_eq!(structure.children[1].anchor, "get_channel");
        assert_eq!(structure.children[2].anchor, "name");
    }

    #[test]
    fn test_render_tree() {
        let graph = graph();
        let id = graph.lookup_str("hata").unwrap();
        let tree = Structure::unit_tree(&graph, id, None).unwrap();
        assert_eq!(tree.count(), 4);

        let output = render_tree(&tree, false);
        assert_eq!(
            output,
            "hata (module)\n└── Guild (type)\n    ├── get_channel (function)\n    └── name (property)\n"
        );
    }

    #[test]
    fn test_max_depth() {
        let graph = graph();
        let id = graph.lookup_str("hata").unwrap();
        let tree = Structure::unit_tree(&graph, id, Some(1)).unwrap();
        assert_eq!(tree.count(), 2);
        assert!(render_tree(&tree, true).contains("Guild (type) #hata-guild"));
    }
}
