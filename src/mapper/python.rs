//! Python source extraction using tree-sitter.
//!
//! Produces a [`SourceModule`]: the module docstring, its documented items
//! and the imports that may re-export other units.

use std::cell::RefCell;

use tree_sitter::{Node, Parser};

// Thread-local parser caching to avoid re-initialization overhead.
//
// No panics here: grammar loading can fail and that is reported as an error.
thread_local! {
    static PYTHON_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn init_python_parser() -> Result<Parser, ()> {
    let mut p = Parser::new();
    p.set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|_| ())?;
    Ok(p)
}

/// Execute a function with a cached Python parser.
pub(crate) fn with_python_parser<F, R>(f: F) -> Result<R, String>
where
    F: FnOnce(&mut Parser) -> R,
{
    PYTHON_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(init_python_parser().map_err(|()| "failed to initialize parser".to_string())?);
        }

        let parser = slot
            .as_mut()
            .ok_or_else(|| "failed to initialize parser".to_string())?;
        Ok(f(parser))
    })
}

/// Names never turned into units.
const IGNORED_NAMES: &[&str] = &[
    "__all__", "__annotations__", "__class__", "__class_getitem__", "__delattr__", "__dict__",
    "__dir__", "__doc__", "__eq__", "__format__", "__ge__", "__getattribute__", "__gt__",
    "__hash__", "__init_subclass__", "__le__", "__lt__", "__module__", "__ne__", "__qualname__",
    "__reduce__", "__reduce_ex__", "__repr__", "__setattr__", "__sizeof__", "__slots__",
    "__str__", "__subclasshook__", "__weakref__", "mro",
];

pub fn is_ignored_name(name: &str) -> bool {
    IGNORED_NAMES.contains(&name)
}

/// Property-like decorators.
const PROPERTY_DECORATORS: &[&str] = &["property", "cached_property", "abstractproperty"];

/// Kind of an extracted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Class,
    Function,
    Property,
    InstanceAttribute,
    ClassAttribute,
}

/// A documented definition found in a module or class body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub name: String,
    pub kind: SourceKind,
    pub docstring: Option<String>,
    pub signature: Option<String>,
    /// 1-indexed line of the definition.
    pub line: usize,
    /// Base class expressions, for classes.
    pub bases: Vec<String>,
    /// Class body members, for classes.
    pub members: Vec<SourceItem>,
    /// Right hand side of `name = other` when `other` is a plain name.
    pub alias_of: Option<String>,
}

impl SourceItem {
    fn new(name: impl Into<String>, kind: SourceKind, line: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            docstring: None,
            signature: None,
            line,
            bases: Vec::new(),
            members: Vec::new(),
            alias_of: None,
        }
    }
}

/// `from <module> import <names>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImport {
    /// Number of leading dots.
    pub level: usize,
    /// Module after the dots, possibly empty.
    pub module: String,
    /// `(imported name, local alias)`.
    pub names: Vec<(String, Option<String>)>,
    pub wildcard: bool,
}

/// Everything extracted from one module file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceModule {
    pub docstring: Option<String>,
    pub items: Vec<SourceItem>,
    pub imports: Vec<SourceImport>,
    /// Contents of `__all__`, when it is a literal list or tuple.
    pub exports: Option<Vec<String>>,
    pub has_errors: bool,
}

/// Extract the documented items of a Python module.
pub fn extract(content: &str) -> Result<SourceModule, String> {
    with_python_parser(|parser| {
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| "failed to parse".to_string())?;
        let root = tree.root_node();

        let mut module = SourceModule {
            docstring: leading_docstring(root, content),
            has_errors: root.has_error(),
            ..SourceModule::default()
        };
        let mut scope = Scope::default();
        extract_block(root, content, &mut scope, Some(&mut module));
        module.items = scope.items;
        if scope.exports.is_some() {
            module.exports = scope.exports;
        }
        Ok(module)
    })?
}

/// Items collected from a module or class body.
#[derive(Default)]
struct Scope {
    items: Vec<SourceItem>,
    slots: Vec<String>,
    exports: Option<Vec<String>>,
}

impl Scope {
    fn push(&mut self, item: SourceItem) {
        if is_ignored_name(&item.name) {
            return;
        }
        // Setters and deleters repeat the property name.
        if item.kind == SourceKind::Property
            && self.items.iter().any(|existing| existing.name == item.name)
        {
            return;
        }
        self.items.retain(|existing| existing.name != item.name);
        self.items.push(item);
    }
}

fn extract_block(
    node: Node,
    content: &str,
    scope: &mut Scope,
    mut module: Option<&mut SourceModule>,
) {
    let children: Vec<Node> = node.named_children(&mut node.walk()).collect();

    for (index, child) in children.iter().enumerate() {
        match child.kind() {
            "import_from_statement" => {
                if let Some(module) = module.as_deref_mut() {
                    module.imports.extend(extract_import(*child, content));
                }
            }
            "function_definition" => scope.push(extract_function(*child, content, &[])),
            "class_definition" => scope.push(extract_class(*child, content)),
            "decorated_definition" => {
                if let Some(item) = extract_decorated(*child, content) {
                    scope.push(item);
                }
            }
            "expression_statement" => {
                let next = children.get(index + 1).copied();
                extract_assignment(*child, next, content, scope);
            }
            "if_statement" | "try_statement" | "with_statement" => {
                for block in nested_blocks(*child) {
                    extract_block(block, content, scope, module.as_deref_mut());
                }
            }
            _ => {}
        }
    }
}

/// Bodies of the clauses of a compound statement.
fn nested_blocks(node: Node) -> Vec<Node> {
    let mut blocks = Vec::new();
    for child in node.named_children(&mut node.walk()) {
        if child.kind() == "block" {
            blocks.push(child);
        } else if child.kind().ends_with("_clause") {
            blocks.extend(nested_blocks(child));
        }
    }
    blocks
}

fn extract_import(node: Node, content: &str) -> Option<SourceImport> {
    let module_node = node.child_by_field_name("module_name")?;
    let (level, module) = match module_node.kind() {
        "relative_import" => {
            let text = node_text(module_node, content);
            let level = text.chars().take_while(|&c| c == '.').count();
            (level, text[level..].trim().to_string())
        }
        _ => (0, node_text(module_node, content)),
    };

    let mut import = SourceImport {
        level,
        module,
        names: Vec::new(),
        wildcard: false,
    };

    for child in node.named_children(&mut node.walk()) {
        if child.id() == module_node.id() {
            continue;
        }
        match child.kind() {
            "wildcard_import" => import.wildcard = true,
            "dotted_name" => import.names.push((node_text(child, content), None)),
            "aliased_import" => {
                let name = child.child_by_field_name("name").map(|n| node_text(n, content));
                let alias = child.child_by_field_name("alias").map(|n| node_text(n, content));
                if let Some(name) = name {
                    import.names.push((name, alias));
                }
            }
            _ => {}
        }
    }

    Some(import)
}

fn extract_function(node: Node, content: &str, decorators: &[String]) -> SourceItem {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, content))
        .unwrap_or_default();

    let is_async = node.children(&mut node.walk()).any(|c| c.kind() == "async");
    let is_property = decorators.iter().any(|decorator| is_property_decorator(decorator));

    let mut signature = String::new();
    if is_async {
        signature.push_str("async ");
    }
    signature.push_str("def ");
    signature.push_str(&name);
    if let Some(params) = node.child_by_field_name("parameters") {
        signature.push_str(&collapse_whitespace(&node_text(params, content)));
    }
    if let Some(ret) = node.child_by_field_name("return_type") {
        signature.push_str(" -> ");
        signature.push_str(&node_text(ret, content));
    }

    let kind = if is_property {
        SourceKind::Property
    } else {
        SourceKind::Function
    };
    let mut item = SourceItem::new(name, kind, node.start_position().row + 1);
    item.signature = Some(signature);
    item.docstring = body_docstring(node, content);
    item
}

fn extract_class(node: Node, content: &str) -> SourceItem {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, content))
        .unwrap_or_default();

    let bases: Vec<String> = node
        .child_by_field_name("superclasses")
        .map(|args| {
            args.named_children(&mut args.walk())
                .filter(|arg| arg.kind() != "keyword_argument")
                .map(|arg| node_text(arg, content))
                .collect()
        })
        .unwrap_or_default();

    let mut signature = format!("class {name}");
    if !bases.is_empty() {
        signature.push('(');
        signature.push_str(&bases.join(", "));
        signature.push(')');
    }

    let mut scope = Scope::default();
    if let Some(body) = node.child_by_field_name("body") {
        extract_block(body, content, &mut scope, None);
    }

    let mut members = scope.items;
    for slot in scope.slots {
        if is_ignored_name(&slot) || members.iter().any(|member| member.name == slot) {
            continue;
        }
        members.push(SourceItem::new(
            slot,
            SourceKind::InstanceAttribute,
            node.start_position().row + 1,
        ));
    }

    let mut item = SourceItem::new(name, SourceKind::Class, node.start_position().row + 1);
    item.signature = Some(signature);
    item.docstring = body_docstring(node, content);
    item.bases = bases;
    item.members = members;
    item
}

fn extract_decorated(node: Node, content: &str) -> Option<SourceItem> {
    let decorators: Vec<String> = node
        .named_children(&mut node.walk())
        .filter(|child| child.kind() == "decorator")
        .map(|decorator| {
            node_text(decorator, content)
                .trim_start_matches('@')
                .trim()
                .to_string()
        })
        .collect();

    let definition = node.child_by_field_name("definition")?;
    match definition.kind() {
        "function_definition" => Some(extract_function(definition, content, &decorators)),
        "class_definition" => Some(extract_class(definition, content)),
        _ => None,
    }
}

fn is_property_decorator(decorator: &str) -> bool {
    let name = decorator.split('(').next().unwrap_or(decorator).trim();
    let last = name.rsplit('.').next().unwrap_or(name);
    PROPERTY_DECORATORS.contains(&last)
        || (name.contains('.') && matches!(last, "setter" | "getter" | "deleter"))
}

fn extract_assignment(node: Node, next: Option<Node>, content: &str, scope: &mut Scope) {
    let Some(assignment) = node.named_child(0).filter(|n| n.kind() == "assignment") else {
        return;
    };
    let Some(left) = assignment.child_by_field_name("left") else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let name = node_text(left, content);
    let right = assignment.child_by_field_name("right");

    if name == "__slots__" {
        if let Some(right) = right {
            scope.slots.extend(string_elements(right, content));
        }
        return;
    }
    if name == "__all__" {
        if let Some(right) = right {
            scope.exports = Some(string_elements(right, content));
        }
        return;
    }

    let mut item = SourceItem::new(
        name,
        SourceKind::ClassAttribute,
        node.start_position().row + 1,
    );
    if let Some(right) = right {
        if matches!(right.kind(), "identifier" | "attribute") {
            item.alias_of = Some(node_text(right, content));
        }
        let value = collapse_whitespace(&node_text(right, content));
        item.signature = Some(format!("{} = {}", item.name, value));
    }
    // A string statement right after an assignment documents it.
    item.docstring = next.and_then(|next| statement_string(next, content));
    scope.push(item);
}

/// String literals of a list, tuple or single string expression.
fn string_elements(node: Node, content: &str) -> Vec<String> {
    match node.kind() {
        "string" => string_value(node, content).into_iter().collect(),
        "list" | "tuple" | "parenthesized_expression" | "expression_list" => node
            .named_children(&mut node.walk())
            .filter(|child| child.kind() == "string")
            .filter_map(|child| string_value(child, content))
            .collect(),
        _ => Vec::new(),
    }
}

fn leading_docstring(node: Node, content: &str) -> Option<String> {
    let first = node.named_child(0)?;
    statement_string(first, content)
}

fn body_docstring(node: Node, content: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    leading_docstring(body, content)
}

/// The string of an expression statement made of a single string literal.
fn statement_string(node: Node, content: &str) -> Option<String> {
    if node.kind() != "expression_statement" || node.named_child_count() != 1 {
        return None;
    }
    let string = node.named_child(0).filter(|n| n.kind() == "string")?;
    string_value(string, content)
}

/// Decode a Python string literal.
pub fn string_value(node: Node, content: &str) -> Option<String> {
    decode_string_literal(&node_text(node, content))
}

/// Strip prefix and quotes from a string literal and resolve simple escapes.
pub fn decode_string_literal(literal: &str) -> Option<String> {
    let prefix_len = literal
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    let prefix = literal[..prefix_len].to_ascii_lowercase();
    if prefix.contains('b') {
        return None;
    }
    let body = &literal[prefix_len..];

    let inner = ["\"\"\"", "'''", "\"", "'"].iter().find_map(|quote| {
        body.strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })?;

    if prefix.contains('r') {
        return Some(inner.to_string());
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Some(out)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract node text from content.
pub(crate) fn node_text(node: Node, content: &str) -> String {
    content[node.byte_range()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(items: &'a [SourceItem], name: &str) -> &'a SourceItem {
        items
            .iter()
            .find(|item| item.name == name)
            .unwrap_or_else(|| panic!("missing item {name}"))
    }

    #[test]
    fn test_extract_function() {
        let code = r#"
def greet(name: str) -> str:
    """Greet someone."""
    return f"Hello, {name}"
"#;
        let module = extract(code).unwrap();
        assert_eq!(module.items.len(), 1);

        let item = &module.items[0];
        assert_eq!(item.name, "greet");
        assert_eq!(item.kind, SourceKind::Function);
        assert_eq!(item.docstring.as_deref(), Some("Greet someone."));
        assert_eq!(item.signature.as_deref(), Some("def greet(name: str) -> str"));
    }

    #[test]
    fn test_module_docstring() {
        let code = "\"\"\"\nGuild models.\n\"\"\"\n\nimport os\n";
        let module = extract(code).unwrap();
        assert_eq!(module.docstring.as_deref(), Some("\nGuild models.\n"));
    }

    #[test]
    fn test_extract_class_members() {
        let code = r#"
class Guild(DiscordEntity, immortal=True):
    """Represents a guild."""
    __slots__ = ('name', 'owner_id')

    def __init__(self, name):
        self.name = name

    def __repr__(self):
        return ''

    @property
    def created_at(self):
        """When the guild was created."""
        return None

    @created_at.setter
    def created_at(self, value):
        pass

    @classmethod
    def from_data(cls, data):
        pass

    async def edit(self, **kwargs):
        pass

    get_name = __init__
    LIMIT = 100
    """Maximal member count."""
"#;
        let module = extract(code).unwrap();
        let guild = find(&module.items, "Guild");
        assert_eq!(guild.kind, SourceKind::Class);
        assert_eq!(guild.bases, ["DiscordEntity"]);
        assert_eq!(guild.docstring.as_deref(), Some("Represents a guild."));

        let members = &guild.members;
        assert!(members.iter().all(|member| member.name != "__repr__"));
        assert_eq!(find(members, "__init__").kind, SourceKind::Function);

        let created_at = find(members, "created_at");
        assert_eq!(created_at.kind, SourceKind::Property);
        assert_eq!(created_at.docstring.as_deref(), Some("When the guild was created."));
        assert_eq!(
            members.iter().filter(|member| member.name == "created_at").count(),
            1
        );

        assert_eq!(find(members, "from_data").kind, SourceKind::Function);
        assert!(find(members, "edit").signature.as_deref().unwrap().starts_with("async def"));
        assert_eq!(find(members, "get_name").alias_of.as_deref(), Some("__init__"));

        let limit = find(members, "LIMIT");
        assert_eq!(limit.kind, SourceKind::ClassAttribute);
        assert_eq!(limit.docstring.as_deref(), Some("Maximal member count."));

        assert_eq!(find(members, "name").kind, SourceKind::InstanceAttribute);
        assert_eq!(find(members, "owner_id").kind, SourceKind::InstanceAttribute);
    }

    #[test]
    fn test_conditional_definitions_included() {
        let code = r#"
try:
    import ujson as json
except ImportError:
    def dumps(value):
        pass

if True:
    class Fallback:
        pass
else:
    VALUE = 1
"#;
        let module = extract(code).unwrap();
        assert_eq!(find(&module.items, "dumps").kind, SourceKind::Function);
        assert_eq!(find(&module.items, "Fallback").kind, SourceKind::Class);
        assert_eq!(find(&module.items, "VALUE").kind, SourceKind::ClassAttribute);
    }

    #[test]
    fn test_extract_imports_and_exports() {
        let code = r#"
__all__ = ('Guild', 'create_partial_guild')

from .guild import Guild as GuildType, create_partial_guild
from ..utils import *
from typing import List
"#;
        let module = extract(code).unwrap();
        assert_eq!(
            module.exports,
            Some(vec!["Guild".to_string(), "create_partial_guild".to_string()])
        );
        assert_eq!(module.imports.len(), 3);

        let first = &module.imports[0];
        assert_eq!(first.level, 1);
        assert_eq!(first.module, "guild");
        assert_eq!(
            first.names,
            vec![
                ("Guild".to_string(), Some("GuildType".to_string())),
                ("create_partial_guild".to_string(), None),
            ]
        );

        let second = &module.imports[1];
        assert_eq!(second.level, 2);
        assert_eq!(second.module, "utils");
        assert!(second.wildcard);

        assert_eq!(module.imports[2].level, 0);
        assert_eq!(module.imports[2].module, "typing");
    }

    #[test]
    fn test_broken_source_still_walked() {
        let code = "def ok():\n    pass\n\ndef broken(:\n";
        let module = extract(code).unwrap();
        assert!(module.has_errors);
        assert!(module.items.iter().any(|item| item.name == "ok"));
    }

    #[test]
    fn test_decode_string_literal() {
        assert_eq!(decode_string_literal(r#""""doc""""#).as_deref(), Some("doc"));
        assert_eq!(decode_string_literal(r"'a\'b'").as_deref(), Some("a'b"));
        assert_eq!(decode_string_literal(r"r'a\nb'").as_deref(), Some(r"a\nb"));
        assert_eq!(decode_string_literal("b'raw'"), None);
    }
}
