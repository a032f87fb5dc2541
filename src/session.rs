//! The documentation build session.
//!
//! A [`DocBuildSession`] owns everything a documentation build mutates: the
//! warning sink, the unit graph, the memo of mapped modules, the search
//! cache, parsed docstrings and the highlight theme. One session is created
//! per build and dropped afterwards.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::docstring::DocString;
use crate::highlight::HighlightTheme;
use crate::mapper::{self, CachedSearcher, MapError, MapOptions, Unit, UnitGraph, UnitId};
use crate::qualpath::QualPath;
use crate::render::html::MemberDoc;
use crate::render::{render_text, HtmlRenderer};
use crate::tree::Structure;
use crate::warnings::WarningSink;

#[derive(Debug)]
pub struct DocBuildSession {
    roots: Vec<PathBuf>,
    options: MapOptions,
    warnings: WarningSink,
    graph: UnitGraph,
    mapped: HashMap<String, UnitId>,
    searcher: CachedSearcher,
    /// `None` entries are docstrings that parsed to nothing.
    docstrings: HashMap<UnitId, Option<DocString>>,
    theme: HighlightTheme,
}

impl DocBuildSession {
    /// Session mapping modules found under `roots`.
    pub fn new(roots: Vec<PathBuf>, options: MapOptions) -> Self {
        Self {
            roots,
            options,
            warnings: WarningSink::new(),
            graph: UnitGraph::new(),
            mapped: HashMap::new(),
            searcher: CachedSearcher::new(),
            docstrings: HashMap::new(),
            theme: HighlightTheme::default(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn graph(&self) -> &UnitGraph {
        &self.graph
    }

    pub fn warnings(&self) -> &WarningSink {
        &self.warnings
    }

    pub fn theme(&self) -> &HighlightTheme {
        &self.theme
    }

    pub fn theme_mut(&mut self) -> &mut HighlightTheme {
        &mut self.theme
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.graph.get(id)
    }

    /// Names of the modules mapped so far.
    pub fn mapped_modules(&self) -> impl Iterator<Item = (&str, UnitId)> {
        self.mapped.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Map module `name`, once. Later calls return the same unit.
    pub fn map_module(&mut self, name: &str) -> Result<UnitId, MapError> {
        if let Some(&id) = self.mapped.get(name) {
            tracing::debug!(module = name, "module already mapped");
            return Ok(id);
        }
        let id = mapper::map_module(&mut self.graph, &self.roots, name, &self.options)?;
        self.mapped.insert(name.to_string(), id);
        self.searcher.invalidate();
        Ok(id)
    }

    /// Fuzzy search over every mapped path.
    pub fn search(&mut self, query: &str) -> Vec<QualPath> {
        self.searcher.search(&self.graph, query)
    }

    /// Find a unit by exact path, or by a dotted suffix matching one unit.
    pub fn resolve(&mut self, name: &str) -> Option<UnitId> {
        if let Some(id) = self.graph.lookup_str(name) {
            return Some(id);
        }
        let mut found = None;
        for path in self.searcher.lookup_suffix(&self.graph, name) {
            let id = self.graph.lookup(path)?;
            if found.is_some_and(|existing| existing != id) {
                return None;
            }
            found = Some(id);
        }
        found
    }

    fn ensure_docstring(&mut self, id: UnitId) {
        if self.docstrings.contains_key(&id) {
            return;
        }
        let parsed = self.graph.get(id).and_then(|unit| {
            let text = unit.docstring.as_deref()?;
            DocString::parse(text, &unit.path, &mut self.warnings)
        });
        self.docstrings.insert(id, parsed);
    }

    /// Parsed docstring of `id`, parsed on first request.
    pub fn docstring(&mut self, id: UnitId) -> Option<&DocString> {
        self.ensure_docstring(id);
        self.docstrings.get(&id).and_then(Option::as_ref)
    }

    /// Render the page of `id`. `extended` inlines functions, properties and
    /// attributes as anchored sections.
    pub fn render_html(&mut self, id: UnitId, extended: bool) -> Option<String> {
        self.ensure_docstring(id);
        let children: Vec<UnitId> = self.graph.children(id).map(|(_, unit)| unit.id).collect();
        for child in &children {
            self.ensure_docstring(*child);
        }

        let Self {
            graph,
            docstrings,
            warnings,
            theme,
            ..
        } = self;
        let unit = graph.get(id)?;
        let doc = docstrings.get(&id).and_then(Option::as_ref);
        let members: Vec<MemberDoc<'_>> = graph
            .children(id)
            .map(|(name, child)| MemberDoc {
                unit: child,
                docstring: docstrings.get(&child.id).and_then(Option::as_ref),
                attribute: doc.and_then(|doc| doc.attribute_docstring_for(name)),
            })
            .collect();

        let mut renderer = HtmlRenderer::new(graph, theme, &unit.path);
        if extended {
            renderer = renderer.extended();
        }
        Some(renderer.render_page(doc, &members, warnings))
    }

    /// Plain text of the docstring of `id`. Members without a docstring of
    /// their own fall back to their parent's attribute section entry.
    pub fn render_text(&mut self, id: UnitId) -> Option<String> {
        if let Some(doc) = self.docstring(id) {
            return Some(render_text(doc));
        }
        let unit = self.graph.get(id)?;
        let name = unit.name().to_string();
        let parent = self.graph.lookup(&unit.path.parent())?;
        let attribute = self.docstring(parent)?.attribute_docstring_for(&name)?;
        let head = crate::graver::graved_to_plain(&attribute.head);
        Some(match attribute.separator {
            _ if head.is_empty() => name,
            ':' => format!("{name} : {head}"),
            separator => format!("{name}{separator}{head}"),
        })
    }

    /// Table of contents of the page of `id`.
    pub fn structure(&mut self, id: UnitId) -> Option<Structure> {
        self.ensure_docstring(id);
        let doc = self.docstrings.get(&id).and_then(Option::as_ref);
        Structure::for_unit(&self.graph, id, doc)
    }

    /// Write and clear the collected warnings.
    pub fn show_warnings_to<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.warnings.show_to(writer)
    }

    /// [`DocBuildSession::show_warnings_to`] on stderr.
    pub fn show_warnings(&mut self) -> io::Result<()> {
        self.warnings.show_to(&mut io::stderr().lock())
    }

    /// Take the collected warnings as messages.
    pub fn drain_warnings(&mut self) -> Vec<String> {
        self.warnings
            .drain()
            .into_iter()
            .map(|warning| warning.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn package() -> TempDir {
        let dir = TempDir::new().unwrap();
        let hata = dir.path().join("hata");
        fs::create_dir_all(&hata).unwrap();
        fs::write(
            hata.join("__init__.py"),
            "\"\"\"Hata package.\"\"\"\nfrom .guild import Guild\n",
        )
        .unwrap();
        fs::write(
            hata.join("guild.py"),
            concat!(
                "class Guild:\n",
                "    \"\"\"\n",
                "    Represents a guild.\n",
                "\n",
                "    Attributes\n",
                "    ----------\n",
                "    name : `str`\n",
                "        The guild's name.\n",
                "    \"\"\"\n",
                "    __slots__ = ('name',)\n",
                "\n",
                "    def get_channel(self, channel_id):\n",
                "        \"\"\"Returns the channel, see ``Guild``.\"\"\"\n",
                "        return None\n",
            ),
        )
        .unwrap();
        dir
    }

    fn session(dir: &TempDir) -> DocBuildSession {
        DocBuildSession::new(vec![dir.path().to_path_buf()], MapOptions::default())
    }

    #[test]
    fn test_map_module_twice_returns_same_unit() {
        let dir = package();
        let mut session = session(&dir);
        let first = session.map_module("hata").unwrap();
        let units = session.graph().len();
        let second = session.map_module("hata").unwrap();
        assert_eq!(first, second);
        assert_eq!(session.graph().len(), units);
    }

    #[test]
    fn test_map_child_module_before_parent() {
        let dir = package();
        let mut session = session(&dir);
        let guild = session.map_module("hata.guild").unwrap();
        let hata = session.map_module("hata").unwrap();

        let children: Vec<&str> = session.graph().children(hata).map(|(name, _)| name).collect();
        assert!(children.contains(&"guild"));
        assert_eq!(session.graph().get(hata).unwrap().reference("guild"), Some(guild));
    }

    #[test]
    fn test_search_sees_new_modules() {
        let dir = package();
        let mut session = session(&dir);
        assert!(session.search("guild").is_empty());
        session.map_module("hata").unwrap();
        let results = session.search("guild");
        assert!(results.iter().any(|path| path == "hata.guild.Guild"));
    }

    #[test]
    fn test_resolve_by_suffix() {
        let dir = package();
        let mut session = session(&dir);
        session.map_module("hata").unwrap();
        let id = session.resolve("Guild.get_channel").unwrap();
        assert_eq!(session.unit(id).unwrap().path, "hata.guild.Guild.get_channel");
    }

    #[test]
    fn test_attribute_fallback_text() {
        let dir = package();
        let mut session = session(&dir);
        session.map_module("hata").unwrap();
        let id = session.graph().lookup_str("hata.guild.Guild.name").unwrap();
        assert_eq!(session.render_text(id).as_deref(), Some("name : str"));
    }

    #[test]
    fn test_render_html_and_warnings() {
        let dir = package();
        let mut session = session(&dir);
        session.map_module("hata").unwrap();
        let id = session.graph().lookup_str("hata.guild.Guild").unwrap();

        let html = session.render_html(id, true).unwrap();
        assert!(html.contains("<section id=\"get_channel\">"));
        assert!(html.contains("<section id=\"name\">"));
        assert!(html.contains("The guild&#39;s name."));

        let mut out = Vec::new();
        session.show_warnings_to(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_docstring_is_cached() {
        let dir = package();
        let mut session = session(&dir);
        session.map_module("hata").unwrap();
        let id = session.graph().lookup_str("hata").unwrap();
        let summary = session
            .docstring(id)
            .and_then(DocString::summary)
            .map(|spans| crate::graver::graved_to_plain(spans));
        assert_eq!(summary.as_deref(), Some("Hata package."));
        assert!(session.docstring(id).is_some());
    }
}
