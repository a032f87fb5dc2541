//! Static module mapping.
//!
//! [`map_module`] discovers the source files of a package, extracts them in
//! parallel with tree-sitter and links the results into a [`UnitGraph`].
//! Re-exports and name aliases register an existing unit under another path
//! without creating a new one.

pub mod python;
pub mod search;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::qualpath::{QualPath, QualPathError};
use crate::walker::{discover_modules, is_identifier, ModuleFile, WalkError, WalkOptions};

pub use python::{SourceImport, SourceItem, SourceKind, SourceModule};
pub use search::CachedSearcher;

/// Errors during module mapping.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("invalid module name: {name:?}")]
    InvalidName { name: String },

    #[error("module not found: {name}")]
    ModuleNotFound { name: String },

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("invalid path: {0}")]
    Path(#[from] QualPathError),
}

/// Kind of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Module,
    Type,
    Function,
    Property,
    InstanceAttribute,
    ClassAttribute,
}

impl UnitKind {
    /// Modules and types own child references.
    pub fn is_directory(self) -> bool {
        matches!(self, UnitKind::Module | UnitKind::Type)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Module => "module",
            UnitKind::Type => "type",
            UnitKind::Function => "function",
            UnitKind::Property => "property",
            UnitKind::InstanceAttribute => "instance attribute",
            UnitKind::ClassAttribute => "class attribute",
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a unit inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UnitId(usize);

impl UnitId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A documented unit.
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitKind,
    /// Where the unit is defined.
    pub path: QualPath,
    /// Other paths the unit is exposed under.
    pub alternative_paths: Vec<QualPath>,
    pub docstring: Option<String>,
    pub signature: Option<String>,
    /// Base class expressions, for types.
    pub bases: Vec<String>,
    /// Direct children, for modules and types.
    pub references: BTreeMap<String, UnitId>,
    /// `__all__` of a module.
    pub exports: Option<Vec<String>>,
    pub source: Option<PathBuf>,
    pub line: Option<usize>,
}

impl Unit {
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Child reference by name.
    pub fn reference(&self, name: &str) -> Option<UnitId> {
        self.references.get(name).copied()
    }
}

/// Arena of units with a path index. A unit registered under several paths
/// keeps a single [`UnitId`].
#[derive(Debug, Default)]
pub struct UnitGraph {
    units: Vec<Unit>,
    by_path: HashMap<QualPath, UnitId>,
}

impl UnitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0)
    }

    pub fn lookup(&self, path: &QualPath) -> Option<UnitId> {
        self.by_path.get(path).copied()
    }

    pub fn lookup_str(&self, path: &str) -> Option<UnitId> {
        QualPath::parse(path)
            .ok()
            .and_then(|path| self.lookup(&path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Every registered path with its unit, aliases included.
    pub fn paths(&self) -> impl Iterator<Item = (&QualPath, UnitId)> {
        self.by_path.iter().map(|(path, &id)| (path, id))
    }

    /// Children of `id` in name order.
    pub fn children(&self, id: UnitId) -> impl Iterator<Item = (&str, &Unit)> {
        self.get(id)
            .into_iter()
            .flat_map(|unit| unit.references.iter())
            .filter_map(|(name, &child)| Some((name.as_str(), self.get(child)?)))
    }

    /// Register a new unit at `path`, linking it into the parent's references.
    pub fn insert(&mut self, kind: UnitKind, path: QualPath) -> UnitId {
        if let Some(id) = self.lookup(&path) {
            return id;
        }
        let id = UnitId(self.units.len());
        self.units.push(Unit {
            id,
            kind,
            path: path.clone(),
            alternative_paths: Vec::new(),
            docstring: None,
            signature: None,
            bases: Vec::new(),
            references: BTreeMap::new(),
            exports: None,
            source: None,
            line: None,
        });
        self.link(&path, id);
        if kind.is_directory() {
            self.adopt_children(&path, id);
        }
        self.by_path.insert(path, id);
        id
    }

    /// Link units registered below `path` before `path` itself existed.
    fn adopt_children(&mut self, path: &QualPath, id: UnitId) {
        let orphans: Vec<(String, UnitId)> = self
            .by_path
            .iter()
            .filter(|(child, _)| child.len() == path.len() + 1 && child.starts_with(path))
            .map(|(child, &child_id)| (child.name().to_string(), child_id))
            .collect();
        self.units[id.0].references.extend(orphans);
    }

    /// Expose an existing unit under `path` as well. Returns `false` when the
    /// path is already taken.
    pub fn register_alias(&mut self, path: QualPath, id: UnitId) -> bool {
        if self.by_path.contains_key(&path) || self.get(id).is_none() {
            return false;
        }
        self.link(&path, id);
        self.units[id.0].alternative_paths.push(path.clone());
        self.by_path.insert(path, id);
        true
    }

    fn link(&mut self, path: &QualPath, id: UnitId) {
        if path.len() < 2 {
            return;
        }
        if let Some(parent) = self.lookup(&path.parent()) {
            let parent = &mut self.units[parent.0];
            if parent.kind.is_directory() {
                parent.references.insert(path.name().to_string(), id);
            }
        }
    }

    fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        &mut self.units[id.0]
    }
}

/// Options for mapping.
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// Map `_private` names too.
    pub include_private: bool,
    pub walk: WalkOptions,
}

fn is_private(name: &str) -> bool {
    name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__"))
}

/// Map module `name` and its submodules found under `roots` into `graph`.
///
/// Returns the id of the module unit. Modules already present in the graph
/// are left untouched.
pub fn map_module(
    graph: &mut UnitGraph,
    roots: &[PathBuf],
    name: &str,
    options: &MapOptions,
) -> Result<UnitId, MapError> {
    let root_path = QualPath::parse(name)?;
    if root_path.is_empty() || !root_path.parts().all(is_identifier) {
        return Err(MapError::InvalidName {
            name: name.to_string(),
        });
    }

    let files = discover_modules(roots, name, &options.walk)?;
    tracing::debug!(module = name, files = files.len(), "mapping module");

    let extracted: Vec<(ModuleFile, SourceModule)> = files
        .into_par_iter()
        .filter_map(|file| {
            let content = match std::fs::read_to_string(&file.path) {
                Ok(content) => content,
                Err(error) => {
                    tracing::warn!(path = %file.path.display(), %error, "skipping unreadable module");
                    return None;
                }
            };
            match python::extract(&content) {
                Ok(module) => {
                    if module.has_errors {
                        tracing::debug!(path = %file.path.display(), "syntax errors, mapping what parsed");
                    }
                    Some((file, module))
                }
                Err(error) => {
                    tracing::warn!(path = %file.path.display(), %error, "skipping module");
                    None
                }
            }
        })
        .collect();

    let mut builder = GraphBuilder {
        graph,
        options,
        imports: Vec::new(),
    };
    for (file, module) in extracted {
        builder.add_module(file, module)?;
    }
    builder.resolve_imports()?;

    builder
        .graph
        .lookup(&root_path)
        .ok_or_else(|| MapError::ModuleNotFound {
            name: name.to_string(),
        })
}

/// Imports of one module waiting for every module to be in the graph.
struct PendingImports {
    module: QualPath,
    package: QualPath,
    imports: Vec<SourceImport>,
}

struct GraphBuilder<'a> {
    graph: &'a mut UnitGraph,
    options: &'a MapOptions,
    imports: Vec<PendingImports>,
}

impl GraphBuilder<'_> {
    fn add_module(&mut self, file: ModuleFile, module: SourceModule) -> Result<(), MapError> {
        let path = QualPath::parse(&file.name)?;
        if self.graph.lookup(&path).is_some() {
            return Ok(());
        }

        let id = self.graph.insert(UnitKind::Module, path.clone());
        {
            let unit = self.graph.unit_mut(id);
            unit.docstring = module.docstring;
            unit.exports = module.exports;
            unit.source = Some(file.path.clone());
        }

        for item in &module.items {
            self.add_item(id, &path, item, &file)?;
        }

        let package = if file.is_package { path.clone() } else { path.parent() };
        self.imports.push(PendingImports {
            module: path,
            package,
            imports: module.imports,
        });
        Ok(())
    }

    fn add_item(
        &mut self,
        scope: UnitId,
        scope_path: &QualPath,
        item: &SourceItem,
        file: &ModuleFile,
    ) -> Result<(), MapError> {
        if python::is_ignored_name(&item.name)
            || (!self.options.include_private && is_private(&item.name))
        {
            return Ok(());
        }
        let path = scope_path.join_str(&item.name)?;

        if let Some(target) = item.alias_of.as_deref() {
            if let Some(id) = self.resolve_alias(scope, scope_path, target) {
                self.graph.register_alias(path, id);
                return Ok(());
            }
        }

        let kind = match item.kind {
            SourceKind::Class => UnitKind::Type,
            SourceKind::Function => UnitKind::Function,
            SourceKind::Property => UnitKind::Property,
            SourceKind::InstanceAttribute => UnitKind::InstanceAttribute,
            SourceKind::ClassAttribute => UnitKind::ClassAttribute,
        };
        let id = self.graph.insert(kind, path.clone());
        {
            let unit = self.graph.unit_mut(id);
            unit.docstring = item.docstring.clone();
            unit.signature = item.signature.clone();
            unit.bases = item.bases.clone();
            unit.source = Some(file.path.clone());
            unit.line = Some(item.line);
        }

        for member in &item.members {
            self.add_item(id, &path, member, file)?;
        }
        Ok(())
    }

    /// Resolve `name = target` against the enclosing scope, then the module.
    fn resolve_alias(&self, scope: UnitId, scope_path: &QualPath, target: &str) -> Option<UnitId> {
        let mut segments = target.split('.');
        let first = segments.next()?;

        let mut current = self
            .graph
            .get(scope)
            .and_then(|unit| unit.reference(first))
            .or_else(|| {
                let mut path = scope_path.clone();
                while !path.is_empty() {
                    let candidate = self.graph.lookup(&path)?;
                    if self.graph.get(candidate)?.kind == UnitKind::Module {
                        return self.graph.get(candidate)?.reference(first);
                    }
                    path = path.parent();
                }
                None
            })?;

        for segment in segments {
            current = self.graph.get(current)?.reference(segment)?;
        }

        let kind = self.graph.get(current)?.kind;
        matches!(kind, UnitKind::Function | UnitKind::Type | UnitKind::Property).then_some(current)
    }

    /// Register re-exports until no import makes progress.
    fn resolve_imports(&mut self) -> Result<(), MapError> {
        let pending = std::mem::take(&mut self.imports);
        let mut rounds = pending.len() + 1;

        loop {
            let mut progress = false;
            for entry in &pending {
                for import in &entry.imports {
                    progress |= self.apply_import(entry, import)?;
                }
            }
            rounds -= 1;
            if !progress || rounds == 0 {
                break;
            }
        }
        Ok(())
    }

    fn apply_import(&mut self, entry: &PendingImports, import: &SourceImport) -> Result<bool, MapError> {
        let source = if import.level == 0 {
            QualPath::parse(&import.module)?
        } else {
            let mut base = entry.package.clone();
            for _ in 1..import.level {
                base = base.parent();
            }
            base.join_str(&import.module)?
        };
        let Some(source_id) = self.graph.lookup(&source) else {
            return Ok(false);
        };

        let mut names: Vec<(String, String)> = Vec::new();
        if import.wildcard {
            let Some(unit) = self.graph.get(source_id) else {
                return Ok(false);
            };
            match &unit.exports {
                Some(exports) => names.extend(exports.iter().map(|name| (name.clone(), name.clone()))),
                None => names.extend(
                    unit.references
                        .keys()
                        .filter(|name| !name.starts_with('_'))
                        .map(|name| (name.clone(), name.clone())),
                ),
            }
        } else {
            for (name, alias) in &import.names {
                let local = alias.clone().unwrap_or_else(|| name.clone());
                names.push((name.clone(), local));
            }
        }

        let mut progress = false;
        for (name, local) in names {
            if !self.options.include_private && is_private(&local) {
                continue;
            }
            let target = match source.join_str(&name) {
                Ok(path) => path,
                Err(_) => continue,
            };
            let Some(id) = self.graph.lookup(&target) else {
                continue;
            };
            let alias = entry.module.join_str(&local)?;
            if alias == target {
                continue;
            }
            progress |= self.graph.register_alias(alias, id);
        }
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, path: &str, content: &str) {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn create_package() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "hata/__init__.py",
            "\"\"\"Hata root.\"\"\"\nfrom .discord import *\n",
        );
        write(
            &dir,
            "hata/discord/__init__.py",
            "from .guild import *\n__all__ = ('Guild', 'create_partial_guild')\n",
        );
        write(
            &dir,
            "hata/discord/guild/__init__.py",
            "from .guild import Guild\nfrom .utils import create_partial_guild\n\n__all__ = ('Guild', 'create_partial_guild')\n",
        );
        write(
            &dir,
            "hata/discord/guild/guild.py",
            r#"
class Guild:
    """Represents a guild."""
    __slots__ = ('id',)

    def _private(self):
        pass

    def get_channel(self, channel_id):
        """Returns the channel."""

    channel = get_channel
"#,
        );
        write(
            &dir,
            "hata/discord/guild/utils.py",
            "def create_partial_guild(data):\n    \"\"\"Creates a partial guild.\"\"\"\n",
        );
        dir
    }

    fn map(dir: &TempDir) -> (UnitGraph, UnitId) {
        let mut graph = UnitGraph::new();
        let id = map_module(
            &mut graph,
            &[dir.path().to_path_buf()],
            "hata",
            &MapOptions::default(),
        )
        .unwrap();
        (graph, id)
    }

    #[test]
    fn test_units_and_kinds() {
        let dir = create_package();
        let (graph, root) = map(&dir);

        let root = graph.get(root).unwrap();
        assert_eq!(root.kind, UnitKind::Module);
        assert_eq!(root.docstring.as_deref(), Some("Hata root."));

        let guild = graph.lookup_str("hata.discord.guild.guild.Guild").unwrap();
        assert_eq!(graph.get(guild).unwrap().kind, UnitKind::Type);

        let id = graph.lookup_str("hata.discord.guild.guild.Guild.id").unwrap();
        assert_eq!(graph.get(id).unwrap().kind, UnitKind::InstanceAttribute);
        assert!(graph.lookup_str("hata.discord.guild.guild.Guild._private").is_none());
    }

    #[test]
    fn test_reexports_share_identity() {
        let dir = create_package();
        let (graph, _) = map(&dir);

        let defined = graph.lookup_str("hata.discord.guild.guild.Guild").unwrap();
        assert_eq!(graph.lookup_str("hata.discord.guild.Guild"), Some(defined));
        assert_eq!(graph.lookup_str("hata.discord.Guild"), Some(defined));
        assert_eq!(graph.lookup_str("hata.Guild"), Some(defined));

        let unit = graph.get(defined).unwrap();
        assert_eq!(unit.path, "hata.discord.guild.guild.Guild");
        assert!(unit.alternative_paths.iter().any(|path| *path == "hata.Guild"));
    }

    #[test]
    fn test_method_alias_is_same_unit() {
        let dir = create_package();
        let (graph, _) = map(&dir);

        let method = graph
            .lookup_str("hata.discord.guild.guild.Guild.get_channel")
            .unwrap();
        let alias = graph
            .lookup_str("hata.discord.guild.guild.Guild.channel")
            .unwrap();
        assert_eq!(method, alias);
        assert_eq!(graph.get(method).unwrap().kind, UnitKind::Function);
    }

    #[test]
    fn test_children_linked() {
        let dir = create_package();
        let (graph, _) = map(&dir);

        let guild = graph.lookup_str("hata.discord.guild.guild.Guild").unwrap();
        let names: Vec<&str> = graph.children(guild).map(|(name, _)| name).collect();
        assert_eq!(names, ["channel", "get_channel", "id"]);
    }

    #[test]
    fn test_missing_module() {
        let dir = create_package();
        let mut graph = UnitGraph::new();
        let result = map_module(
            &mut graph,
            &[dir.path().to_path_buf()],
            "missing",
            &MapOptions::default(),
        );
        assert!(matches!(result, Err(MapError::ModuleNotFound { .. })));
    }

    #[test]
    fn test_invalid_name() {
        let mut graph = UnitGraph::new();
        let result = map_module(&mut graph, &[], "not-a-module", &MapOptions::default());
        assert!(matches!(result, Err(MapError::InvalidName { .. })));
        let result = map_module(&mut graph, &[], "a..b", &MapOptions::default());
        assert!(matches!(result, Err(MapError::Path(_))));
    }

    #[test]
    fn test_register_alias_keeps_first_path() {
        let mut graph = UnitGraph::new();
        let module = graph.insert(UnitKind::Module, QualPath::parse("pkg").unwrap());
        let function = graph.insert(UnitKind::Function, QualPath::parse("pkg.run").unwrap());
        assert!(graph.register_alias(QualPath::parse("pkg.start").unwrap(), function));
        assert!(!graph.register_alias(QualPath::parse("pkg.run").unwrap(), module));
        assert_eq!(graph.get(module).unwrap().references.len(), 2);
    }

    #[test]
    fn test_parent_inserted_after_child_links_it() {
        let mut graph = UnitGraph::new();
        let child = graph.insert(UnitKind::Module, QualPath::parse("pkg.sub").unwrap());
        graph.insert(UnitKind::Function, QualPath::parse("pkg.sub.run").unwrap());
        let parent = graph.insert(UnitKind::Module, QualPath::parse("pkg").unwrap());

        let children: Vec<_> = graph.children(parent).map(|(name, unit)| (name, unit.id)).collect();
        assert_eq!(children, [("sub", child)]);
    }

    #[test]
    fn test_map_submodule_then_package() {
        let dir = create_package();
        let mut graph = UnitGraph::new();
        let roots = [dir.path().to_path_buf()];
        let discord = map_module(&mut graph, &roots, "hata.discord", &MapOptions::default()).unwrap();
        let hata = map_module(&mut graph, &roots, "hata", &MapOptions::default()).unwrap();

        assert_eq!(graph.get(hata).unwrap().reference("discord"), Some(discord));
    }
}
