//! Fluent builder API for docmap.
//!
//! [`DocBuild`] collects search roots, module names and walk options, maps
//! the modules into a [`DocBuildSession`] and can write a static site.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::errors::DocmapError;
use crate::mapper::{MapOptions, UnitId};
use crate::session::DocBuildSession;
use crate::walker::WalkOptions;

/// Builder for a documentation build.
///
/// # Examples
///
/// ```no_run
/// use docmap::builder::DocBuild;
///
/// let mut session = DocBuild::new("./src")
///     .module("hata")
///     .include_private(false)
///     .build()
///     .unwrap();
///
/// println!("Found {:?}", session.search("guild"));
/// ```
#[derive(Debug, Clone)]
pub struct DocBuild {
    roots: Vec<PathBuf>,
    modules: Vec<String>,
    include_private: bool,
    walk_options: WalkOptions,
}

impl DocBuild {
    /// Create a new builder searching modules under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
            modules: Vec::new(),
            include_private: false,
            walk_options: WalkOptions::default(),
        }
    }

    /// Search modules under another root too. Earlier roots win.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Map module `name`.
    pub fn module(mut self, name: impl Into<String>) -> Self {
        self.modules.push(name.into());
        self
    }

    /// Map several modules.
    pub fn modules<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules.extend(names.into_iter().map(Into::into));
        self
    }

    /// Map `_private` names too (default: false).
    pub fn include_private(mut self, include: bool) -> Self {
        self.include_private = include;
        self
    }

    /// Include hidden files.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.walk_options.include_hidden = include;
        self
    }

    /// Set maximum directory depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.walk_options.max_depth = Some(depth);
        self
    }

    /// Skip files whose path relative to the root matches `pattern`.
    pub fn exclude(mut self, pattern: Pattern) -> Self {
        self.walk_options.excludes.push(pattern);
        self
    }

    /// Map every module into a new session.
    pub fn build(self) -> Result<DocBuildSession, DocmapError> {
        Ok(self.build_with_roots()?.0)
    }

    /// Map every module, returning the session and the module units in the
    /// order they were given.
    pub fn build_with_roots(self) -> Result<(DocBuildSession, Vec<UnitId>), DocmapError> {
        if self.modules.is_empty() {
            return Err(DocmapError::NoModules);
        }
        for root in &self.roots {
            if !root.exists() {
                return Err(DocmapError::PathNotFound(root.clone()));
            }
        }

        let options = MapOptions {
            include_private: self.include_private,
            walk: self.walk_options,
        };
        let mut session = DocBuildSession::new(self.roots, options);
        let mut ids = Vec::with_capacity(self.modules.len());
        for name in &self.modules {
            ids.push(session.map_module(name)?);
        }
        Ok((session, ids))
    }
}

/// Pages written by [`write_site`].
#[derive(Debug, Clone, Default)]
pub struct SiteReport {
    pub pages: Vec<PathBuf>,
}

/// Write one `index.html` per page unit reachable from `roots` into `out`.
///
/// Pages live at `out/<dotted path as directories>/index.html`. Extended
/// pages inline functions, properties and attributes into their parent's
/// page; plain pages give every unit its own page.
pub fn write_site(
    session: &mut DocBuildSession,
    roots: &[UnitId],
    out: &Path,
    extended: bool,
) -> Result<SiteReport, DocmapError> {
    let mut report = SiteReport::default();
    let mut pending: Vec<UnitId> = roots.to_vec();
    let mut seen: Vec<UnitId> = Vec::new();

    while let Some(id) = pending.pop() {
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);

        let Some(unit) = session.unit(id) else {
            continue;
        };
        if extended && !unit.kind.is_directory() && unit.path.len() > 1 {
            continue;
        }
        let mut directory = out.to_path_buf();
        for part in unit.path.parts() {
            directory.push(part);
        }
        // Re-exports are linked to their defining page only.
        let children: Vec<UnitId> = session
            .graph()
            .children(id)
            .filter(|(_, child)| child.path.parent() == unit.path)
            .map(|(_, child)| child.id)
            .collect();

        let Some(html) = session.render_html(id, extended) else {
            continue;
        };
        fs::create_dir_all(&directory)?;
        let page = directory.join("index.html");
        fs::write(&page, wrap_page(&html))?;
        tracing::debug!(page = %page.display(), "wrote page");
        report.pages.push(page);

        pending.extend(children.into_iter().rev());
    }
    Ok(report)
}

fn wrap_page(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}
