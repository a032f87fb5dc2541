//! Python source discovery.
//!
//! Files are listed with the `ignore` crate, so `.gitignore`, `.git/info/exclude`
//! and [`IGNORE_FILE`] rules apply. [`discover_modules`] maps the listed `.py`
//! files to dotted module names.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use glob::Pattern;
use ignore::WalkBuilder;
use regex::Regex;
use thiserror::Error;

/// Name of the per-root ignore file.
pub const IGNORE_FILE: &str = ".docmapignore";

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("search root not found: {path}")]
    NotFound { path: PathBuf },

    #[error("search root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How search roots are traversed.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Directory levels below a package to descend into.
    pub max_depth: Option<usize>,
    pub follow_symlinks: bool,
    /// List dot-files and dot-directories.
    pub include_hidden: bool,
    pub respect_gitignore: bool,
    /// Extra ignore files, in gitignore syntax.
    pub custom_ignores: Vec<PathBuf>,
    /// Globs matched against paths relative to the search root.
    pub excludes: Vec<Pattern>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            follow_symlinks: false,
            include_hidden: false,
            respect_gitignore: true,
            custom_ignores: Vec::new(),
            excludes: Vec::new(),
        }
    }
}

impl WalkOptions {
    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.include_hidden = yes;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Add an exclude glob.
    pub fn exclude(mut self, pattern: Pattern) -> Self {
        self.excludes.push(pattern);
        self
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.excludes
            .iter()
            .any(|pattern| pattern.matches_path(relative))
    }
}

fn walk_error(error: ignore::Error, at: PathBuf) -> Option<WalkError> {
    match error {
        ignore::Error::WithPath { path, err } => walk_error(*err, path),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error(*err, at)
        }
        ignore::Error::Io(source) if source.kind() == std::io::ErrorKind::PermissionDenied => {
            Some(WalkError::PermissionDenied { path: at })
        }
        ignore::Error::Io(source) => Some(WalkError::Io { path: at, source }),
        // Malformed ignore rules only drop the rule.
        _ => None,
    }
}

/// List the `.py` files below `dir`.
pub fn walk_sources(
    dir: &Path,
    options: &WalkOptions,
) -> impl Iterator<Item = Result<PathBuf, WalkError>> {
    let dir = dir.to_path_buf();

    if !dir.exists() {
        return itertools_lite::Either::Left(std::iter::once(Err(WalkError::NotFound {
            path: dir,
        })));
    }

    let mut builder = WalkBuilder::new(&dir);
    builder
        .hidden(!options.include_hidden)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .follow_links(options.follow_symlinks)
        .max_depth(options.max_depth);
    for ignore_file in options.custom_ignores.iter().filter(|path| path.is_file()) {
        if let Some(error) = builder.add_ignore(ignore_file) {
            tracing::warn!(%error, file = %ignore_file.display(), "bad ignore file");
        }
    }

    let fallback = dir.clone();
    itertools_lite::Either::Right(builder.build().filter_map(move |result| match result {
        Ok(entry) => {
            let is_source = entry.file_type().is_some_and(|kind| kind.is_file())
                && entry.path().extension().is_some_and(|ext| ext == "py");
            is_source.then(|| Ok(entry.into_path()))
        }
        Err(error) => walk_error(error, fallback.clone()).map(Err),
    }))
}

/// A Python source file and the dotted module name it defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFile {
    pub name: String,
    pub path: PathBuf,
    /// `__init__.py` of a package.
    pub is_package: bool,
}

fn identifier_regex() -> Option<&'static Regex> {
    static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
}

/// Whether `value` is a Python identifier.
pub fn is_identifier(value: &str) -> bool {
    identifier_regex().is_some_and(|regex| regex.is_match(value))
}

/// Dotted module name of `path` relative to `root`.
///
/// `pkg/__init__.py` is `pkg`, `pkg/sub.py` is `pkg.sub`. `None` for
/// non-Python files and paths that are not valid module names.
pub fn module_name(root: &Path, path: &Path) -> Option<(String, bool)> {
    if path.extension()? != "py" {
        return None;
    }
    let relative = path.strip_prefix(root).ok()?;
    let mut parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_str().map(str::to_string))
        .collect::<Option<_>>()?;

    let file = parts.pop()?;
    let stem = file.strip_suffix(".py")?;
    let is_package = stem == "__init__";
    if !is_package {
        parts.push(stem.to_string());
    }
    if parts.is_empty() || !parts.iter().all(|part| is_identifier(part)) {
        return None;
    }
    Some((parts.join("."), is_package))
}

/// Whether `module` is `name` or one of its submodules.
fn is_within(module: &str, name: &str) -> bool {
    module == name
        || module
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Find the source files of module `name` and all its submodules under the
/// given search roots. The first root defining a module wins.
pub fn discover_modules(
    roots: &[PathBuf],
    name: &str,
    options: &WalkOptions,
) -> Result<Vec<ModuleFile>, WalkError> {
    let top = name.split('.').next().unwrap_or(name);
    let mut found: Vec<ModuleFile> = Vec::new();

    for root in roots {
        if !root.exists() {
            return Err(WalkError::NotFound { path: root.clone() });
        }
        if !root.is_dir() {
            return Err(WalkError::NotADirectory { path: root.clone() });
        }

        let mut root_options = options.clone();
        root_options.custom_ignores.push(root.join(IGNORE_FILE));

        let single = root.join(format!("{top}.py"));
        let package = root.join(top);
        let mut candidates = Vec::new();
        if single.is_file() {
            candidates.push(single);
        }
        if package.is_dir() {
            candidates.extend(walk_sources(&package, &root_options).filter_map(
                |entry| match entry {
                    Ok(path) => Some(path),
                    Err(error) => {
                        tracing::warn!(%error, "skipping unreadable entry");
                        None
                    }
                },
            ));
        }

        for path in candidates {
            let Some((module, is_package)) = module_name(root, &path) else {
                continue;
            };
            if !is_within(&module, name) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(&path);
            if options.is_excluded(relative) {
                tracing::debug!(path = %relative.display(), "excluded by pattern");
                continue;
            }
            if found.iter().any(|file| file.name == module) {
                continue;
            }
            found.push(ModuleFile {
                name: module,
                path,
                is_package,
            });
        }
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

/// Simple Either type to avoid adding itertools dependency.
mod itertools_lite {
    pub enum Either<L, R> {
        Left(L),
        Right(R),
    }

    impl<L, R, T> Iterator for Either<L, R>
    where
        L: Iterator<Item = T>,
        R: Iterator<Item = T>,
    {
        type Item = T;

        fn next(&mut self) -> Option<Self::Item> {
            match self {
                Either::Left(l) => l.next(),
                Either::Right(r) => r.next(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_package() -> TempDir {
        let dir = TempDir::new().unwrap();

        fs::create_dir_all(dir.path().join("hata/discord/guild")).unwrap();
        fs::write(dir.path().join("hata/__init__.py"), "").unwrap();
        fs::write(dir.path().join("hata/discord/__init__.py"), "").unwrap();
        fs::write(dir.path().join("hata/discord/guild/__init__.py"), "").unwrap();
        fs::write(dir.path().join("hata/discord/guild/guild.py"), "").unwrap();
        fs::write(dir.path().join("hata/README.md"), "").unwrap();
        fs::write(dir.path().join("other.py"), "").unwrap();

        dir
    }

    fn names(files: &[ModuleFile]) -> Vec<&str> {
        files.iter().map(|file| file.name.as_str()).collect()
    }

    fn listed(dir: &Path, options: &WalkOptions) -> Vec<PathBuf> {
        walk_sources(dir, options).filter_map(Result::ok).collect()
    }

    #[test]
    fn test_walk_lists_python_files_only() {
        let dir = create_package();

        let paths = listed(dir.path(), &WalkOptions::default());
        assert!(paths.iter().any(|p| p.ends_with("guild/guild.py")));
        assert!(paths.iter().any(|p| p.ends_with("other.py")));
        assert!(!paths.iter().any(|p| p.ends_with("README.md")));
    }

    #[test]
    fn test_walk_missing_dir() {
        let result: Vec<_> =
            walk_sources(Path::new("/nonexistent/path"), &WalkOptions::default()).collect();
        assert_eq!(result.len(), 1);
        assert!(matches!(result[0], Err(WalkError::NotFound { .. })));
    }

    #[test]
    fn test_walk_respects_gitignore() {
        let dir = TempDir::new().unwrap();
        // .gitignore is only honoured inside a repository.
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("api.py"), "").unwrap();
        fs::write(dir.path().join("generated.py"), "").unwrap();
        fs::write(dir.path().join(".gitignore"), "generated.py").unwrap();

        let paths = listed(dir.path(), &WalkOptions::default());
        assert!(paths.iter().any(|p| p.ends_with("api.py")));
        assert!(!paths.iter().any(|p| p.ends_with("generated.py")));
    }

    #[test]
    fn test_walk_hidden_sources() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("api.py"), "").unwrap();
        fs::write(dir.path().join(".scratch.py"), "").unwrap();

        let paths = listed(dir.path(), &WalkOptions::default());
        assert!(!paths.iter().any(|p| p.ends_with(".scratch.py")));

        let paths = listed(dir.path(), &WalkOptions::default().include_hidden(true));
        assert!(paths.iter().any(|p| p.ends_with(".scratch.py")));
    }

    #[test]
    fn test_module_name() {
        let root = Path::new("/src");
        assert_eq!(
            module_name(root, Path::new("/src/hata/__init__.py")),
            Some(("hata".to_string(), true))
        );
        assert_eq!(
            module_name(root, Path::new("/src/hata/discord/guild.py")),
            Some(("hata.discord.guild".to_string(), false))
        );
        assert_eq!(module_name(root, Path::new("/src/hata/README.md")), None);
        assert_eq!(module_name(root, Path::new("/src/hata/my-module.py")), None);
    }

    #[test]
    fn test_discover_modules() {
        let dir = create_package();
        let files =
            discover_modules(&[dir.path().to_path_buf()], "hata", &WalkOptions::default()).unwrap();
        assert_eq!(
            names(&files),
            ["hata", "hata.discord", "hata.discord.guild", "hata.discord.guild.guild"]
        );
        assert!(files[0].is_package);
        assert!(!files[3].is_package);
    }

    #[test]
    fn test_discover_submodule_only() {
        let dir = create_package();
        let files = discover_modules(
            &[dir.path().to_path_buf()],
            "hata.discord.guild",
            &WalkOptions::default(),
        )
        .unwrap();
        assert_eq!(names(&files), ["hata.discord.guild", "hata.discord.guild.guild"]);
    }

    #[test]
    fn test_discover_respects_ignore_file_and_excludes() {
        let dir = create_package();
        fs::write(dir.path().join(IGNORE_FILE), "guild.py\n").unwrap();

        let files =
            discover_modules(&[dir.path().to_path_buf()], "hata", &WalkOptions::default()).unwrap();
        assert!(!names(&files).contains(&"hata.discord.guild.guild"));

        let options = WalkOptions::default().exclude(Pattern::new("hata/discord/**").unwrap());
        let files = discover_modules(&[dir.path().to_path_buf()], "hata", &options).unwrap();
        assert_eq!(names(&files), ["hata"]);
    }

    #[test]
    fn test_discover_missing_root() {
        let result = discover_modules(
            &[PathBuf::from("/nonexistent/root")],
            "hata",
            &WalkOptions::default(),
        );
        assert!(matches!(result, Err(WalkError::NotFound { .. })));
    }
}
