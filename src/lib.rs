//! Docmap - Documentation generator for Python packages.
//!
//! Docmap reads Python sources statically, maps them into a graph of units
//! (modules, types, functions, properties and attributes), parses docstrings
//! into typed blocks with inline backtick markup ("graves") and renders them
//! as HTML or plain text.
//!
//! # Quick Start
//!
//! ```no_run
//! use docmap::builder::DocBuild;
//!
//! let (mut session, roots) = DocBuild::new("./src")
//!     .module("hata")
//!     .build_with_roots()
//!     .unwrap();
//!
//! let html = session.render_html(roots[0], true).unwrap();
//! session.show_warnings().unwrap();
//! println!("{html}");
//! ```
//!
//! # Modules
//!
//! - [`qualpath`] - Dotted unit paths
//! - [`graver`] - Inline grave markup
//! - [`docstring`] - Docstring sections and blocks
//! - [`walker`] - Source discovery with gitignore support
//! - [`mapper`] - Tree-sitter based unit graph and fuzzy search
//! - [`render`] - HTML and text rendering
//! - [`highlight`] - Python syntax highlighting
//! - [`session`] - State of one documentation build
//! - [`builder`] - Fluent API for builds

pub mod qualpath;
pub mod warnings;
pub mod graver;
pub mod docstring;
pub mod errors;
pub mod walker;
pub mod mapper;
pub mod highlight;
pub mod render;
pub mod tree;
pub mod output;
pub mod session;
pub mod builder;

// Re-export key types at crate root for convenience
pub use builder::{write_site, DocBuild, SiteReport};
pub use docstring::{DocSection, DocString};
pub use errors::{exit_code, DocmapError};
pub use graver::{build_graves, Grave, GraveType, GravedSpan, GravedText};
pub use highlight::{tokenize, HighlightError, HighlightTheme, Token, TokenType};
pub use mapper::{map_module, MapError, MapOptions, Unit, UnitGraph, UnitId, UnitKind};
pub use output::OutputError;
pub use qualpath::{QualPath, QualPathError};
pub use session::DocBuildSession;
pub use tree::Structure;
pub use walker::WalkError;
pub use warnings::{DocWarning, WarningSink};
