//! Error types for docmap.

use std::path::PathBuf;

use crate::highlight::HighlightError;
use crate::mapper::MapError;
use crate::output::OutputError;
use crate::qualpath::QualPathError;
use crate::walker::WalkError;

/// Top-level error type for docmap operations.
#[derive(Debug, thiserror::Error)]
pub enum DocmapError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("unit not found: {0}")]
    UnitNotFound(String),

    #[error("no modules given")]
    NoModules,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("map error: {0}")]
    Map(#[from] MapError),

    #[error("path error: {0}")]
    Path(#[from] QualPathError),

    #[error("highlight error: {0}")]
    Highlight(#[from] HighlightError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Map an error to its exit code.
pub fn exit_code(error: &DocmapError) -> i32 {
    match error {
        DocmapError::PathNotFound(_) => 3,
        DocmapError::UnitNotFound(_) => 5,
        DocmapError::NoModules => 2,
        DocmapError::Io(_) => 1,
        DocmapError::Walk(WalkError::NotFound { .. }) => 3,
        DocmapError::Walk(WalkError::PermissionDenied { .. }) => 4,
        DocmapError::Walk(_) => 2,
        DocmapError::Map(MapError::ModuleNotFound { .. }) => 5,
        DocmapError::Map(MapError::Walk(WalkError::NotFound { .. })) => 3,
        DocmapError::Map(MapError::Walk(WalkError::PermissionDenied { .. })) => 4,
        DocmapError::Map(_) => 2,
        DocmapError::Path(_) => 2,
        DocmapError::Highlight(_) => 2,
        DocmapError::Output(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let missing = DocmapError::Map(MapError::ModuleNotFound {
            name: "hata".into(),
        });
        assert_eq!(exit_code(&missing), 5);
        assert_eq!(exit_code(&DocmapError::PathNotFound("x".into())), 3);
        let bad_class = DocmapError::Highlight(HighlightError::InvalidClass {
            class: String::new(),
        });
        assert_eq!(exit_code(&bad_class), 2);
    }
}
