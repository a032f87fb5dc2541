//! Dotted qualified paths (`hata.discord.guild.Guild`).
//!
//! A [`QualPath`] is an immutable sequence of non-empty segments. It is the
//! key of the unit graph and the unit of cross-reference resolution.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::ops::{Div, Sub};
use std::str::FromStr;

use compact_str::CompactString;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use thiserror::Error;

/// Errors raised while building a [`QualPath`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QualPathError {
    #[error("empty segment in dotted path {path:?}")]
    EmptySegment { path: String },
}

type Parts = SmallVec<[CompactString; 4]>;

/// One argument of [`QualPath::from_pieces`].
#[derive(Debug, Clone, Copy)]
pub enum PathPiece<'a> {
    Str(&'a str),
    Path(&'a QualPath),
}

impl<'a> From<&'a str> for PathPiece<'a> {
    fn from(value: &'a str) -> Self {
        PathPiece::Str(value)
    }
}

impl<'a> From<&'a QualPath> for PathPiece<'a> {
    fn from(value: &'a QualPath) -> Self {
        PathPiece::Path(value)
    }
}

/// Immutable dotted path.
#[derive(Clone)]
pub struct QualPath {
    parts: Parts,
    hash: u64,
}

impl QualPath {
    /// The empty path.
    pub fn empty() -> Self {
        Self::from_parts(Parts::new())
    }

    /// Parse a dotted string. An empty string gives the empty path.
    pub fn parse(value: &str) -> Result<Self, QualPathError> {
        let mut parts = Parts::new();
        push_dotted(&mut parts, value)?;
        Ok(Self::from_parts(parts))
    }

    /// Build a path from a mix of dotted strings and other paths.
    pub fn from_pieces(pieces: &[PathPiece<'_>]) -> Result<Self, QualPathError> {
        let mut parts = Parts::new();
        for piece in pieces {
            match piece {
                PathPiece::Str(value) => push_dotted(&mut parts, value)?,
                PathPiece::Path(path) => parts.extend(path.parts.iter().cloned()),
            }
        }
        Ok(Self::from_parts(parts))
    }

    fn from_parts(parts: Parts) -> Self {
        let mut hasher = DefaultHasher::new();
        parts.hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            parts,
        }
    }

    /// Segments of the path.
    pub fn parts(&self) -> impl ExactSizeIterator<Item = &str> + DoubleEndedIterator {
        self.parts.iter().map(CompactString::as_str)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Last segment, or `""` for the empty path.
    pub fn name(&self) -> &str {
        self.parts.last().map_or("", CompactString::as_str)
    }

    /// The path without its last segment.
    pub fn parent(&self) -> Self {
        let mut parts = self.parts.clone();
        parts.pop();
        Self::from_parts(parts)
    }

    /// Append one validated dotted string.
    pub fn join_str(&self, value: &str) -> Result<Self, QualPathError> {
        Self::from_pieces(&[PathPiece::Path(self), PathPiece::Str(value)])
    }

    /// Whether the last segment equals `name`.
    pub fn endswith(&self, name: &str) -> bool {
        self.parts.last().is_some_and(|last| last.as_str() == name)
    }

    /// Whether the last `names.len()` segments equal `names`.
    pub fn endswith_multi(&self, names: &[&str]) -> bool {
        if names.len() > self.parts.len() {
            return false;
        }
        let start = self.parts.len() - names.len();
        self.parts[start..]
            .iter()
            .zip(names)
            .all(|(part, name)| part.as_str() == *name)
    }

    /// Whether `self` starts with every segment of `prefix`.
    pub fn starts_with(&self, prefix: &QualPath) -> bool {
        prefix.parts.len() <= self.parts.len()
            && self.parts[..prefix.parts.len()] == prefix.parts[..]
    }

    /// Number of leading segments shared with `other`.
    pub fn common_prefix_len(&self, other: &QualPath) -> usize {
        self.parts
            .iter()
            .zip(other.parts.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Every dotted suffix, longest first (`a.b.c`, `b.c`, `c`).
    pub fn suffixes(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.parts.len()).map(move |start| self.parts[start..].join("."))
    }

    /// Path made of the segments `start..`.
    pub fn skip(&self, start: usize) -> Self {
        Self::from_parts(self.parts.iter().skip(start).cloned().collect())
    }
}

fn push_dotted(parts: &mut Parts, value: &str) -> Result<(), QualPathError> {
    if value.is_empty() {
        return Ok(());
    }
    for segment in value.split('.') {
        if segment.is_empty() {
            return Err(QualPathError::EmptySegment {
                path: value.to_string(),
            });
        }
        parts.push(CompactString::from(segment));
    }
    Ok(())
}

impl PartialEq for QualPath {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.parts == other.parts
    }
}

impl Eq for QualPath {}

impl Hash for QualPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for QualPath {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualPath {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl PartialEq<str> for QualPath {
    fn eq(&self, other: &str) -> bool {
        let mut rest = other;
        for (index, part) in self.parts.iter().enumerate() {
            if index > 0 {
                match rest.strip_prefix('.') {
                    Some(stripped) => rest = stripped,
                    None => return false,
                }
            }
            match rest.strip_prefix(part.as_str()) {
                Some(stripped) => rest = stripped,
                None => return false,
            }
        }
        rest.is_empty()
    }
}

impl PartialEq<&str> for QualPath {
    fn eq(&self, other: &&str) -> bool {
        <QualPath as PartialEq<str>>::eq(self, other)
    }
}

impl fmt::Display for QualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            f.write_str(part)?;
        }
        Ok(())
    }
}

impl fmt::Debug for QualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QualPath({:?})", self.to_string())
    }
}

impl FromStr for QualPath {
    type Err = QualPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for QualPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Div<&QualPath> for &QualPath {
    type Output = QualPath;

    fn div(self, rhs: &QualPath) -> QualPath {
        let mut parts = self.parts.clone();
        parts.extend(rhs.parts.iter().cloned());
        QualPath::from_parts(parts)
    }
}

impl Div<QualPath> for QualPath {
    type Output = QualPath;

    fn div(self, rhs: QualPath) -> QualPath {
        &self / &rhs
    }
}

impl Div<&QualPath> for QualPath {
    type Output = QualPath;

    fn div(self, rhs: &QualPath) -> QualPath {
        &self / rhs
    }
}

impl Sub<&QualPath> for &QualPath {
    type Output = QualPath;

    /// Removes `rhs` when it is the exact right suffix of `self`.
    ///
    /// Only the start index `len(self) - len(rhs)` is tried; a mismatch there
    /// returns `self` unchanged rather than searching other positions.
    fn sub(self, rhs: &QualPath) -> QualPath {
        if rhs.parts.len() > self.parts.len() {
            return self.clone();
        }
        let start = self.parts.len() - rhs.parts.len();
        if self.parts[start..] != rhs.parts[..] {
            return self.clone();
        }
        QualPath::from_parts(self.parts[..start].iter().cloned().collect())
    }
}

impl Sub<QualPath> for QualPath {
    type Output = QualPath;

    fn sub(self, rhs: QualPath) -> QualPath {
        &self - &rhs
    }
}

impl Sub<&QualPath> for QualPath {
    type Output = QualPath;

    fn sub(self, rhs: &QualPath) -> QualPath {
        &self - rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qp(value: &str) -> QualPath {
        QualPath::parse(value).unwrap()
    }

    #[test]
    fn test_parse_round_trip() {
        let path = qp("hata.discord.guild");
        assert_eq!(path.parts().collect::<Vec<_>>(), ["hata", "discord", "guild"]);
        assert_eq!(path.to_string(), "hata.discord.guild");
        assert_eq!(path, "hata.discord.guild");
    }

    #[test]
    fn test_empty_segment_rejected() {
        assert!(QualPath::parse("a..b").is_err());
        assert!(QualPath::parse(".a").is_err());
        assert!(QualPath::parse("a.").is_err());
        assert!(QualPath::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_from_pieces() {
        let base = qp("hata.discord");
        let path = QualPath::from_pieces(&[(&base).into(), "guild.Guild".into()]).unwrap();
        assert_eq!(path, "hata.discord.guild.Guild");
    }

    #[test]
    fn test_parent() {
        assert_eq!(qp("a.b.c").parent(), qp("a.b"));
        assert!(QualPath::empty().parent().is_empty());
    }

    #[test]
    fn test_join() {
        let joined = qp("a.b") / qp("c");
        assert_eq!(joined.parts().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(&qp("c") / &qp("a.b"), qp("c.a.b"));
    }

    #[test]
    fn test_subtract_suffix() {
        assert_eq!(qp("a.b.c") - qp("b.c"), qp("a"));
        assert_eq!(qp("a.b.c") - qp("a.b.c"), QualPath::empty());
    }

    #[test]
    fn test_subtract_non_suffix_is_noop() {
        assert_eq!(qp("a.b.c") - qp("a.b"), qp("a.b.c"));
        assert_eq!(qp("a.b") - qp("x.a.b"), qp("a.b"));
    }

    #[test]
    fn test_endswith() {
        let path = qp("hata.Client.events");
        assert!(path.endswith("events"));
        assert!(path.endswith_multi(&["Client", "events"]));
        assert!(!path.endswith_multi(&["hata", "events"]));
        assert!(!path.endswith_multi(&["x", "hata", "Client", "events"]));
    }

    #[test]
    fn test_str_comparison_requires_full_match() {
        assert_ne!(qp("a.b"), "a.bc");
        assert_ne!(qp("a.b"), "a");
        assert_ne!(qp("ab"), "a.b");
    }

    #[test]
    fn test_suffixes() {
        let suffixes: Vec<_> = qp("a.b.c").suffixes().collect();
        assert_eq!(suffixes, ["a.b.c", "b.c", "c"]);
    }

    #[test]
    fn test_hash_matches_equality() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(qp("a.b"));
        assert!(set.contains(&(qp("a") / qp("b"))));
    }
}
