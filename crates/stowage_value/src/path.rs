//! Typed field paths.
//!
//! Paths locate a leaf inside a nested value. They are kept as typed
//! segments internally and rendered to the dotted wire format used by
//! storage engines and flat projections:
//!
//! | Path | Wire |
//! |------|------|
//! | field `name` | `name` |
//! | field `tags`, index 0 | `tags.0` |
//! | field `attrs`, map key `color` | `attrs.color` |
//! | root | (empty) |

use std::fmt;
use std::str::FromStr;

/// A segment of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Named record field.
    Field(String),
    /// Array position.
    Index(usize),
    /// Stringified map key.
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) | PathSegment::Key(name) => f.write_str(name),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Path from the root of a value to one of its members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The root path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a path from segments.
    #[must_use]
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Parses a dotted path. All-digit segments become indexes.
    ///
    /// Parsing is lossy for map keys: `attrs.color` parses as two field
    /// segments, which render identically.
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::root();
        }
        let segments = text
            .split('.')
            .map(|part| {
                if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                    part.parse()
                        .map_or_else(|_| PathSegment::Field(part.to_string()), PathSegment::Index)
                } else {
                    PathSegment::Field(part.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// Returns the segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true for the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the last segment.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Returns the parent path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Appends a segment in place.
    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    /// Removes the last segment in place.
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    /// Returns a child path extended by `segment`.
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut child = self.clone();
        child.push(segment);
        child
    }

    /// Returns true if `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &FieldPath) -> bool {
        self.len() < other.len() && other.segments.starts_with(&self.segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_dotted() {
        let path = FieldPath::root()
            .child(PathSegment::Field("tags".into()))
            .child(PathSegment::Index(0));
        assert_eq!(path.to_string(), "tags.0");

        let path = FieldPath::from_segments(vec![
            PathSegment::Field("attrs".into()),
            PathSegment::Key("color".into()),
        ]);
        assert_eq!(path.to_string(), "attrs.color");
        assert_eq!(FieldPath::root().to_string(), "");
    }

    #[test]
    fn parse_recognizes_indexes() {
        let path = FieldPath::parse("items.3.name");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Field("items".into()),
                PathSegment::Index(3),
                PathSegment::Field("name".into()),
            ]
        );
        assert_eq!(path.to_string(), "items.3.name");
        assert!(FieldPath::parse("").is_root());
    }

    #[test]
    fn push_pop_and_parent() {
        let mut path = FieldPath::parse("a.b");
        path.push(PathSegment::Index(1));
        assert_eq!(path.to_string(), "a.b.1");
        assert_eq!(path.pop(), Some(PathSegment::Index(1)));
        assert_eq!(path.parent(), Some(FieldPath::parse("a")));
        assert_eq!(FieldPath::root().parent(), None);
    }

    #[test]
    fn ancestry() {
        let a = FieldPath::parse("a");
        let ab = FieldPath::parse("a.b");
        assert!(a.is_ancestor_of(&ab));
        assert!(!ab.is_ancestor_of(&a));
        assert!(!a.is_ancestor_of(&a));
        assert!(FieldPath::root().is_ancestor_of(&a));
    }
}
