//! Property paths
//!
//! A [`PropertyPath`] is the ordered sequence of property and index segments
//! from the validated root to the value currently being checked. It labels
//! every failure produced underneath it, e.g. `Orders[2].Total`.

use std::borrow::Cow;
use std::fmt;

use smallvec::SmallVec;

// ============================================================================
// PATH SEGMENT
// ============================================================================

/// One navigation step from the root model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named property access.
    Property(Cow<'static, str>),
    /// A zero-based position inside a collection property.
    Index(usize),
}

// ============================================================================
// PROPERTY PATH
// ============================================================================

/// Ordered chain of path segments.
///
/// Indexers attach to the preceding property segment without a separating
/// dot, so `["Orders", 2, "Total"]` renders as `Orders[2].Total`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyPath {
    segments: SmallVec<[PathSegment; 4]>,
}

impl PropertyPath {
    /// Creates an empty path (the root model itself).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns true if no segments have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of recorded segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Appends a property segment. Empty names are ignored so rules that
    /// target the model itself do not produce a dangling separator.
    pub fn push_property(&mut self, name: impl Into<Cow<'static, str>>) {
        let name = name.into();
        if !name.is_empty() {
            self.segments.push(PathSegment::Property(name));
        }
    }

    /// Appends an indexer segment.
    pub fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    /// Returns a new path with `name` appended.
    #[must_use]
    pub fn child(&self, name: impl Into<Cow<'static, str>>) -> Self {
        let mut path = self.clone();
        path.push_property(name);
        path
    }

    /// Builds the full property name for a value reached from this path.
    ///
    /// An empty `name` yields the path itself; an empty path yields `name`.
    #[must_use]
    pub fn qualify(&self, name: &str) -> String {
        if name.is_empty() {
            return self.to_string();
        }
        if self.segments.is_empty() {
            return name.to_owned();
        }
        format!("{self}.{name}")
    }

    /// Iterates over the recorded segments.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Property(name) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_renders_empty() {
        assert_eq!(PropertyPath::root().to_string(), "");
        assert!(PropertyPath::root().is_empty());
    }

    #[test]
    fn indexer_attaches_without_dot() {
        let mut path = PropertyPath::root();
        path.push_property("Orders");
        path.push_index(2);
        path.push_property("Total");
        assert_eq!(path.to_string(), "Orders[2].Total");
    }

    #[test]
    fn nested_collections_compose() {
        let mut path = PropertyPath::root();
        path.push_property("Customers");
        path.push_index(1);
        path.push_property("Orders");
        path.push_index(0);
        assert_eq!(path.to_string(), "Customers[1].Orders[0]");
    }

    #[test]
    fn qualify_handles_empty_parts() {
        let mut path = PropertyPath::root();
        assert_eq!(path.qualify("Name"), "Name");
        assert_eq!(path.qualify(""), "");

        path.push_property("Address");
        assert_eq!(path.qualify("City"), "Address.City");
        assert_eq!(path.qualify(""), "Address");
    }

    #[test]
    fn empty_property_names_are_ignored() {
        let mut path = PropertyPath::root();
        path.push_property("");
        path.push_property("Items");
        assert_eq!(path.len(), 1);
        assert_eq!(path.to_string(), "Items");
    }

    #[test]
    fn child_does_not_mutate_original() {
        let mut path = PropertyPath::root();
        path.push_property("Address");
        let child = path.child("City");
        assert_eq!(path.to_string(), "Address");
        assert_eq!(child.to_string(), "Address.City");
    }
}
