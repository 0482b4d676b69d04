//! Tokenized slash-separated paths.

use std::fmt;

/// A normalized, tokenized path.
///
/// Tokens are separated by `/`. Empty tokens are dropped, so `//a/b/` and
/// `a/b` are the same path. There is no escaping and no relative-path
/// resolution: `.` and `..` are ordinary tokens.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub components: Vec<String>,
}

impl Path {
    /// Parse a path string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ukvfs::Path;
    ///
    /// let path = Path::new("/dev/disk0/");
    /// assert_eq!(path.len(), 2);
    /// assert_eq!(path.to_string(), "/dev/disk0");
    /// ```
    pub fn new(s: &str) -> Self {
        Path {
            components: s
                .split('/')
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string())
                .collect(),
        }
    }

    /// The root path (no tokens).
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from tokens. Empty tokens are dropped.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path {
            components: components
                .into_iter()
                .map(Into::into)
                .filter(|c: &String| !c.is_empty())
                .collect(),
        }
    }

    /// Check if this path is empty (root path).
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    pub fn front(&self) -> Option<&str> {
        self.components.first().map(String::as_str)
    }

    pub fn back(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Remove and return the first token.
    pub fn pop_front(&mut self) -> Option<String> {
        if self.components.is_empty() {
            None
        } else {
            Some(self.components.remove(0))
        }
    }

    /// Remove and return the last token.
    pub fn pop_back(&mut self) -> Option<String> {
        self.components.pop()
    }

    /// Split into the parent path and the last token.
    ///
    /// Returns `None` for the root path.
    pub fn split_last(&self) -> Option<(Path, &str)> {
        let (last, parent) = self.components.split_last()?;
        Some((
            Path {
                components: parent.to_vec(),
            },
            last.as_str(),
        ))
    }

    /// Join this path with another.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Path { components }
    }

    /// Check if this path has the given prefix.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.components.len() <= self.components.len()
            && prefix.components == self.components[..prefix.components.len()]
    }

    /// Strip a prefix from this path.
    ///
    /// Returns `None` if the prefix doesn't match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if self.has_prefix(prefix) {
            Some(Path {
                components: self.components[prefix.components.len()..].to_vec(),
            })
        } else {
            None
        }
    }

    /// The tokens from `start` onwards, as a new path.
    pub fn suffix(&self, start: usize) -> Path {
        Path {
            components: self.components[start.min(self.len())..].to_vec(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.components.join("/"))
    }
}

impl std::ops::Index<usize> for Path {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.components[i]
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::new(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::new(&s)
    }
}

impl From<&String> for Path {
    fn from(s: &String) -> Self {
        Path::new(s)
    }
}

impl From<&Path> for Path {
    fn from(p: &Path) -> Self {
        p.clone()
    }
}

/// Macro for creating paths.
///
/// # Example
///
/// ```rust
/// use ukvfs::path;
///
/// let p = path!("/dev/counter");
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::new($s)
    };
}
