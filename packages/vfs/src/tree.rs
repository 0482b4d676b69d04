//! The VFS tree: an arena of [`Entry`] nodes and the path walker.
//!
//! Nodes live in one `Vec` and are addressed by [`EntryId`]. The tree only
//! grows, so an id handed out once stays valid for the tree's lifetime no
//! matter how many nodes are added afterwards.

use std::any::TypeId;
use std::fmt::Write as _;

use crate::entry::{Entry, Leaf};
use crate::error::{Result, VfsError};
use crate::fs::Dirent;
use crate::Path;

/// Stable handle to a node of a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Node {
    entry: Entry,
    parent: Option<EntryId>,
    children: Vec<EntryId>,
}

/// Options for [`Tree::walk_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Create missing tokens as directory nodes.
    pub create: bool,
    /// Stop at a directory-entry leaf when the next token isn't in the tree.
    pub partial: bool,
}

/// The outcome of a walk: the node reached and the tokens left over.
///
/// `rest` is only non-empty for partial walks that stopped at a file-system
/// boundary; those tokens are for the file system to interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub node: EntryId,
    pub rest: Path,
}

/// An owning tree of VFS entries.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

const ROOT: EntryId = EntryId(0);

impl Tree {
    /// Create a tree holding only a root directory.
    pub fn new(root_name: impl Into<String>, root_desc: impl Into<String>) -> Self {
        Tree {
            nodes: vec![Node {
                entry: Entry::directory(root_name, root_desc),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> EntryId {
        ROOT
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The entry behind `id`, if `id` belongs to this tree.
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.nodes.get(id.0).map(|n| &n.entry)
    }

    pub fn parent(&self, id: EntryId) -> Option<EntryId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Children of `id` in insertion order.
    pub fn children(&self, id: EntryId) -> &[EntryId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn child_count(&self, id: EntryId) -> usize {
        self.children(id).len()
    }

    /// Look up a direct child by name.
    pub fn child(&self, id: EntryId, name: &str) -> Option<EntryId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].entry.name() == name)
    }

    /// Absolute path of `id`.
    pub fn path_of(&self, id: EntryId) -> Path {
        let mut components = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.0];
            if node.parent.is_some() {
                components.push(node.entry.name().to_string());
            }
            current = node.parent;
        }
        components.reverse();
        Path { components }
    }

    fn is_stat_boundary(&self, id: EntryId) -> bool {
        self.nodes[id.0].entry.type_id() == Some(TypeId::of::<Dirent>())
    }

    /// Walk `path` from the root without modifying the tree.
    ///
    /// With `partial`, a walk that runs out of tree at a directory-entry
    /// leaf stops there and returns the unconsumed tokens in
    /// [`Walk::rest`]. Returns `None` when the path doesn't resolve.
    pub fn walk(&self, path: &Path, partial: bool) -> Option<Walk> {
        let mut current = ROOT;
        for (depth, token) in path.iter().enumerate() {
            match self.child(current, token) {
                Some(next) => current = next,
                None if partial && self.is_stat_boundary(current) => {
                    return Some(Walk {
                        node: current,
                        rest: path.suffix(depth),
                    });
                }
                None => return None,
            }
        }
        Some(Walk {
            node: current,
            rest: Path::root(),
        })
    }

    /// Walk `path` from the root, creating missing tokens when asked.
    ///
    /// Tokens are consumed greedily left to right. A missing token stops a
    /// partial walk at a directory-entry leaf first; otherwise it becomes a
    /// new directory when `create` is set, or ends the walk with `Ok(None)`.
    /// Nodes created along the way stay created even if a later token
    /// fails with [`VfsError::NotParent`].
    pub fn walk_with(&mut self, path: &Path, options: WalkOptions) -> Result<Option<Walk>> {
        let mut current = ROOT;
        for (depth, token) in path.iter().enumerate() {
            current = match self.child(current, token) {
                Some(next) => next,
                None if options.partial && self.is_stat_boundary(current) => {
                    return Ok(Some(Walk {
                        node: current,
                        rest: path.suffix(depth),
                    }));
                }
                None if options.create => self.insert_directory(current, token)?,
                None => return Ok(None),
            };
        }
        Ok(Some(Walk {
            node: current,
            rest: Path::root(),
        }))
    }

    /// Make sure every directory above the last token of `path` exists.
    ///
    /// Returns the would-be parent of the last token. The last token itself
    /// is never created.
    pub fn make_parents(&mut self, path: &Path) -> Result<EntryId> {
        let parent = match path.split_last() {
            Some((parent, _)) => parent,
            None => return Ok(ROOT),
        };
        let options = WalkOptions {
            create: true,
            partial: false,
        };
        match self.walk_with(&parent, options)? {
            Some(walk) => Ok(walk.node),
            None => Err(VfsError::not_found(format!("path {} does not exist", parent))),
        }
    }

    /// Mount `leaf` at `path`.
    ///
    /// The parent is created on demand when `create` is set. The mount point
    /// itself must be free. On failure the tree is left as it was, except for
    /// intermediate directories already created on the way.
    pub fn mount(
        &mut self,
        path: &Path,
        leaf: Leaf,
        desc: impl Into<String>,
        create: bool,
    ) -> Result<EntryId> {
        let (parent_path, token) = path
            .split_last()
            .ok_or_else(|| VfsError::mountpoint_invalid("can't mount on the root"))?;

        let parent = if create {
            self.make_parents(path)?
        } else {
            self.walk(&parent_path, false)
                .map(|walk| walk.node)
                .ok_or_else(|| {
                    VfsError::mountpoint_invalid(format!("{} doesn't exist", parent_path))
                })?
        };

        if self.child(parent, token).is_some() {
            return Err(VfsError::mountpoint_invalid(format!(
                "mount point {} occupied",
                path
            )));
        }

        self.insert(parent, Entry::leaf(token, leaf, desc))
    }

    fn insert_directory(&mut self, parent: EntryId, token: &str) -> Result<EntryId> {
        self.insert(parent, Entry::directory(token, "Directory"))
    }

    fn insert(&mut self, parent: EntryId, entry: Entry) -> Result<EntryId> {
        let parent_entry = &self.nodes[parent.0].entry;
        if parent_entry.is_leaf() {
            return Err(VfsError::NotParent {
                name: parent_entry.name().to_string(),
            });
        }

        let id = EntryId(self.nodes.len());
        self.nodes.push(Node {
            entry,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Render the tree as indented text.
    ///
    /// ```text
    /// -- /
    ///    |-- dev
    ///    |   `-- counter (i32)
    ///    `-- mnt
    /// ```
    pub fn render(&self, type_name_width: usize) -> String {
        let mut out = String::new();
        self.render_node(ROOT, String::new(), type_name_width, &mut out);
        out
    }

    fn render_node(&self, id: EntryId, tabs: String, width: usize, out: &mut String) {
        let node = &self.nodes[id.0];
        let _ = write!(out, "{}-- {}", tabs, node.entry.name());
        if node.entry.is_leaf() {
            let _ = write!(out, " ({})", node.entry.type_name(width));
        }
        out.push('\n');

        let tabs = tabs.replace('`', " ");
        let last = node.children.len().saturating_sub(1);
        for (i, child) in node.children.iter().enumerate() {
            let connector = if i < last { "   |" } else { "   `" };
            self.render_node(*child, format!("{}{}", tabs, connector), width, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use std::sync::Arc;

    fn tree() -> Tree {
        Tree::new("/", "Root directory")
    }

    #[test]
    fn new_tree_has_only_root() {
        let t = tree();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(t.root()).unwrap().name(), "/");
        assert_eq!(t.child_count(t.root()), 0);
        assert_eq!(t.parent(t.root()), None);
    }

    #[test]
    fn walk_with_create_makes_every_missing_token() {
        let mut t = tree();
        let options = WalkOptions {
            create: true,
            partial: false,
        };
        let walk = t.walk_with(&path!("/a/b/c"), options).unwrap().unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.path_of(walk.node), path!("/a/b/c"));
        assert!(walk.rest.is_empty());

        // Same walk again creates nothing new
        let again = t.walk_with(&path!("/a/b/c"), options).unwrap().unwrap();
        assert_eq!(again.node, walk.node);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn walk_without_create_misses() {
        let mut t = tree();
        assert!(t.walk(&path!("/a"), false).is_none());
        assert!(t
            .walk_with(&path!("/a"), WalkOptions::default())
            .unwrap()
            .is_none());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn empty_path_walks_to_root() {
        let t = tree();
        let walk = t.walk(&Path::root(), false).unwrap();
        assert_eq!(walk.node, t.root());
    }

    #[test]
    fn make_parents_stops_before_last_token() {
        let mut t = tree();
        let parent = t.make_parents(&path!("/a/b/c")).unwrap();
        assert_eq!(t.path_of(parent), path!("/a/b"));
        assert_eq!(t.len(), 3);
        assert!(t.walk(&path!("/a/b/c"), false).is_none());
    }

    #[test]
    fn mount_inserts_leaf() {
        let mut t = tree();
        let value = Arc::new(42i32);
        let id = t
            .mount(&path!("/dev/counter"), Leaf::shared(&value), "counter", true)
            .unwrap();

        let entry = t.get(id).unwrap();
        assert_eq!(entry.name(), "counter");
        assert_eq!(entry.desc(), "counter");
        assert_eq!(*entry.obj::<i32>().unwrap(), 42);
        assert_eq!(t.walk(&path!("/dev/counter"), false).unwrap().node, id);
    }

    #[test]
    fn mount_on_occupied_point_fails_and_leaves_tree_alone() {
        let mut t = tree();
        let value = Arc::new(1u8);
        t.mount(&path!("/x/y"), Leaf::shared(&value), "", true)
            .unwrap();
        let before = t.render(0);

        let err = t
            .mount(&path!("/x/y"), Leaf::shared(&value), "", true)
            .unwrap_err();
        assert!(matches!(err, VfsError::MountpointInvalid { .. }));
        assert_eq!(t.render(0), before);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn mount_without_create_needs_parent() {
        let mut t = tree();
        let value = Arc::new(1u8);
        let err = t
            .mount(&path!("/missing/y"), Leaf::shared(&value), "", false)
            .unwrap_err();
        assert!(matches!(err, VfsError::MountpointInvalid { .. }));
        assert_eq!(t.len(), 1);

        t.make_parents(&path!("/present/y")).unwrap();
        t.mount(&path!("/present/y"), Leaf::shared(&value), "", false)
            .unwrap();
    }

    #[test]
    fn mount_on_root_is_invalid() {
        let mut t = tree();
        let value = Arc::new(1u8);
        assert!(matches!(
            t.mount(&Path::root(), Leaf::shared(&value), "", true),
            Err(VfsError::MountpointInvalid { .. })
        ));
    }

    #[test]
    fn leaves_cannot_have_children() {
        let mut t = tree();
        let value = Arc::new(1u8);
        t.mount(&path!("/leaf"), Leaf::shared(&value), "", true)
            .unwrap();

        let err = t
            .mount(&path!("/leaf/child"), Leaf::shared(&value), "", true)
            .unwrap_err();
        assert!(matches!(err, VfsError::NotParent { .. }));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn children_keep_insertion_order() {
        let mut t = tree();
        for name in ["zeta", "alpha", "mid"] {
            t.make_parents(&path!(&format!("/{}/x", name))).unwrap();
        }
        let names: Vec<&str> = t
            .children(t.root())
            .iter()
            .map(|id| t.get(*id).unwrap().name())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn render_draws_connectors() {
        let mut t = tree();
        let value = Arc::new(42i32);
        t.mount(&path!("/dev/counter"), Leaf::shared(&value), "", true)
            .unwrap();
        t.make_parents(&path!("/mnt/x")).unwrap();

        let expected = "\
-- /
   |-- dev
   |   `-- counter (i32)
   `-- mnt
";
        assert_eq!(t.render(20), expected);
    }

    #[test]
    fn render_truncates_type_names() {
        let mut t = tree();
        let value = Arc::new(String::from("hi"));
        t.mount(&path!("/motd"), Leaf::shared(&value), "", true)
            .unwrap();
        assert!(t.render(10).contains("-- motd (alloc::...)"));
    }
}
