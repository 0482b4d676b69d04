//! Type-erased tree nodes.
//!
//! An [`Entry`] is either a pure directory or a leaf that refers to an
//! object owned by someone else. Leaves keep only a [`Weak`] reference plus
//! the object's runtime type, so the tree never extends an object's life
//! and a dropped object shows up as [`VfsError::Expired`] instead of a
//! dangling access.

use std::any::{Any, TypeId};
use std::sync::{Arc, RwLock, Weak};

use crate::error::{Result, VfsError};

/// How a leaf's object may be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Mounted from an `Arc<T>`; immutable access only.
    Shared,
    /// Mounted from an `Arc<RwLock<T>>`; read as the lock, written through it.
    Exclusive,
}

/// A borrowed, type-tagged reference to a mounted object.
#[derive(Clone)]
pub struct Leaf {
    object: Weak<dyn Any + Send + Sync>,
    object_type: TypeId,
    type_id: TypeId,
    type_name: &'static str,
    access: Access,
}

impl Leaf {
    /// Refer to `obj` for immutable access.
    pub fn shared<T: Any + Send + Sync>(obj: &Arc<T>) -> Self {
        let object: Weak<dyn Any + Send + Sync> = Arc::downgrade(obj) as Weak<T>;
        Leaf {
            object,
            object_type: TypeId::of::<T>(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            access: Access::Shared,
        }
    }

    /// Refer to `obj` for mutable access through its lock.
    ///
    /// The type tag is `T`; immutable access sees the `RwLock<T>` itself.
    pub fn exclusive<T: Any + Send + Sync>(obj: &Arc<RwLock<T>>) -> Self {
        let object: Weak<dyn Any + Send + Sync> = Arc::downgrade(obj) as Weak<RwLock<T>>;
        Leaf {
            object,
            object_type: TypeId::of::<RwLock<T>>(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            access: Access::Exclusive,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// Whether the referenced object is still alive.
    pub fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }
}

impl std::fmt::Debug for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leaf")
            .field("type_name", &self.type_name)
            .field("access", &self.access)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// A node in the VFS tree.
#[derive(Debug)]
pub struct Entry {
    name: String,
    desc: String,
    leaf: Option<Leaf>,
}

impl Entry {
    /// A pure directory node.
    pub fn directory(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Entry {
            name: name.into(),
            desc: desc.into(),
            leaf: None,
        }
    }

    /// A leaf node bound to an externally owned object.
    pub fn leaf(name: impl Into<String>, leaf: Leaf, desc: impl Into<String>) -> Self {
        Entry {
            name: name.into(),
            desc: desc.into(),
            leaf: Some(leaf),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    /// The leaf reference, if this node holds an object.
    pub fn leaf_ref(&self) -> Option<&Leaf> {
        self.leaf.as_ref()
    }

    /// Runtime type of the held object; `None` for directories.
    pub fn type_id(&self) -> Option<TypeId> {
        self.leaf.as_ref().map(Leaf::type_id)
    }

    /// True when this node holds an object of type `T`.
    pub fn holds<T: Any>(&self) -> bool {
        self.type_id() == Some(TypeId::of::<T>())
    }

    /// True when the held object may only be accessed immutably.
    pub fn is_const(&self) -> bool {
        matches!(self.leaf, Some(Leaf { access: Access::Shared, .. }))
    }

    /// Name of the held type, truncated to `max_chars` (0 = no limit).
    ///
    /// Directories report `"directory"`.
    pub fn type_name(&self, max_chars: usize) -> String {
        let full = self.leaf.as_ref().map_or("directory", Leaf::type_name);
        truncate(full, max_chars)
    }

    /// Fetch the object mounted at this node for immutable access.
    ///
    /// `T` is the type of the mounted `Arc`, so a leaf mounted for mutable
    /// access is read back as its `RwLock`.
    pub fn obj<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        let leaf = self.require_leaf()?;
        if leaf.object_type != TypeId::of::<T>() {
            return Err(self.wrong_type());
        }
        let object = leaf.object.upgrade().ok_or_else(|| self.expired())?;
        object.downcast::<T>().map_err(|_| self.wrong_type())
    }

    /// Fetch the object mounted at this node for mutable access.
    pub fn obj_mut<T: Any + Send + Sync>(&self) -> Result<Arc<RwLock<T>>> {
        let leaf = self.require_leaf()?;
        if leaf.type_id != TypeId::of::<T>() {
            return Err(self.wrong_type());
        }
        if leaf.access == Access::Shared {
            return Err(VfsError::BadCast {
                name: self.name.clone(),
                message: format!("must be retrieved as const {}", leaf.type_name),
            });
        }
        let object = leaf.object.upgrade().ok_or_else(|| self.expired())?;
        object
            .downcast::<RwLock<T>>()
            .map_err(|_| self.wrong_type())
    }

    fn require_leaf(&self) -> Result<&Leaf> {
        self.leaf.as_ref().ok_or_else(|| VfsError::NotLeaf {
            name: self.name.clone(),
        })
    }

    fn wrong_type(&self) -> VfsError {
        VfsError::BadCast {
            name: self.name.clone(),
            message: format!("is not of type {}", self.type_name(0)),
        }
    }

    fn expired(&self) -> VfsError {
        VfsError::Expired {
            name: self.name.clone(),
        }
    }
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if max_chars == 0 || count <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}
