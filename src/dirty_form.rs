//! Dirty form guard
//!
//! Forms register a marker in the scope of the surface that mounted them
//! and flip it dirty while they hold unsaved edits. Scopes form a tree: the
//! root scope is the primary view, each open overlay gets a child scope. A
//! scope is dirty when any marker in its subtree is dirty.
//!
//! The guard is passed around as an explicit handle ([`DirtyFormGuard`] is a
//! cheap clone of a shared tree); there is no global state.

use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Prompt shown before discarding unsaved edits
pub const UNSAVED_CHANGES_PROMPT: &str =
    "This page has unsaved changes. Are you sure you want to navigate away?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

/// Asks the user whether unsaved edits may be discarded.
///
/// Runs synchronously; navigation waits for the answer before any fetch.
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

#[derive(Debug)]
struct ScopeNode {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
}

#[derive(Debug)]
struct Marker {
    scope: ScopeId,
    dirty: bool,
}

#[derive(Debug)]
struct GuardTree {
    root: ScopeId,
    scopes: HashMap<ScopeId, ScopeNode>,
    markers: HashMap<MarkerId, Marker>,
    next_scope: u64,
    next_marker: u64,
}

impl GuardTree {
    fn new() -> Self {
        let root = ScopeId(0);
        let mut scopes = HashMap::new();
        scopes.insert(
            root,
            ScopeNode {
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            root,
            scopes,
            markers: HashMap::new(),
            next_scope: 1,
            next_marker: 0,
        }
    }

    fn insert_scope(&mut self, parent: ScopeId) -> Option<ScopeId> {
        let id = ScopeId(self.next_scope);
        self.scopes.get_mut(&parent)?.children.push(id);
        self.next_scope += 1;
        self.scopes.insert(
            id,
            ScopeNode {
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        log::debug!("Created dirty-form scope {:?} under {:?}", id, parent);
        Some(id)
    }

    /// The scope and all its descendants
    fn subtree(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut stack = vec![scope];
        let mut found = Vec::new();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.scopes.get(&id) {
                found.push(id);
                stack.extend(node.children.iter().copied());
            }
        }
        found
    }
}

/// Shared handle to the scope tree
#[derive(Debug, Clone)]
pub struct DirtyFormGuard {
    tree: Rc<RefCell<GuardTree>>,
}

impl Default for DirtyFormGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtyFormGuard {
    pub fn new() -> Self {
        Self {
            tree: Rc::new(RefCell::new(GuardTree::new())),
        }
    }

    /// Scope of the primary view
    pub fn root(&self) -> ScopeId {
        self.tree.borrow().root
    }

    pub fn create_scope(&self, parent: ScopeId) -> Result<ScopeId> {
        match self.tree.borrow_mut().insert_scope(parent) {
            Some(id) => Ok(id),
            None => anyhow::bail!("Unknown parent scope {:?}", parent),
        }
    }

    /// Create a scope directly under the root, as each overlay gets
    pub fn create_root_child(&self) -> Result<ScopeId> {
        self.create_scope(self.root())
    }

    /// Remove a scope, its descendants and every marker registered in them.
    ///
    /// The root scope cannot be removed.
    pub fn remove_scope(&self, scope: ScopeId) {
        let mut tree = self.tree.borrow_mut();
        if scope == tree.root {
            log::warn!("Refusing to remove the root dirty-form scope");
            return;
        }

        let doomed = tree.subtree(scope);
        if doomed.is_empty() {
            return;
        }
        if let Some(parent) = tree.scopes.get(&scope).and_then(|node| node.parent) {
            if let Some(parent_node) = tree.scopes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != scope);
            }
        }
        for id in &doomed {
            tree.scopes.remove(id);
        }
        tree.markers.retain(|_, marker| !doomed.contains(&marker.scope));
        log::debug!("Removed dirty-form scope {:?} ({} scopes)", scope, doomed.len());
    }

    pub fn has_scope(&self, scope: ScopeId) -> bool {
        self.tree.borrow().scopes.contains_key(&scope)
    }

    pub fn register_marker(&self, scope: ScopeId) -> Result<MarkerId> {
        let mut tree = self.tree.borrow_mut();
        if !tree.scopes.contains_key(&scope) {
            anyhow::bail!("Cannot register a form marker in unknown scope {:?}", scope);
        }
        let id = MarkerId(tree.next_marker);
        tree.next_marker += 1;
        tree.markers.insert(id, Marker { scope, dirty: false });
        Ok(id)
    }

    /// Forget a marker; unknown markers are ignored
    pub fn unregister_marker(&self, marker: MarkerId) {
        self.tree.borrow_mut().markers.remove(&marker);
    }

    pub fn set_dirty(&self, marker: MarkerId, dirty: bool) {
        match self.tree.borrow_mut().markers.get_mut(&marker) {
            Some(entry) => entry.dirty = dirty,
            None => log::debug!("Ignoring set_dirty on unregistered marker {:?}", marker),
        }
    }

    pub fn is_scope_dirty(&self, scope: ScopeId) -> bool {
        let tree = self.tree.borrow();
        let subtree = tree.subtree(scope);
        tree.markers
            .values()
            .any(|marker| marker.dirty && subtree.contains(&marker.scope))
    }

    /// Whether leaving the application entirely would lose edits
    pub fn should_block_unload(&self) -> bool {
        self.is_scope_dirty(self.root())
    }

    /// Returns true when `scope` may be discarded: it is clean, or the user
    /// confirmed through `prompt`.
    pub fn confirm_discard(&self, scope: ScopeId, prompt: &dyn ConfirmPrompt) -> bool {
        if !self.is_scope_dirty(scope) {
            return true;
        }
        let confirmed = prompt.confirm(UNSAVED_CHANGES_PROMPT);
        log::info!("Unsaved changes in scope {:?}, user confirmed: {}", scope, confirmed);
        confirmed
    }

    /// Handle for components mounted inside `scope`
    pub fn context(&self, scope: ScopeId) -> DirtyFormContext {
        DirtyFormContext {
            guard: self.clone(),
            scope,
        }
    }
}

/// What a mounted component sees of the guard: its own scope
#[derive(Debug, Clone)]
pub struct DirtyFormContext {
    guard: DirtyFormGuard,
    scope: ScopeId,
}

impl DirtyFormContext {
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn is_dirty(&self) -> bool {
        self.guard.is_scope_dirty(self.scope)
    }

    /// Register a form; the marker unregisters itself when dropped
    pub fn register(&self) -> Result<DirtyFormMarker> {
        let id = self.guard.register_marker(self.scope)?;
        Ok(DirtyFormMarker {
            guard: self.guard.clone(),
            id,
        })
    }
}

/// A registered form, owned by whoever mounted it
#[derive(Debug)]
pub struct DirtyFormMarker {
    guard: DirtyFormGuard,
    id: MarkerId,
}

impl DirtyFormMarker {
    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.guard.set_dirty(self.id, dirty);
    }
}

impl Drop for DirtyFormMarker {
    fn drop(&mut self) {
        self.guard.unregister_marker(self.id);
    }
}
