use std::{
    borrow::Borrow,
    collections::{HashMap, HashSet},
    hash::Hash,
};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ScopeError {
    #[error("The key is already declared in this scope")]
    Occupied,

    #[error("The key is reserved")]
    Reserved,

    #[error("Lookup exceeded {0} parent scopes, possible scope cycle")]
    DepthExceeded(usize),
}

/// Index of a scope inside its [`ScopeTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScopeId(usize);

#[derive(Clone, Debug)]
pub struct Scope<K, V> {
    name: String,
    parent: Option<ScopeId>,
    table: HashMap<K, V>,
    order: Vec<K>,
    reserved: HashSet<K>,
}

impl<K: Eq + Hash + Clone, V> Scope<K, V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.get(key)
    }

    pub fn is_reserved<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.reserved.contains(key)
    }

    /// Entries in the order they were inserted.
    pub fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .iter()
            .filter_map(|key| self.table.get(key).map(|value| (key, value)))
    }
}

/// Arena of scopes linked to their parents by index. Scopes are never
/// removed, so a [`ScopeId`] stays valid for the lifetime of the tree.
#[derive(Clone, Debug)]
pub struct ScopeTree<K, V> {
    scopes: Vec<Scope<K, V>>,
}

impl<K: Eq + Hash + Clone, V> Default for ScopeTree<K, V> {
    fn default() -> Self {
        Self { scopes: Vec::new() }
    }
}

impl<K: Eq + Hash + Clone, V> ScopeTree<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, name: impl Into<String>, reserved: HashSet<K>) -> ScopeId {
        self.push(Scope {
            name: name.into(),
            parent: None,
            table: HashMap::new(),
            order: Vec::new(),
            reserved,
        })
    }

    /// Children inherit the reserved keys of their parent.
    pub fn add_child(&mut self, parent: ScopeId, name: impl Into<String>) -> ScopeId {
        let reserved = self.scope(parent).reserved.clone();

        self.push(Scope {
            name: name.into(),
            parent: Some(parent),
            table: HashMap::new(),
            order: Vec::new(),
            reserved,
        })
    }

    fn push(&mut self, scope: Scope<K, V>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(scope);

        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope<K, V> {
        &self.scopes[id.0]
    }

    pub fn insert(&mut self, id: ScopeId, k: K, v: V) -> Result<(), ScopeError> {
        if self.scope(id).is_reserved(&k) {
            return Err(ScopeError::Reserved);
        }

        self.insert_unreserved(id, k, v)
    }

    /// Inserts without consulting the reserved set. Occupied keys still fail.
    pub fn insert_unreserved(&mut self, id: ScopeId, k: K, v: V) -> Result<(), ScopeError> {
        let scope = &mut self.scopes[id.0];
        if scope.table.contains_key(&k) {
            return Err(ScopeError::Occupied);
        }

        scope.order.push(k.clone());
        scope.table.insert(k, v);

        Ok(())
    }

    /// Looks `key` up in `id` and then its ancestors. Needing more than
    /// `max_depth` parent hops is an error rather than a miss.
    pub fn lookup<Q>(
        &self,
        id: ScopeId,
        key: &Q,
        max_depth: usize,
    ) -> Result<Option<(ScopeId, &V)>, ScopeError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut current = Some(id);
        let mut depth = 0;

        while let Some(id) = current {
            if depth > max_depth {
                return Err(ScopeError::DepthExceeded(max_depth));
            }

            let scope = self.scope(id);
            if let Some(value) = scope.get(key) {
                return Ok(Some((id, value)));
            }

            current = scope.parent;
            depth += 1;
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (ScopeTree<String, u32>, ScopeId) {
        let mut tree = ScopeTree::new();
        let reserved = ["int".to_string()].into_iter().collect();
        let root = tree.add_root("root", reserved);

        (tree, root)
    }

    #[test]
    fn lookup_walks_parents() {
        let (mut tree, root) = tree();
        tree.insert(root, "x".into(), 1).unwrap();
        let child = tree.add_child(root, "child");
        tree.insert(child, "y".into(), 2).unwrap();

        assert_eq!(
            tree.lookup(child, "x", 32).unwrap(),
            Some((root, &1))
        );
        assert_eq!(
            tree.lookup(child, "y", 32).unwrap(),
            Some((child, &2))
        );
        assert_eq!(tree.lookup(root, "y", 32).unwrap(), None);
    }

    #[test]
    fn shadowing_finds_the_innermost_binding() {
        let (mut tree, root) = tree();
        tree.insert(root, "x".into(), 1).unwrap();
        let child = tree.add_child(root, "child");
        tree.insert(child, "x".into(), 2).unwrap();

        assert_eq!(
            tree.lookup(child, "x", 32).unwrap(),
            Some((child, &2))
        );
    }

    #[test]
    fn insert_rejects_occupied_and_reserved_keys() {
        let (mut tree, root) = tree();
        tree.insert(root, "x".into(), 1).unwrap();

        assert_eq!(tree.insert(root, "x".into(), 2), Err(ScopeError::Occupied));
        assert_eq!(tree.insert(root, "int".into(), 3), Err(ScopeError::Reserved));

        let child = tree.add_child(root, "child");
        assert_eq!(tree.insert(child, "int".into(), 3), Err(ScopeError::Reserved));

        tree.insert_unreserved(root, "int".into(), 3).unwrap();
        assert_eq!(
            tree.insert_unreserved(root, "int".into(), 4),
            Err(ScopeError::Occupied)
        );
    }

    #[test]
    fn entries_keep_insertion_order() {
        let (mut tree, root) = tree();
        for (i, name) in ["c", "a", "b"].into_iter().enumerate() {
            tree.insert(root, name.into(), i as u32).unwrap();
        }

        let keys: Vec<_> = tree.scope(root).entries().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["c", "a", "b"]);
    }

    #[test]
    fn lookup_is_bounded() {
        let (mut tree, root) = tree();
        tree.insert(root, "x".into(), 1).unwrap();

        let mut scope = root;
        for i in 0..32 {
            scope = tree.add_child(scope, format!("s{i}"));
        }
        assert!(tree.lookup(scope, "x", 32).unwrap().is_some());

        let deeper = tree.add_child(scope, "s32");
        assert_eq!(
            tree.lookup(deeper, "x", 32),
            Err(ScopeError::DepthExceeded(32))
        );
        assert_eq!(tree.lookup(deeper, "missing", 32), Err(ScopeError::DepthExceeded(32)));
    }
}
