//! Ordered prefix tree keyed by elements of type `E`, carrying optional
//! values of type `V` at internal or leaf nodes.
//!
//! Mirrors the cursor-driven reading style of the teacher's bit `Cursor`:
//! callers step an explicit, cheaply-cloneable cursor rather than pulling
//! from a hidden iterator, which is what lets the text encoder explore
//! several alternative paths at once (see `crate::text::encoder`).

use crate::error::Error;

type NodeIdx = usize;

struct Node<E, V> {
    value: Option<V>,
    /// Ordered by insertion, as required by `spec.md` §4.1's "maximal
    /// prefix greedy by default" walk.
    children: Vec<(E, NodeIdx)>,
}

impl<E, V> Node<E, V> {
    fn new() -> Self {
        Self {
            value: None,
            children: Vec::new(),
        }
    }
}

/// A rooted prefix tree. Every stored `(key, value)` pair corresponds to
/// exactly one path from the root; a node may hold a value and still have
/// children when one stored key is a prefix of a longer one.
pub struct LookupTrie<E, V> {
    nodes: Vec<Node<E, V>>,
}

impl<E, V> Default for LookupTrie<E, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PartialEq + Clone, V> LookupTrie<E, V> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
        }
    }

    /// Inserts `key -> value`. Fails with [`Error::DuplicateKey`] if the
    /// exact key already has a value.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty; keys must be non-empty per the trie's
    /// invariants.
    pub fn add(&mut self, key: &[E], value: V) -> Result<(), Error> {
        assert!(!key.is_empty(), "trie keys must be non-empty");
        let mut node = 0usize;
        for elem in key {
            node = self.child_or_insert(node, elem.clone());
        }
        if self.nodes[node].value.is_some() {
            return Err(Error::DuplicateKey);
        }
        self.nodes[node].value = Some(value);
        Ok(())
    }

    fn child_or_insert(&mut self, node: NodeIdx, elem: E) -> NodeIdx {
        if let Some(&(_, child)) = self.nodes[node].children.iter().find(|(e, _)| *e == elem) {
            return child;
        }
        let new_idx = self.nodes.len();
        self.nodes.push(Node::new());
        self.nodes[node].children.push((elem, new_idx));
        new_idx
    }

    fn find_child(&self, node: NodeIdx, elem: &E) -> Option<NodeIdx> {
        self.nodes[node]
            .children
            .iter()
            .find(|(e, _)| e == elem)
            .map(|&(_, idx)| idx)
    }

    /// Consumes elements from `stream`, yielding each value encountered on
    /// the walked path from the root, in ascending depth order. Stops when
    /// no child matches the next element or the stream ends.
    pub fn try_match<I>(&self, stream: I) -> Vec<&V>
    where
        I: IntoIterator<Item = E>,
    {
        let mut out = Vec::new();
        let mut node = 0usize;
        for elem in stream {
            match self.find_child(node, &elem) {
                Some(next) => {
                    node = next;
                    if let Some(value) = &self.nodes[node].value {
                        out.push(value);
                    }
                }
                None => break,
            }
        }
        out
    }

    /// Convenience over [`Self::try_match`]: the first value reached, if
    /// any.
    pub fn try_match_first<I>(&self, stream: I) -> Option<&V>
    where
        I: IntoIterator<Item = E>,
    {
        self.try_match(stream).into_iter().next()
    }

    /// Convenience over [`Self::try_match`]: the last (longest-prefix)
    /// value reached, if any.
    pub fn try_match_last<I>(&self, stream: I) -> Option<&V>
    where
        I: IntoIterator<Item = E>,
    {
        self.try_match(stream).into_iter().last()
    }

    /// Begins an independent, clone-safe cursor at the root.
    pub fn begin_path(&self) -> Cursor<'_, E, V> {
        Cursor {
            trie: self,
            node: 0,
            depth: 0,
        }
    }
}

/// A restartable path cursor into a [`LookupTrie`]. Cursors are cheap to
/// clone (a node index and a depth counter), which is what lets the text
/// encoder fork a cursor per alternative path without copying the trie.
pub struct Cursor<'t, E, V> {
    trie: &'t LookupTrie<E, V>,
    node: NodeIdx,
    depth: usize,
}

impl<E, V> Clone for Cursor<'_, E, V> {
    fn clone(&self) -> Self {
        Self {
            trie: self.trie,
            node: self.node,
            depth: self.depth,
        }
    }
}

impl<'t, E: PartialEq + Clone, V> Cursor<'t, E, V> {
    /// Attempts to step to the child keyed by `elem`. Returns `true` and
    /// advances the cursor iff a matching child exists; otherwise the
    /// cursor is left untouched.
    pub fn step(&mut self, elem: &E) -> bool {
        match self.trie.find_child(self.node, elem) {
            Some(next) => {
                self.node = next;
                self.depth += 1;
                true
            }
            None => false,
        }
    }

    /// The value stored at the cursor's current node, if any.
    pub fn value(&self) -> Option<&'t V> {
        self.trie.nodes[self.node].value.as_ref()
    }

    /// `true` iff the current node has no children (a dead end for
    /// further matching).
    pub fn is_leaf(&self) -> bool {
        self.trie.nodes[self.node].children.is_empty()
    }

    /// Depth (number of elements stepped) from the root.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
