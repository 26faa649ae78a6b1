//! # radix-rs
//!
//! A compressed prefix tree (radix/PATRICIA trie) mapping variable-length
//! byte-string keys to `u64` values, intended as the in-memory index of a
//! key-value store.
//!
//! Edges carry multi-byte labels, so chains of single-child nodes are merged
//! and tree depth is proportional to key divergence rather than key length.
//! The tree supports point insert, point lookup, deletion with automatic
//! re-compression, and ordered successor traversal over the full key space.
//!
//! ## Example
//!
//! ```rust
//! use radix_rs::RadixTree;
//!
//! let mut tree = RadixTree::new();
//! tree.put(b"hello", 1);
//! tree.put(b"world", 2);
//!
//! assert_eq!(tree.lookup(b"hello"), Some(1));
//! assert_eq!(tree.lookup(b"world"), Some(2));
//! assert_eq!(tree.next_key(b"hello").as_deref(), Some(&b"world"[..]));
//! ```

use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

// =============================================================================
// Configuration
// =============================================================================

/// Fixed increment by which an edge vector's backing storage grows; storage
/// shrinks again once slack reaches twice this amount.
const EDGES_DELTA: usize = 4;

/// Inline capacity for edge labels; longer labels spill to the heap.
const INLINE_LABEL_BYTES: usize = 8;

type Label = SmallVec<[u8; INLINE_LABEL_BYTES]>;

// =============================================================================
// Search keys
// =============================================================================

/// Sort/search key of one edge: the first byte of its label, or `Terminator`
/// for the zero-length label that marks the end of a key at this level.
///
/// `Terminator` orders strictly before every `Byte(_)`, so a terminator edge
/// is always the least entry of its edge vector.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum SearchKey {
    Terminator,
    Byte(u8),
}

impl SearchKey {
    #[inline]
    fn of(bytes: &[u8]) -> Self {
        match bytes.first() {
            Some(&b) => SearchKey::Byte(b),
            None => SearchKey::Terminator,
        }
    }
}

/// Outcome of comparing an edge label against the remaining query suffix.
///
/// `Prefix` covers both the exact match and the label being a proper prefix
/// of the suffix; which of the two it is follows from the lengths.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LabelCmp {
    Less,
    Prefix,
    Greater,
}

/// Byte-wise lexicographic comparison where a label that is a prefix of the
/// suffix is reported as `Prefix` rather than `Less`: its subtree may still
/// contain keys on either side of the query.
fn compare_label(label: &[u8], suffix: &[u8]) -> LabelCmp {
    for (a, b) in label.iter().zip(suffix) {
        match a.cmp(b) {
            Ordering::Less => return LabelCmp::Less,
            Ordering::Greater => return LabelCmp::Greater,
            Ordering::Equal => {}
        }
    }
    if label.len() <= suffix.len() {
        LabelCmp::Prefix
    } else {
        LabelCmp::Greater
    }
}

#[inline]
fn longest_common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

// =============================================================================
// Nodes
// =============================================================================

/// A leaf terminates a stored key and carries its value; an inner node's
/// label is a shared prefix and owns the edge vector of its continuations.
#[derive(Clone, PartialEq, Eq)]
enum Payload {
    Leaf(u64),
    Inner(EdgeVector),
}

/// One edge of the trie: an owned label plus a leaf value or a child vector.
///
/// A zero-length label is valid only on leaves and represents a terminator
/// edge (the stored key ends exactly at the accumulated prefix).
#[derive(Clone, PartialEq, Eq)]
struct Node {
    label: Label,
    payload: Payload,
}

impl Node {
    fn leaf(label: &[u8], value: u64) -> Self {
        Node {
            label: Label::from_slice(label),
            payload: Payload::Leaf(value),
        }
    }

    #[inline]
    fn search_key(&self) -> SearchKey {
        SearchKey::of(&self.label)
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        matches!(self.payload, Payload::Leaf(_))
    }

    /// Split this node at `at` label bytes: it becomes an inner node labelled
    /// with the shared prefix, holding its own remainder (original payload,
    /// possibly a terminator) and the new key's remainder as a fresh leaf.
    fn split(&mut self, at: usize, key: &[u8], value: u64) {
        debug_assert!(at <= self.label.len() && at <= key.len());
        debug_assert!(at < self.label.len() || at < key.len());

        let rest = Label::from_slice(&self.label[at..]);
        self.label.truncate(at);

        let old_payload = std::mem::replace(&mut self.payload, Payload::Inner(EdgeVector::new()));
        if let Payload::Inner(subv) = &mut self.payload {
            subv.insert(Node {
                label: rest,
                payload: old_payload,
            });
            subv.insert(Node::leaf(&key[at..], value));
        }
    }
}

// =============================================================================
// Edge vectors
// =============================================================================

/// Sorted collection of one trie level's children, keyed by the first byte
/// of each child's label (terminator first) and unique by that byte.
///
/// Backing storage grows by [`EDGES_DELTA`] entries at a time and shrinks by
/// `2 * EDGES_DELTA` once that much slack has accumulated, so alternating
/// insert/delete at a capacity boundary does not thrash the allocator.
#[derive(Clone, PartialEq, Eq)]
struct EdgeVector {
    nodes: Vec<Node>,
}

/// A successor candidate located by [`EdgeVector::successor_from`].
enum Successor<'a> {
    /// Every key in this child's subtree is strictly greater than the query
    /// suffix; the least of them is the answer.
    Greater(&'a Node),
    /// The child's label is an exact byte-wise prefix of the query suffix;
    /// inequality is not yet established and the search continues inside
    /// `child` with the label bytes consumed.
    Into {
        index: usize,
        node: &'a Node,
        child: &'a EdgeVector,
    },
}

impl EdgeVector {
    fn new() -> Self {
        EdgeVector {
            nodes: Vec::with_capacity(EDGES_DELTA),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn position(&self, key: SearchKey) -> Result<usize, usize> {
        self.nodes.binary_search_by(|n| n.search_key().cmp(&key))
    }

    fn lookup(&self, key: SearchKey) -> Option<&Node> {
        let idx = self.position(key).ok()?;
        Some(&self.nodes[idx])
    }

    /// Insert or replace, keyed by the new node's own first label byte.
    fn insert(&mut self, node: Node) {
        match self.position(node.search_key()) {
            Ok(idx) => self.nodes[idx] = node,
            Err(idx) => {
                if self.nodes.len() == self.nodes.capacity() {
                    self.nodes.reserve_exact(EDGES_DELTA);
                }
                self.nodes.insert(idx, node);
            }
        }
    }

    /// Remove the entry with this search key, if present.
    fn remove(&mut self, key: SearchKey) -> Option<Node> {
        let idx = self.position(key).ok()?;
        Some(self.remove_at(idx))
    }

    fn remove_at(&mut self, idx: usize) -> Node {
        let node = self.nodes.remove(idx);
        if self.nodes.capacity() - self.nodes.len() >= 2 * EDGES_DELTA {
            self.nodes.shrink_to(self.nodes.capacity() - 2 * EDGES_DELTA);
        }
        node
    }

    /// Find the least child whose subtree can contain a key `>= suffix`
    /// (`want_equal`) or `> suffix` (strictly greater).
    ///
    /// Binary search by first byte narrows the candidates to at most one
    /// same-first-byte child; a tri-way label comparison then decides between
    /// descending into it and falling through to the next sibling, every key
    /// under which is strictly greater by its first byte alone.
    fn successor_from(&self, suffix: &[u8], want_equal: bool) -> Option<Successor<'_>> {
        let from = match self.position(SearchKey::of(suffix)) {
            Ok(idx) => {
                let node = &self.nodes[idx];
                match compare_label(&node.label, suffix) {
                    LabelCmp::Greater => return Some(Successor::Greater(node)),
                    LabelCmp::Prefix => match &node.payload {
                        Payload::Inner(child) => {
                            return Some(Successor::Into {
                                index: idx,
                                node,
                                child,
                            })
                        }
                        Payload::Leaf(_) => {
                            if node.label.len() == suffix.len() && want_equal {
                                // Exact hit, and equality qualifies.
                                return Some(Successor::Greater(node));
                            }
                            // The leaf's key ends at or before the query.
                            idx + 1
                        }
                    },
                    LabelCmp::Less => idx + 1,
                }
            }
            Err(idx) => idx,
        };
        self.nodes.get(from).map(Successor::Greater)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// The successor key found by [`RadixTree::next_into`] does not fit the
/// caller's buffer. The buffer is left unmodified.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CapacityError {
    /// Length of the key that was found.
    pub needed: usize,
    /// Capacity of the buffer it was supposed to go into.
    pub capacity: usize,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "successor key of {} bytes exceeds buffer capacity {}",
            self.needed, self.capacity
        )
    }
}

impl std::error::Error for CapacityError {}

// =============================================================================
// Tree operations
// =============================================================================

/// A compressed prefix tree mapping byte-string keys to `u64` values.
///
/// Ownership is strictly hierarchical: the tree owns its root edge vector,
/// each inner node owns its child vector, and each vector owns its nodes.
/// The structure is single-threaded; callers needing cross-thread sharing
/// must layer their own synchronization on top.
#[derive(Clone, PartialEq, Eq)]
pub struct RadixTree {
    rootv: EdgeVector,
    count: usize,
}

impl RadixTree {
    pub fn new() -> Self {
        RadixTree {
            rootv: EdgeVector::new(),
            count: 0,
        }
    }

    /// Number of stored keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Insert `key` with `value`, overwriting any previous value in place.
    /// Overwriting never changes the tree shape.
    pub fn put(&mut self, key: &[u8], value: u64) {
        if Self::put_in(&mut self.rootv, key, value) {
            self.count += 1;
        }
    }

    /// Returns true when a new key was introduced (as opposed to overwrite).
    fn put_in(ev: &mut EdgeVector, key: &[u8], value: u64) -> bool {
        let idx = match ev.position(SearchKey::of(key)) {
            Err(_) => {
                // First byte never seen at this level: the whole remaining
                // key becomes a single new edge.
                ev.insert(Node::leaf(key, value));
                return true;
            }
            Ok(idx) => idx,
        };

        let node = &mut ev.nodes[idx];
        let lcp = longest_common_prefix(&node.label, key);

        if lcp == node.label.len() {
            match &mut node.payload {
                // The label is fully consumed: pass through to the next level.
                Payload::Inner(child) => return Self::put_in(child, &key[lcp..], value),
                // Exact key already stored: overwrite in place.
                Payload::Leaf(v) if lcp == key.len() => {
                    *v = value;
                    return false;
                }
                // Leaf, but the new key continues further: split below, with
                // the old node degrading to a terminator edge.
                Payload::Leaf(_) => {}
            }
        }

        node.split(lcp, key, value);
        true
    }

    /// Look up `key`, with an explicit found/not-found result.
    pub fn lookup(&self, key: &[u8]) -> Option<u64> {
        Self::get_in(&self.rootv, key)
    }

    /// Look up `key`, returning 0 when absent.
    ///
    /// 0 is indistinguishable from a stored zero value through this surface;
    /// use [`lookup`](Self::lookup) when that matters.
    pub fn get(&self, key: &[u8]) -> u64 {
        self.lookup(key).unwrap_or(0)
    }

    fn get_in(ev: &EdgeVector, key: &[u8]) -> Option<u64> {
        let node = ev.lookup(SearchKey::of(key))?;
        if key.len() < node.label.len() || key[..node.label.len()] != node.label[..] {
            return None;
        }
        match &node.payload {
            Payload::Leaf(value) if key.len() == node.label.len() => Some(*value),
            Payload::Leaf(_) => None,
            Payload::Inner(child) => Self::get_in(child, &key[node.label.len()..]),
        }
    }

    /// Remove `key` if present; removing an absent key is a no-op.
    pub fn remove(&mut self, key: &[u8]) {
        if Self::remove_in(&mut self.rootv, key) {
            self.count -= 1;
        }
    }

    fn remove_in(ev: &mut EdgeVector, key: &[u8]) -> bool {
        let Ok(idx) = ev.position(SearchKey::of(key)) else {
            return false;
        };

        let label_len = ev.nodes[idx].label.len();
        if key.len() < label_len || key[..label_len] != ev.nodes[idx].label[..] {
            return false;
        }

        if key.len() == label_len && ev.nodes[idx].is_leaf() {
            ev.remove_at(idx);
            return true;
        }

        let removed = match &mut ev.nodes[idx].payload {
            Payload::Inner(child) => Self::remove_in(child, &key[label_len..]),
            Payload::Leaf(_) => false,
        };

        if removed {
            Self::merge_sole_child(ev, idx);
        }
        removed
    }

    /// If the inner node at `idx` is left with a single child, collapse the
    /// two into one node (parent label ++ child label, child payload), so no
    /// redundant single-child level survives a removal.
    fn merge_sole_child(ev: &mut EdgeVector, idx: usize) {
        let merged = {
            let node = &mut ev.nodes[idx];
            match &mut node.payload {
                Payload::Inner(child) if child.len() == 1 => child.nodes.pop().map(|sole| {
                    let mut label = node.label.clone();
                    label.extend_from_slice(&sole.label);
                    Node {
                        label,
                        payload: sole.payload,
                    }
                }),
                _ => None,
            }
        };
        if let Some(node) = merged {
            // Same first label byte, so the slot's sort position is unchanged.
            ev.nodes[idx] = node;
        }
    }

    /// Find the smallest stored key strictly greater than `key`.
    ///
    /// An empty `key` denotes "before all stored keys", so feeding each
    /// result back in enumerates the whole tree in ascending order. `None`
    /// signals the end of iteration (the input was the greatest key, or the
    /// tree is empty).
    pub fn next_key(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        if Self::next_in(&self.rootv, key, false, &mut out) {
            Some(out)
        } else {
            None
        }
    }

    /// Successor search with a fixed-buffer calling convention: `buf[..len]`
    /// holds the query key; on success the buffer is overwritten with the
    /// found key and the new length returned, with 0 signalling the end of
    /// iteration. A key longer than the buffer is reported as
    /// [`CapacityError`] and leaves the buffer untouched.
    ///
    /// # Panics
    ///
    /// Panics if `len > buf.len()`.
    pub fn next_into(&self, buf: &mut [u8], len: usize) -> Result<usize, CapacityError> {
        assert!(len <= buf.len(), "query length exceeds buffer");
        match self.next_key(&buf[..len]) {
            None => Ok(0),
            Some(found) => {
                if found.len() > buf.len() {
                    return Err(CapacityError {
                        needed: found.len(),
                        capacity: buf.len(),
                    });
                }
                buf[..found.len()].copy_from_slice(&found);
                Ok(found.len())
            }
        }
    }

    /// Recursive successor descent. `out` accumulates root-to-leaf labels;
    /// on `false` it is restored to the length it had on entry.
    ///
    /// `want_equal` starts out false (the query key itself must not match)
    /// and flips to true as soon as the search moves to a strictly greater
    /// sibling: from then on the least key of the subtree is wanted, and the
    /// terminator-first ordering makes it the first leaf reached.
    fn next_in(ev: &EdgeVector, suffix: &[u8], want_equal: bool, out: &mut Vec<u8>) -> bool {
        match ev.successor_from(suffix, want_equal) {
            None => false,
            Some(Successor::Greater(node)) => Self::min_in(node, out),
            Some(Successor::Into { index, node, child }) => {
                let mark = out.len();
                out.extend_from_slice(&node.label);
                if Self::next_in(child, &suffix[node.label.len()..], want_equal, out) {
                    return true;
                }
                // Nothing inside the continuation subtree qualifies; any
                // later sibling is strictly greater by its first byte.
                out.truncate(mark);
                match ev.nodes.get(index + 1) {
                    Some(sibling) => Self::min_in(sibling, out),
                    None => false,
                }
            }
        }
    }

    /// Take the least key of `node`'s subtree.
    fn min_in(node: &Node, out: &mut Vec<u8>) -> bool {
        out.extend_from_slice(&node.label);
        match &node.payload {
            Payload::Leaf(_) => true,
            Payload::Inner(child) => Self::next_in(child, &[], true, out),
        }
    }

    /// Iterate all `(key, value)` pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            tree: self,
            cursor: Vec::new(),
            started: false,
        }
    }

    /// Recursively print the tree structure to stdout. Diagnostics only.
    pub fn dump(&self) {
        println!("==============================================");
        println!("<root>:");
        Self::dump_ev(&self.rootv, 1);
        println!("==============================================");
    }

    fn dump_ev(ev: &EdgeVector, depth: usize) {
        for node in &ev.nodes {
            let indent = "    ".repeat(depth);
            let label = String::from_utf8_lossy(&node.label);
            match &node.payload {
                Payload::Leaf(value) => println!("{indent}{label}: {value}"),
                Payload::Inner(child) => {
                    println!("{indent}{label}:");
                    Self::dump_ev(child, depth + 1);
                }
            }
        }
    }
}

impl Default for RadixTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RadixTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Ascending iterator over `(key, value)` pairs, driven by the successor
/// search fed back its own previous result.
pub struct Iter<'a> {
    tree: &'a RadixTree,
    cursor: Vec<u8>,
    started: bool,
}

impl Iterator for Iter<'_> {
    type Item = (Vec<u8>, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            // The successor walk starts strictly after the empty key, so a
            // stored empty key has to be yielded up front.
            if let Some(value) = self.tree.lookup(b"") {
                return Some((Vec::new(), value));
            }
        }
        let key = self.tree.next_key(&self.cursor)?;
        let value = self.tree.lookup(&key)?;
        self.cursor.clone_from(&key);
        Some((key, value))
    }
}


#[cfg(test)]
mod proptests;
