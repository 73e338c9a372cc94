use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::{Cost, FxIndexMap, Time};

pub type NodeId = usize;

/// A search node. `g` is the arrival time at `(i, j)` and doubles as the path
/// cost from the start under unit move costs.
#[derive(Debug, Clone)]
pub struct Node {
    pub i: i32,
    pub j: i32,
    pub g: Time,
    pub h: f64,
    pub f: Cost,
    /// Safe-interval index at `(i, j)`; unused by the timestep baseline.
    pub interval: usize,
    /// Variant marker for the dual-queue search; plain searches leave it set.
    pub optimal: bool,
    pub parent: Option<NodeId>,
}

/// Node identity for duplicate detection. `slot` is the safe-interval index
/// for interval searches and the arrival time for the timestep baseline;
/// `optimal` separates the two variants of the dual-queue search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub i: i32,
    pub j: i32,
    pub slot: i64,
    pub optimal: bool,
}

impl Node {
    /// Identity for interval-based searches: `(cell, interval, variant)`.
    #[inline]
    pub fn interval_key(&self) -> NodeKey {
        NodeKey { i: self.i, j: self.j, slot: self.interval as i64, optimal: self.optimal }
    }

    /// Identity for the timestep baseline: `(cell, arrival time)`.
    #[inline]
    pub fn timestep_key(&self) -> NodeKey {
        NodeKey { i: self.i, j: self.j, slot: self.g, optimal: self.optimal }
    }
}

struct OpenEntry {
    f: Cost,
    seq: u64,
    key: NodeKey,
    id: NodeId,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the maximum: flip `f` for a min-queue, and break
        // ties toward the newest generation
        match other.f.cmp(&self.f) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
    }
}

/// Duplicate handling of the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Closed identities stay closed. Duplicates may sit in OPEN (callers
    /// pre-filter with [`SearchTree::was_expanded`]) and are discarded lazily
    /// at pop.
    NoReexpansion,
    /// A closed identity reached again with a better `f` is reopened.
    Reexpansion,
}

/// OPEN/CLOSED frontier shared by every search in the crate. Owns all nodes
/// ever created (parent links are indices into that arena), a deterministic
/// min-heap ordered by `(f, generation)`, and the closed map.
pub struct SearchTree {
    policy: Policy,
    nodes: Vec<Node>,
    open: BinaryHeap<OpenEntry>,
    closed: FxIndexMap<NodeKey, NodeId>,
    reexpanded: usize,
    seq: u64,
}

impl SearchTree {
    pub fn new(policy: Policy) -> SearchTree {
        SearchTree {
            policy,
            nodes: Vec::new(),
            open: BinaryHeap::new(),
            closed: FxIndexMap::default(),
            reexpanded: 0,
            seq: 0,
        }
    }

    /// Stores a node and returns its id. Every stored node counts toward
    /// `nodes_created`, whether or not it later enters OPEN.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub fn nodes_created(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn open_is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn add_to_open(&mut self, key: NodeKey, id: NodeId) {
        match self.policy {
            Policy::NoReexpansion => self.push(key, id),
            Policy::Reexpansion => match self.closed.get(&key) {
                Some(&incumbent) if self.nodes[id].f < self.nodes[incumbent].f => {
                    self.closed.swap_remove(&key);
                    self.reexpanded += 1;
                    self.push(key, id);
                }
                Some(_) => {} // not an improvement
                None => self.push(key, id),
            },
        }
    }

    fn push(&mut self, key: NodeKey, id: NodeId) {
        self.open.push(OpenEntry { f: self.nodes[id].f, seq: self.seq, key, id });
        self.seq += 1;
    }

    /// Extracts the best OPEN entry, lazily discarding entries whose identity
    /// was closed after they were pushed.
    pub fn pop_best(&mut self) -> Option<NodeId> {
        while let Some(entry) = self.open.pop() {
            if !self.closed.contains_key(&entry.key) {
                return Some(entry.id);
            }
        }
        None
    }

    pub fn add_to_closed(&mut self, key: NodeKey, id: NodeId) {
        self.closed.insert(key, id);
    }

    #[inline]
    pub fn was_expanded(&self, key: &NodeKey) -> bool {
        self.closed.contains_key(key)
    }

    #[inline]
    pub fn reexpanded(&self) -> usize {
        self.reexpanded
    }

    /// Consumes the tree into a result snapshot. Remaining OPEN ids come out
    /// in pop order, stale duplicates included.
    pub fn into_result(self, found: bool, goal: Option<NodeId>, steps: usize) -> SearchResult {
        let mut heap = self.open;
        let mut open = Vec::with_capacity(heap.len());
        while let Some(entry) = heap.pop() {
            open.push(entry.id);
        }
        SearchResult {
            found,
            goal,
            steps,
            nodes_created: self.nodes.len(),
            reexpanded: self.reexpanded,
            open,
            closed: self.closed.values().copied().collect(),
            nodes: self.nodes,
        }
    }
}

/// Outcome of one search invocation. Owns the whole node arena, so the goal
/// node's ancestry stays reachable for path reconstruction.
pub struct SearchResult {
    pub found: bool,
    pub goal: Option<NodeId>,
    /// Main-loop iterations.
    pub steps: usize,
    pub nodes_created: usize,
    pub reexpanded: usize,
    pub open: Vec<NodeId>,
    pub closed: Vec<NodeId>,
    pub nodes: Vec<Node>,
}

impl SearchResult {
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn goal_node(&self) -> Option<&Node> {
        self.goal.map(|id| &self.nodes[id])
    }

    /// Path length in timesteps, when found.
    pub fn length(&self) -> Option<Time> {
        self.goal_node().map(|n| n.g)
    }
}

//

#[cfg(test)]
fn test_node(g: Time, f: f64, interval: usize) -> Node {
    Node { i: 0, j: interval as i32, g, h: 0.0, f: Cost::from(f), interval, optimal: true, parent: None }
}

#[test]
fn pop_order_is_min_f_then_newest() {
    let mut tree = SearchTree::new(Policy::NoReexpansion);
    let a = tree.alloc(test_node(0, 2.0, 0));
    let b = tree.alloc(test_node(0, 1.0, 1));
    let c = tree.alloc(test_node(0, 1.0, 2));
    for id in [a, b, c] {
        tree.add_to_open(tree.node(id).interval_key(), id);
    }

    // ties on f = 1.0 resolve toward the newest push
    assert_eq!(tree.pop_best(), Some(c));
    assert_eq!(tree.pop_best(), Some(b));
    assert_eq!(tree.pop_best(), Some(a));
    assert_eq!(tree.pop_best(), None);
}

#[test]
fn closed_duplicates_are_discarded_lazily() {
    let mut tree = SearchTree::new(Policy::NoReexpansion);
    let a = tree.alloc(test_node(0, 1.0, 0));
    let dup = tree.alloc(test_node(0, 3.0, 0));
    tree.add_to_open(tree.node(a).interval_key(), a);
    tree.add_to_open(tree.node(dup).interval_key(), dup);

    assert_eq!(tree.pop_best(), Some(a));
    tree.add_to_closed(tree.node(a).interval_key(), a);
    // the stale duplicate shares the closed identity and is skipped
    assert_eq!(tree.pop_best(), None);
}

#[test]
fn reexpansion_reopens_only_improved_nodes() {
    let mut tree = SearchTree::new(Policy::Reexpansion);
    let a = tree.alloc(test_node(5, 5.0, 0));
    tree.add_to_open(tree.node(a).interval_key(), a);
    assert_eq!(tree.pop_best(), Some(a));
    tree.add_to_closed(tree.node(a).interval_key(), a);

    let worse = tree.alloc(test_node(6, 6.0, 0));
    tree.add_to_open(tree.node(worse).interval_key(), worse);
    assert_eq!(tree.reexpanded(), 0);
    assert_eq!(tree.pop_best(), None);

    let better = tree.alloc(test_node(3, 3.0, 0));
    tree.add_to_open(tree.node(better).interval_key(), better);
    assert_eq!(tree.reexpanded(), 1);
    assert_eq!(tree.pop_best(), Some(better));
}
