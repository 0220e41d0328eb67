//! # Reference Graph Guard
//!
//! Composites reference materials and instances reference constellations.
//! Both graphs must stay acyclic, so every edit that adds an edge first asks
//! whether the new target can already reach the owner.

use std::collections::HashSet;

/// Returns true if `root` is reachable from `candidate` through `edges`
/// (including `candidate == root`).
///
/// The traversal is an iterative depth-first search with a visited set, so
/// diamonds are explored once and a graph that is already cyclic cannot
/// loop. Nodes the closure does not know about should simply yield no edges.
///
/// ```
/// use amf_doc::guard::reaches;
///
/// // 0 -> 1 -> 2
/// let edges = |n: usize| match n {
///     0 => vec![1],
///     1 => vec![2],
///     _ => vec![],
/// };
/// assert!(reaches(2, 0, edges));
/// assert!(!reaches(0, 2, edges));
/// ```
pub fn reaches<F, I>(root: usize, candidate: usize, edges: F) -> bool
where
    F: Fn(usize) -> I,
    I: IntoIterator<Item = usize>,
{
    let mut visited = HashSet::new();
    let mut stack = vec![candidate];

    while let Some(node) = stack.pop() {
        if node == root {
            return true;
        }
        if !visited.insert(node) {
            continue;
        }
        stack.extend(edges(node).into_iter().filter(|n| !visited.contains(n)));
    }

    false
}
