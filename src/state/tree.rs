use crate::types::Step;
use std::collections::HashMap;

/// A step together with the steps that name it as their parent.
///
/// Nodes borrow from the flat step list and are rebuilt from scratch whenever
/// that list changes.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<'a> {
    pub step: &'a Step,
    pub index: usize,
    pub children: Vec<TreeNode<'a>>,
}

/// The step's own id, or its position in the received sequence when absent.
pub fn effective_id(step: &Step, index: usize) -> i64 {
    step.id.unwrap_or(index as i64)
}

/// Builds the call forest for a flat, parent-linked step list.
///
/// Siblings and roots keep the order in which their steps appear in `steps`.
/// A step whose parent id is unknown becomes a root. When two steps share an
/// id the later one owns that id for parent lookups. Nesting depth is not
/// bounded by the call stack.
pub fn build_tree(steps: &[Step]) -> Vec<TreeNode<'_>> {
    let mut by_id: HashMap<i64, usize> = HashMap::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        by_id.insert(effective_id(step, index), index);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
    let mut roots = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        match step.parent_id.and_then(|parent| by_id.get(&parent).copied()) {
            Some(parent) => children[parent].push(index),
            None => roots.push(index),
        }
    }

    // Pre-order walk with an explicit stack; every reachable index is listed
    // before its children. Parent cycles are never reached from a root.
    let mut order = Vec::with_capacity(steps.len());
    let mut pending: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(index) = pending.pop() {
        order.push(index);
        pending.extend(children[index].iter().rev().copied());
    }

    // Build bottom-up so no call depth grows with the nesting depth.
    let mut built: Vec<Option<TreeNode<'_>>> = (0..steps.len()).map(|_| None).collect();
    for &index in order.iter().rev() {
        let node = TreeNode {
            step: &steps[index],
            index,
            children: children[index]
                .iter()
                .filter_map(|&child| built[child].take())
                .collect(),
        };
        built[index] = Some(node);
    }

    roots
        .into_iter()
        .filter_map(|index| built[index].take())
        .collect()
}

// The derived drop would recurse once per level.
impl Drop for TreeNode<'_> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}
