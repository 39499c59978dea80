//! Call-tree reconstruction from a flat event buffer
//!
//! A thread's buffer holds events in scope-entry order with no parent links.
//! The nesting is recovered from end timestamps alone:
//!
//! - events are appended on scope entry, so a child always sits after its
//!   parent and after any of the parent's earlier, already-closed children;
//! - a scope cannot exit before the scopes nested in it, so a descendant's
//!   `end` is never later than its ancestor's.
//!
//! Walking the buffer front to back, event `i` is therefore inside the open
//! ancestor `a` exactly when `events[i].end <= a.end`. Ancestors that fail the
//! test are closed and the walk continues at the same index. Each event is
//! pushed and popped once, so the pass is O(N); the ancestor stack only grows
//! to the deepest nesting seen at capture time.
//!
//! ```text
//!  index:   0          1       2        3
//!  event:   A[100,400] B[150,200] C[250,380] D[500,600]
//!
//!  A            enter A            depth 0
//!  ├── B        B.end <= A.end     depth 1
//!  └── C        C.end > B.end -> close B; C.end <= A.end  depth 1
//!  D            D.end > C.end, D.end > A.end -> close C, A  depth 0
//! ```
//!
//! Rendering happens through a [`TreeSink`] as the walk proceeds. Nothing
//! here builds a tree unless the caller asks for one with [`build_forest`].

use crate::event::Event;
use std::convert::Infallible;

/// Position of one event in the reconstructed tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNode<'a> {
    pub event: &'a Event,
    /// Index in the thread's buffer
    pub index: usize,
    /// Nesting depth, 0 for top-level scopes
    pub depth: usize,
    /// Whether the following event is nested in this one
    pub has_children: bool,
}

/// Receiver of the depth-first walk
///
/// `enter` is called in buffer order; `exit` is called once every descendant
/// of the node has been entered and exited.
pub trait TreeSink {
    type Error;

    fn enter(&mut self, node: &TreeNode<'_>) -> Result<(), Self::Error>;

    fn exit(&mut self, node: &TreeNode<'_>) -> Result<(), Self::Error>;
}

/// Replay `events` into `sink` as a properly nested tree
pub fn reconstruct<S>(events: &[Event], sink: &mut S) -> Result<(), S::Error>
where
    S: TreeSink + ?Sized,
{
    let mut open: Vec<TreeNode<'_>> = Vec::new();

    for (index, event) in events.iter().enumerate() {
        while let Some(parent) = open.last() {
            if parent.event.encloses(event) {
                break;
            }
            if let Some(done) = open.pop() {
                sink.exit(&done)?;
            }
        }

        let has_children = events
            .get(index + 1)
            .is_some_and(|next| event.encloses(next));
        let node = TreeNode {
            event,
            index,
            depth: open.len(),
            has_children,
        };
        sink.enter(&node)?;
        open.push(node);
    }

    while let Some(done) = open.pop() {
        sink.exit(&done)?;
    }

    Ok(())
}

/// A materialized call-tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallNode {
    pub event: Event,
    pub children: Vec<CallNode>,
}

impl CallNode {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            children: Vec::new(),
        }
    }

    pub fn with_children(event: Event, children: Vec<CallNode>) -> Self {
        Self { event, children }
    }

    /// Number of nodes in this subtree, including this one
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CallNode::size).sum::<usize>()
    }

    /// Depth of the deepest leaf below this node (a leaf has height 1)
    pub fn height(&self) -> usize {
        1 + self.children.iter().map(CallNode::height).max().unwrap_or(0)
    }

    /// Time not covered by any child
    pub fn self_time_ns(&self) -> u64 {
        let children: u64 = self.children.iter().map(|c| c.event.duration_ns()).sum();
        self.event.duration_ns().saturating_sub(children)
    }
}

/// Sink collecting the walk into owned [`CallNode`] trees
#[derive(Debug, Default)]
pub struct ForestBuilder {
    roots: Vec<CallNode>,
    open: Vec<CallNode>,
}

impl ForestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Vec<CallNode> {
        self.roots
    }
}

impl TreeSink for ForestBuilder {
    type Error = Infallible;

    fn enter(&mut self, node: &TreeNode<'_>) -> Result<(), Infallible> {
        self.open.push(CallNode::new(*node.event));
        Ok(())
    }

    fn exit(&mut self, _node: &TreeNode<'_>) -> Result<(), Infallible> {
        if let Some(done) = self.open.pop() {
            match self.open.last_mut() {
                Some(parent) => parent.children.push(done),
                None => self.roots.push(done),
            }
        }
        Ok(())
    }
}

/// Reconstruct `events` into owned trees
pub fn build_forest(events: &[Event]) -> Vec<CallNode> {
    let mut builder = ForestBuilder::new();
    match reconstruct(events, &mut builder) {
        Ok(()) => builder.finish(),
        Err(never) => match never {},
    }
}

/// Pre-order flattening, the order in which a thread records its scopes
pub fn flatten(forest: &[CallNode]) -> Vec<Event> {
    fn walk(node: &CallNode, out: &mut Vec<Event>) {
        out.push(node.event);
        for child in &node.children {
            walk(child, out);
        }
    }

    let mut out = Vec::new();
    for root in forest {
        walk(root, &mut out);
    }
    out
}
