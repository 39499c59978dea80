//! Indented text rendering of reconstructed call trees
//!
//! ```text
//! == 0-Main ==
//!     Worker fork & join: 1.02 s
//!         Load: 12.40 ms
//! ```

use crate::event::Event;
use crate::format::ScaledDuration;
use crate::reconstruct::{reconstruct, TreeNode, TreeSink};
use std::fmt::{self, Write};

const INDENT: &str = "    ";

/// [`TreeSink`] writing one `name: duration` line per event
pub struct TextRenderer<'w, W: Write + ?Sized> {
    out: &'w mut W,
}

impl<'w, W: Write + ?Sized> TextRenderer<'w, W> {
    pub fn new(out: &'w mut W) -> Self {
        Self { out }
    }
}

impl<W: Write + ?Sized> TreeSink for TextRenderer<'_, W> {
    type Error = fmt::Error;

    fn enter(&mut self, node: &TreeNode<'_>) -> fmt::Result {
        // Top-level events sit one level under the thread header.
        for _ in 0..=node.depth {
            self.out.write_str(INDENT)?;
        }
        writeln!(
            self.out,
            "{}: {}",
            node.event.name,
            ScaledDuration::from_nanos(node.event.duration_ns())
        )
    }

    fn exit(&mut self, _node: &TreeNode<'_>) -> fmt::Result {
        Ok(())
    }
}

/// Render one thread section: header, tree, and a drop notice if needed
pub fn render_thread<W: Write + ?Sized>(
    out: &mut W,
    index: usize,
    name: &str,
    events: &[Event],
    dropped: u64,
) -> fmt::Result {
    writeln!(out, "== {}-{} ==", index, name)?;
    reconstruct(events, &mut TextRenderer::new(&mut *out))?;
    if dropped > 0 {
        writeln!(out, "{}({} events dropped: buffer full)", INDENT, dropped)?;
    }
    Ok(())
}
