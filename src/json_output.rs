//! JSON output format for profile dumps
//!
//! Rendering streams straight from the reconstruction walk ([`JsonRenderer`]);
//! the serde types below describe the same document for consumers that parse
//! it back.
//!
//! ```text
//! {
//!   "bounds": {"min": 100, "max": 400},
//!   "threads": {
//!     "0-Main": [
//!       {
//!         "name": "A",
//!         "start": "100",
//!         "end": "400",
//!         "subs": [ ... ]
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! `start` and `end` are decimal strings so 64-bit nanosecond values survive
//! parsers that read every number as a double.

use crate::error::{ProfilerError, Result};
use crate::event::Event;
use crate::reconstruct::{reconstruct, CallNode, TreeNode, TreeSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::str::FromStr;

/// Indentation unit
const PAD: &str = "  ";

/// Nesting level of a top-level event object inside the document
const EVENT_LEVEL: usize = 3;

fn pad<W: Write + ?Sized>(out: &mut W, level: usize) -> fmt::Result {
    for _ in 0..level {
        out.write_str(PAD)?;
    }
    Ok(())
}

/// Write `s` as a quoted JSON string
pub fn write_json_string<W: Write + ?Sized>(out: &mut W, s: &str) -> fmt::Result {
    let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
    out.write_str(&quoted)
}

/// [`TreeSink`] writing nested event objects
///
/// Children go into a `subs` array that is only opened when the node has
/// children.
pub struct JsonRenderer<'w, W: Write + ?Sized> {
    out: &'w mut W,
    /// Per depth: whether the currently open array already has an element
    written: Vec<bool>,
}

impl<'w, W: Write + ?Sized> JsonRenderer<'w, W> {
    pub fn new(out: &'w mut W) -> Self {
        Self {
            out,
            written: Vec::new(),
        }
    }

    fn level(depth: usize) -> usize {
        EVENT_LEVEL + 2 * depth
    }
}

impl<W: Write + ?Sized> TreeSink for JsonRenderer<'_, W> {
    type Error = fmt::Error;

    fn enter(&mut self, node: &TreeNode<'_>) -> fmt::Result {
        let depth = node.depth;
        let level = Self::level(depth);

        // Arrays deeper than this node were closed by earlier exits.
        self.written.truncate(depth + 1);
        if self.written.len() <= depth {
            self.written.resize(depth + 1, false);
        }
        if self.written[depth] {
            self.out.write_str(",\n")?;
        }
        self.written[depth] = true;

        pad(&mut *self.out, level)?;
        self.out.write_str("{\n")?;
        pad(&mut *self.out, level + 1)?;
        self.out.write_str("\"name\": ")?;
        write_json_string(&mut *self.out, node.event.name)?;
        self.out.write_str(",\n")?;
        pad(&mut *self.out, level + 1)?;
        writeln!(self.out, "\"start\": \"{}\",", node.event.start)?;
        pad(&mut *self.out, level + 1)?;
        write!(self.out, "\"end\": \"{}\"", node.event.end)?;

        if node.has_children {
            self.out.write_str(",\n")?;
            pad(&mut *self.out, level + 1)?;
            self.out.write_str("\"subs\": [\n")?;
        }
        Ok(())
    }

    fn exit(&mut self, node: &TreeNode<'_>) -> fmt::Result {
        let level = Self::level(node.depth);
        self.out.write_char('\n')?;
        if node.has_children {
            pad(&mut *self.out, level + 1)?;
            self.out.write_str("]\n")?;
        }
        pad(&mut *self.out, level)?;
        self.out.write_char('}')
    }
}

/// Write one thread's event array, starting at `[`
pub fn render_thread<W: Write + ?Sized>(out: &mut W, events: &[Event]) -> fmt::Result {
    if events.is_empty() {
        return out.write_str("[]");
    }
    out.write_str("[\n")?;
    reconstruct(events, &mut JsonRenderer::new(&mut *out))?;
    out.write_char('\n')?;
    pad(out, EVENT_LEVEL - 1)?;
    out.write_char(']')
}

/// Global time bounds of a dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u64,
    pub max: u64,
}

/// One event object of the structured output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonEvent {
    pub name: String,
    #[serde(with = "u64_string")]
    pub start: u64,
    #[serde(with = "u64_string")]
    pub end: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subs: Vec<JsonEvent>,
}

impl JsonEvent {
    pub fn duration_ns(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

impl From<&CallNode> for JsonEvent {
    fn from(node: &CallNode) -> Self {
        Self {
            name: node.event.name.to_string(),
            start: node.event.start,
            end: node.event.end,
            subs: node.children.iter().map(JsonEvent::from).collect(),
        }
    }
}

/// The whole structured dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub bounds: Bounds,
    /// Keyed by `"{index}-{name}"`
    pub threads: BTreeMap<String, Vec<JsonEvent>>,
}

impl ProfileDocument {
    /// Parse a structured dump
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Threads in declaration order
    ///
    /// The map is keyed by string, so `"10-x"` would otherwise sort before
    /// `"2-y"`.
    pub fn threads_in_order(&self) -> Result<Vec<(ThreadKey, &[JsonEvent])>> {
        let mut threads = self
            .threads
            .iter()
            .map(|(key, events)| Ok((key.parse::<ThreadKey>()?, events.as_slice())))
            .collect::<Result<Vec<_>>>()?;
        threads.sort_by_key(|(key, _)| key.index);
        Ok(threads)
    }

    /// Events of the thread declared at `index`
    pub fn thread(&self, index: usize) -> Option<&[JsonEvent]> {
        self.threads.iter().find_map(|(key, events)| {
            key.parse::<ThreadKey>()
                .ok()
                .filter(|k| k.index == index)
                .map(|_| events.as_slice())
        })
    }
}

/// Parsed `"{index}-{name}"` thread key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadKey {
    pub index: usize,
    pub name: String,
}

impl FromStr for ThreadKey {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        let (index, name) = s
            .split_once('-')
            .ok_or_else(|| ProfilerError::InvalidThreadKey(s.to_string()))?;
        let index = index
            .parse()
            .map_err(|_| ProfilerError::InvalidThreadKey(s.to_string()))?;
        Ok(Self {
            index,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.index, self.name)
    }
}

/// `u64` carried as a decimal JSON string
mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
