//! Property-based tests for call-tree reconstruction and output
//!
//! Core properties:
//! 1. Reconstruction inverts flattening for any well-nested forest
//! 2. Recording a forest through the profiler reproduces its shape
//! 3. JSON output parses back into the reconstructed forest
//! 4. Text output has one line per event at the right indentation
//! 5. Duration formatting never panics and picks the right unit

use proptest::prelude::*;
use scopeprof::format::{format_duration, TimeUnit};
use scopeprof::json_output::{JsonEvent, ProfileDocument};
use scopeprof::reconstruct::{build_forest, flatten, CallNode};
use scopeprof::{Clock, Event, ManualClock, OutputFormat, Profiler, ProfilerConfig, ScopedTimer};
use std::sync::Arc;

const NAMES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

/// Generated call shape: gap before entry, own work before exit
#[derive(Debug, Clone)]
struct Shape {
    name: &'static str,
    gap: u64,
    work: u64,
    children: Vec<Shape>,
}

/// Name-only tree used to compare shapes independently of timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
struct Outline {
    name: &'static str,
    children: Vec<Outline>,
}

impl From<&Shape> for Outline {
    fn from(shape: &Shape) -> Self {
        Self {
            name: shape.name,
            children: shape.children.iter().map(Outline::from).collect(),
        }
    }
}

impl From<&CallNode> for Outline {
    fn from(node: &CallNode) -> Self {
        Self {
            name: node.event.name,
            children: node.children.iter().map(Outline::from).collect(),
        }
    }
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    // gap and work are at least 1 so timestamps strictly increase
    let leaf = (0..NAMES.len(), 1u64..5, 1u64..50).prop_map(|(n, gap, work)| Shape {
        name: NAMES[n],
        gap,
        work,
        children: Vec::new(),
    });
    leaf.prop_recursive(5, 48, 4, |inner| {
        (
            0..NAMES.len(),
            1u64..5,
            1u64..50,
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(n, gap, work, children)| Shape {
                name: NAMES[n],
                gap,
                work,
                children,
            })
    })
}

fn forest_strategy() -> impl Strategy<Value = Vec<Shape>> {
    prop::collection::vec(shape_strategy(), 0..5)
}

/// Lay a shape out on a timeline, producing the tree it should rebuild into
fn timed(shape: &Shape, now: &mut u64) -> CallNode {
    *now += shape.gap;
    let start = *now;
    let children = shape.children.iter().map(|c| timed(c, now)).collect();
    *now += shape.work;
    CallNode::with_children(Event::new(shape.name, start, *now), children)
}

/// Execute a shape with real scope guards against a manual clock
fn execute(shape: &Shape, clock: &ManualClock) {
    clock.advance(shape.gap);
    let _timer = ScopedTimer::new(shape.name);
    for child in &shape.children {
        execute(child, clock);
    }
    clock.advance(shape.work);
}

fn count(shapes: &[Shape]) -> usize {
    shapes.iter().map(|s| 1 + count(&s.children)).sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_reconstruction_inverts_flattening(shapes in forest_strategy()) {
        let mut now = 0;
        let forest: Vec<CallNode> = shapes.iter().map(|s| timed(s, &mut now)).collect();

        let events = flatten(&forest);
        prop_assert_eq!(events.len(), count(&shapes));
        prop_assert_eq!(build_forest(&events), forest);
    }

    #[test]
    fn prop_flattened_events_are_in_entry_order(shapes in forest_strategy()) {
        let mut now = 0;
        let forest: Vec<CallNode> = shapes.iter().map(|s| timed(s, &mut now)).collect();

        let events = flatten(&forest);
        prop_assert!(events.windows(2).all(|w| w[0].start < w[1].start));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_recorded_scopes_rebuild_their_shape(shapes in forest_strategy()) {
        let clock = Arc::new(ManualClock::new());
        let profiler = Profiler::with_clock(ProfilerConfig::new(4096, 1), Arc::clone(&clock))
            .unwrap()
            .leak();
        profiler.declare_thread("prop").unwrap();

        for shape in &shapes {
            execute(shape, &clock);
        }

        let report = &profiler.snapshot()[0];
        prop_assert_eq!(report.events.len(), count(&shapes));
        prop_assert_eq!(report.dropped, 0);

        let rebuilt: Vec<Outline> = build_forest(&report.events).iter().map(Outline::from).collect();
        let expected: Vec<Outline> = shapes.iter().map(Outline::from).collect();
        prop_assert_eq!(rebuilt, expected);
    }

    #[test]
    fn prop_json_output_parses_back(shapes in forest_strategy()) {
        let clock = Arc::new(ManualClock::new());
        let profiler = Profiler::with_clock(ProfilerConfig::new(4096, 1), Arc::clone(&clock))
            .unwrap()
            .leak();
        profiler.declare_thread("json").unwrap();
        for shape in &shapes {
            execute(shape, &clock);
        }

        let json = profiler.dump_to_string(OutputFormat::Json).unwrap();
        let doc = ProfileDocument::from_json(&json).unwrap();

        let events = &profiler.snapshot()[0].events;
        let expected: Vec<JsonEvent> = build_forest(events).iter().map(JsonEvent::from).collect();
        prop_assert_eq!(doc.thread(0).unwrap(), expected.as_slice());

        let bounds = profiler.bounds();
        prop_assert_eq!(doc.bounds, bounds);
        if shapes.is_empty() {
            prop_assert_eq!(bounds.max, 0);
        } else {
            prop_assert_eq!(bounds.min, shapes[0].gap);
            prop_assert_eq!(bounds.max, clock.now());
        }
    }

    #[test]
    fn prop_text_output_indents_by_depth(shapes in forest_strategy()) {
        let mut now = 0;
        let forest: Vec<CallNode> = shapes.iter().map(|s| timed(s, &mut now)).collect();
        let events = flatten(&forest);

        let mut text = String::new();
        scopeprof::text_output::render_thread(&mut text, 0, "T", &events, 0).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        prop_assert_eq!(lines.len(), events.len() + 1);
        prop_assert_eq!(lines[0], "== 0-T ==");

        fn depths(nodes: &[CallNode], depth: usize, out: &mut Vec<(usize, &'static str)>) {
            for node in nodes {
                out.push((depth, node.event.name));
                depths(&node.children, depth + 1, out);
            }
        }
        let mut expected = Vec::new();
        depths(&forest, 0, &mut expected);

        for (line, (depth, name)) in lines[1..].iter().zip(expected) {
            let indent = "    ".repeat(depth + 1);
            prop_assert!(line.starts_with(&indent));
            let label = format!("{}: ", name);
            prop_assert!(line[indent.len()..].starts_with(&label));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_format_duration_picks_unit(ns in any::<u64>()) {
        let rendered = format_duration(ns);
        let unit = TimeUnit::for_duration(ns);
        prop_assert!(rendered.ends_with(unit.suffix()));

        let number = rendered.trim_end_matches(unit.suffix()).trim_end();
        let (whole, hundredths) = number.split_once('.').unwrap();
        prop_assert_eq!(hundredths.len(), 2);
        prop_assert_eq!(whole.parse::<u64>().unwrap(), ns / unit.divider());
        if unit != TimeUnit::Seconds {
            prop_assert!(whole.parse::<u64>().unwrap() < 1000);
        }
    }
}
