//! Integration tests: batch-collected sections feeding the hypotheses graph.

use std::collections::BTreeMap;
use std::sync::Arc;

use slice_kernel::graph::{ArcActive, NodeActive, NodeTimestep};
use slice_kernel::{
    BatchCollector, GraphError, HypothesesGraph, InMemorySliceSource, NodeId, Overlap, Region,
    Slice, SliceCollector, SliceId, SliceSet, Traxel,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// One object drifting right by two pixels per section, observed at two
/// levels, plus a static object that only appears in section 0.
fn build_source(sections: u32) -> InMemorySliceSource {
    let mut source = InMemorySliceSource::new();
    let mut next = 0u32;
    let mut id = || {
        next += 1;
        SliceId::new(next)
    };

    for section in 0..sections {
        let x = section as i32 * 2;
        let mut coarse = vec![Slice::new(id(), section, Region::rectangle(x, 0, 8, 8))];
        if section == 0 {
            coarse.push(Slice::new(id(), section, Region::rectangle(40, 40, 4, 4)));
        }
        source.insert_section(
            section,
            vec![
                SliceSet::from_slices(coarse).unwrap(),
                SliceSet::from_slices([Slice::new(id(), section, Region::rectangle(x, 0, 8, 7))])
                    .unwrap(),
            ],
        );
    }
    source
}

/// Nodes per consolidated slice (timestep = section); arcs between
/// overlapping slices of consecutive sections.
fn build_graph(sections: u32) -> (HypothesesGraph, BTreeMap<SliceId, NodeId>) {
    let result = BatchCollector::new(Arc::new(build_source(sections)), SliceCollector::default())
        .collect_all()
        .unwrap();

    let mut graph = HypothesesGraph::new();
    let mut nodes = BTreeMap::new();
    for (section, collected) in &result.sections {
        for slice in &collected.slices {
            let node = graph.add_node(*section as i32);
            graph.set_traxel(node, Traxel::from_slice(slice, *section as i32)).unwrap();
            nodes.insert(slice.id(), node);
        }
    }

    let raw = Overlap::raw();
    let sections: Vec<_> = result.sections.values().collect();
    for pair in sections.windows(2) {
        for a in &pair[0].slices {
            for b in &pair[1].slices {
                if raw.measure(a, b) > 0.0 {
                    graph.add_arc(nodes[&a.id()], nodes[&b.id()]).unwrap();
                }
            }
        }
    }

    (graph, nodes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_graph_from_consolidated_sections() {
    let (graph, _) = build_graph(3);

    // one drifting object per section plus the static one in section 0
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.arc_count(), 2);
    assert_eq!(graph.timesteps().iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(graph.earliest_timestep(), Ok(0));
    assert_eq!(graph.latest_timestep(), Ok(2));
    assert_eq!(graph.nodes_at(0).len(), 2);

    for arc in graph.arcs() {
        let (from, to) = graph.arc_timesteps(arc).unwrap();
        assert_eq!(to, from + 1);
        assert_eq!(graph.node_timestep(graph.source(arc).unwrap()), Some(from));
        assert_eq!(graph.node_timestep(graph.target(arc).unwrap()), Some(to));
    }
}

#[test]
fn test_traxels_carry_consolidated_shape() {
    let (graph, _) = build_graph(2);

    // representatives shrank to the 8x7 refinement
    let node = graph.nodes_at(1)[0];
    let traxel = graph.traxel(node).unwrap();
    assert_eq!(traxel.timestep, 1);
    assert_eq!(traxel.feature("count"), Some(&[56.0][..]));
}

#[test]
fn test_solution_marks_track() {
    let (mut graph, _) = build_graph(3);

    let track: Vec<_> = graph.arcs().collect();
    for &arc in &track {
        graph.set_arc_active(arc, true).unwrap();
        let (source, target) = (graph.source(arc).unwrap(), graph.target(arc).unwrap());
        graph.set_node_active(source, true).unwrap();
        graph.set_node_active(target, true).unwrap();
    }

    assert_eq!(graph.active_arcs(), track);
    assert_eq!(graph.active_nodes().len(), 3);
    assert_eq!(graph.property::<NodeActive>().unwrap().keys_with(&false), Vec::<NodeId>::new());
    assert_eq!(graph.property::<ArcActive>().unwrap().len(), 2);

    // the static object stays out of the solution
    let inactive: Vec<_> = graph.nodes().filter(|n| !graph.is_node_active(*n)).collect();
    assert_eq!(inactive.len(), 1);
    assert_eq!(graph.node_timestep(inactive[0]), Some(0));
}

#[test]
fn test_export_is_reproducible() {
    let (first, _) = build_graph(3);
    let (second, _) = build_graph(3);

    let a = first.export();
    let b = second.export();
    assert_eq!(a.export_hash, b.export_hash);
    assert!(a.verify_hash());
    assert_eq!(a.timesteps, vec![0, 1, 2]);
    assert_eq!(a.nodes.len(), first.property::<NodeTimestep>().unwrap().len());
}

#[test]
fn test_empty_graph_reports_invalid_state() {
    let graph = HypothesesGraph::new();

    let err = graph.earliest_timestep().unwrap_err();
    assert!(matches!(err, GraphError::InvalidState(_)));
    assert!(err.to_string().starts_with("Invalid graph state"));
}
