//! Host to template linkage, built up one level at a time.
//!
//! Edges point from a host (or template) to its parent templates. Linkage is
//! supposed to be acyclic, but the store is not trusted on that: traversal
//! is bounded by a visited set and cycles are only reported.

use crate::store::{HostId, TemplateLinkRow};
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct TemplateGraph {
    graph: DiGraphMap<HostId, ()>,
}

impl TemplateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_links(&mut self, rows: &[TemplateLinkRow]) {
        for row in rows {
            self.graph.add_edge(row.host_id, row.template_id, ());
        }
    }

    /// Direct parents of a host, ascending.
    pub fn parents(&self, host_id: HostId) -> Vec<HostId> {
        if !self.graph.contains_node(host_id) {
            return Vec::new();
        }
        let mut parents: Vec<_> = self
            .graph
            .neighbors_directed(host_id, Direction::Outgoing)
            .collect();
        parents.sort_unstable();
        parents
    }

    /// The next traversal level: parents of `level` not visited yet, ascending
    /// and unique. Newly returned ids are added to `visited`.
    ///
    /// Returns the level and whether an already visited parent was skipped.
    pub fn next_level(&self, level: &[HostId], visited: &mut HashSet<HostId>) -> (Vec<HostId>, bool) {
        let mut next = Vec::new();
        let mut revisited = false;
        for &host_id in level {
            for parent in self.parents(host_id) {
                if visited.insert(parent) {
                    next.push(parent);
                } else {
                    revisited = true;
                }
            }
        }
        next.sort_unstable();
        (next, revisited)
    }

    /// Groups of hosts that inherit from each other.
    pub fn cycles(&self) -> Vec<Vec<HostId>> {
        if !is_cyclic_directed(&self.graph) {
            return Vec::new();
        }
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|mut scc| {
                scc.sort_unstable();
                scc
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(host_id: HostId, template_id: HostId) -> TemplateLinkRow {
        TemplateLinkRow {
            host_id,
            template_id,
        }
    }

    #[test]
    fn test_levels_skip_visited() {
        let mut graph = TemplateGraph::new();
        // Diamond: 1 -> {3, 2} -> 4
        graph.add_links(&[link(1, 3), link(1, 2), link(2, 4), link(3, 4)]);
        let mut visited: HashSet<_> = [1].into_iter().collect();

        let (level, revisited) = graph.next_level(&[1], &mut visited);
        assert_eq!(level, vec![2, 3]);
        assert!(!revisited);

        let (level, revisited) = graph.next_level(&level, &mut visited);
        assert_eq!(level, vec![4]);
        assert!(revisited);

        let (level, _) = graph.next_level(&level, &mut visited);
        assert!(level.is_empty());
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_cycle_reported() {
        let mut graph = TemplateGraph::new();
        graph.add_links(&[link(10, 20), link(20, 10), link(30, 30)]);
        let mut cycles = graph.cycles();
        cycles.sort();
        assert_eq!(cycles, vec![vec![10, 20], vec![30]]);
    }

    #[test]
    fn test_unknown_host_has_no_parents() {
        assert!(TemplateGraph::new().parents(7).is_empty());
    }
}
