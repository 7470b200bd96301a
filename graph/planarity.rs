//! # Planarity testing
//!
//! A left-right planarity test (Brandes, "The Left-Right Planarity Test") and
//! an incremental builder that keeps a graph planar while edges are offered to
//! it one at a time. The test only answers yes or no; no embedding is built.
//!
//! The test runs in two depth-first passes. The first orients every edge,
//! recording heights, low points and nesting depths. The second walks the
//! oriented graph in nesting-depth order and maintains a stack of conflict
//! pairs of return-edge intervals; the graph is non-planar exactly when two
//! intervals that must lie on the same side conflict.

type EdgeId = usize;

/// Returns `true` if the simple graph on `node_count` nodes with the given
/// edges can be drawn in the plane without crossings. Self-loops and repeated
/// pairs are ignored.
pub fn is_planar(node_count: usize, edges: &[(usize, usize)]) -> bool {
    let mut simple: Vec<(usize, usize)> = edges
        .iter()
        .filter(|(a, b)| a != b)
        .map(|&(a, b)| (a.min(b), a.max(b)))
        .collect();
    simple.sort_unstable();
    simple.dedup();

    if node_count > 2 && simple.len() > 3 * node_count - 6 {
        return false;
    }

    LeftRightTest::new(node_count, &simple).run()
}

/// Maximum number of edges a planar simple graph on `node_count` nodes can
/// have, or `None` below three nodes where the bound does not apply.
pub fn max_planar_edges(node_count: usize) -> Option<usize> {
    (node_count >= 3).then(|| 3 * (node_count - 2))
}

/// Grows a planar graph one edge at a time, refusing any edge that would make
/// it non-planar.
///
/// An edge joining two different connected components can never break
/// planarity, so those are accepted without running the full test.
pub struct PlanarGraphBuilder {
    node_count: usize,
    edges: Vec<(usize, usize)>,
    parent: Vec<usize>,
}

impl PlanarGraphBuilder {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            edges: Vec::new(),
            parent: (0..node_count).collect(),
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Adds the edge `(a, b)` if the graph stays planar. Returns whether the
    /// edge was kept.
    pub fn try_add_edge(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent[root_a] = root_b;
            self.edges.push((a, b));
            return true;
        }

        self.edges.push((a, b));
        if is_planar(self.node_count, &self.edges) {
            true
        } else {
            self.edges.pop();
            false
        }
    }

    fn find(&mut self, node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = node;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Interval {
    low: Option<EdgeId>,
    high: Option<EdgeId>,
}

impl Interval {
    fn single(edge: EdgeId) -> Self {
        Self {
            low: Some(edge),
            high: Some(edge),
        }
    }

    fn is_empty(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }

    fn conflicting(&self, edge: EdgeId, lowpt: &[usize]) -> bool {
        self.high.is_some_and(|high| lowpt[high] > lowpt[edge])
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct ConflictPair {
    left: Interval,
    right: Interval,
}

impl ConflictPair {
    fn swap(&mut self) {
        std::mem::swap(&mut self.left, &mut self.right);
    }

    fn lowest(&self, lowpt: &[usize]) -> Option<usize> {
        let side = |interval: &Interval| {
            if interval.is_empty() {
                None
            } else {
                interval.low.map(|edge| lowpt[edge])
            }
        };
        match (side(&self.left), side(&self.right)) {
            (Some(left), Some(right)) => Some(left.min(right)),
            (left, right) => left.or(right),
        }
    }
}

struct LeftRightTest {
    adjacency: Vec<Vec<(usize, EdgeId)>>,
    tail: Vec<usize>,
    head: Vec<usize>,
    oriented: Vec<bool>,
    height: Vec<Option<usize>>,
    parent_edge: Vec<Option<EdgeId>>,
    lowpt: Vec<usize>,
    lowpt2: Vec<usize>,
    nesting_depth: Vec<usize>,
    ordered_adjacency: Vec<Vec<EdgeId>>,
    stack: Vec<ConflictPair>,
    stack_bottom: Vec<usize>,
    lowpt_edge: Vec<Option<EdgeId>>,
    reference: Vec<Option<EdgeId>>,
}

impl LeftRightTest {
    fn new(node_count: usize, edges: &[(usize, usize)]) -> Self {
        let mut adjacency = vec![Vec::new(); node_count];
        for (id, &(a, b)) in edges.iter().enumerate() {
            adjacency[a].push((b, id));
            adjacency[b].push((a, id));
        }
        let edge_count = edges.len();
        Self {
            adjacency,
            tail: vec![0; edge_count],
            head: vec![0; edge_count],
            oriented: vec![false; edge_count],
            height: vec![None; node_count],
            parent_edge: vec![None; node_count],
            lowpt: vec![0; edge_count],
            lowpt2: vec![0; edge_count],
            nesting_depth: vec![0; edge_count],
            ordered_adjacency: vec![Vec::new(); node_count],
            stack: Vec::new(),
            stack_bottom: vec![0; edge_count],
            lowpt_edge: vec![None; edge_count],
            reference: vec![None; edge_count],
        }
    }

    fn run(mut self) -> bool {
        let mut roots = Vec::new();
        for node in 0..self.adjacency.len() {
            if self.height[node].is_none() {
                self.height[node] = Some(0);
                roots.push(node);
                self.orient(node, 0);
            }
        }

        let depths = &self.nesting_depth;
        for outgoing in &mut self.ordered_adjacency {
            outgoing.sort_by_key(|&edge| depths[edge]);
        }

        roots.into_iter().all(|root| self.test(root))
    }

    // Phase one: orientation, heights, low points and nesting depths.
    fn orient(&mut self, v: usize, height_v: usize) {
        let parent = self.parent_edge[v];
        for index in 0..self.adjacency[v].len() {
            let (w, edge) = self.adjacency[v][index];
            if self.oriented[edge] {
                continue;
            }
            self.oriented[edge] = true;
            self.tail[edge] = v;
            self.head[edge] = w;
            self.ordered_adjacency[v].push(edge);
            self.lowpt[edge] = height_v;
            self.lowpt2[edge] = height_v;

            match self.height[w] {
                None => {
                    self.parent_edge[w] = Some(edge);
                    self.height[w] = Some(height_v + 1);
                    self.orient(w, height_v + 1);
                }
                Some(height_w) => self.lowpt[edge] = height_w,
            }

            self.nesting_depth[edge] =
                2 * self.lowpt[edge] + usize::from(self.lowpt2[edge] < height_v);

            if let Some(parent) = parent {
                let (low, low2) = (self.lowpt[edge], self.lowpt2[edge]);
                if low < self.lowpt[parent] {
                    self.lowpt2[parent] = self.lowpt[parent].min(low2);
                    self.lowpt[parent] = low;
                } else if low > self.lowpt[parent] {
                    self.lowpt2[parent] = self.lowpt2[parent].min(low);
                } else {
                    self.lowpt2[parent] = self.lowpt2[parent].min(low2);
                }
            }
        }
    }

    // Phase two: constraint integration over the conflict-pair stack.
    fn test(&mut self, v: usize) -> bool {
        let parent = self.parent_edge[v];
        let height_v = self.height[v].unwrap_or_default();
        let outgoing = std::mem::take(&mut self.ordered_adjacency[v]);

        for (index, &edge) in outgoing.iter().enumerate() {
            let w = self.head[edge];
            self.stack_bottom[edge] = self.stack.len();

            if self.parent_edge[w] == Some(edge) {
                if !self.test(w) {
                    return false;
                }
            } else {
                self.lowpt_edge[edge] = Some(edge);
                self.stack.push(ConflictPair {
                    left: Interval::default(),
                    right: Interval::single(edge),
                });
            }

            if self.lowpt[edge] < height_v {
                let Some(parent) = parent else {
                    continue;
                };
                if index == 0 {
                    self.lowpt_edge[parent] = self.lowpt_edge[edge];
                } else if !self.add_constraints(edge, parent) {
                    return false;
                }
            }
        }

        if let Some(parent) = parent {
            self.remove_back_edges(parent);
        }
        true
    }

    fn add_constraints(&mut self, edge: EdgeId, parent: EdgeId) -> bool {
        let mut merged = ConflictPair::default();

        // Return edges of `edge` all go to the right side of `merged`.
        loop {
            let Some(mut pair) = self.stack.pop() else {
                return false;
            };
            if !pair.left.is_empty() {
                pair.swap();
            }
            if !pair.left.is_empty() {
                return false;
            }
            let Some(pair_low) = pair.right.low else {
                return false;
            };

            if self.lowpt[pair_low] > self.lowpt[parent] {
                if merged.right.is_empty() {
                    merged.right = pair.right;
                } else if let Some(merged_low) = merged.right.low {
                    self.reference[merged_low] = pair.right.high;
                }
                merged.right.low = pair.right.low;
            } else {
                self.reference[pair_low] = self.lowpt_edge[parent];
            }

            if self.stack.len() == self.stack_bottom[edge] {
                break;
            }
        }

        // Earlier siblings that conflict with `edge` go to the left side.
        while self.stack.last().is_some_and(|top| {
            top.left.conflicting(edge, &self.lowpt) || top.right.conflicting(edge, &self.lowpt)
        }) {
            let Some(mut pair) = self.stack.pop() else {
                break;
            };
            if pair.right.conflicting(edge, &self.lowpt) {
                pair.swap();
            }
            if pair.right.conflicting(edge, &self.lowpt) {
                return false;
            }

            if let Some(merged_low) = merged.right.low {
                self.reference[merged_low] = pair.right.high;
            }
            if pair.right.low.is_some() {
                merged.right.low = pair.right.low;
            }

            if merged.left.is_empty() {
                merged.left = pair.left;
            } else if let Some(merged_low) = merged.left.low {
                self.reference[merged_low] = pair.left.high;
            }
            merged.left.low = pair.left.low;
        }

        if !(merged.left.is_empty() && merged.right.is_empty()) {
            self.stack.push(merged);
        }
        true
    }

    fn remove_back_edges(&mut self, parent: EdgeId) {
        let u = self.tail[parent];
        let height_u = self.height[u].unwrap_or_default();

        while self
            .stack
            .last()
            .is_some_and(|top| top.lowest(&self.lowpt) == Some(height_u))
        {
            self.stack.pop();
        }

        if let Some(mut pair) = self.stack.pop() {
            while let Some(high) = pair.left.high {
                if self.head[high] != u {
                    break;
                }
                pair.left.high = self.reference[high];
            }
            if pair.left.high.is_none() {
                if let Some(low) = pair.left.low.take() {
                    self.reference[low] = pair.right.low;
                }
            }

            while let Some(high) = pair.right.high {
                if self.head[high] != u {
                    break;
                }
                pair.right.high = self.reference[high];
            }
            if pair.right.high.is_none() {
                if let Some(low) = pair.right.low.take() {
                    self.reference[low] = pair.left.low;
                }
            }

            self.stack.push(pair);
        }

        if self.lowpt[parent] < height_u {
            if let Some(top) = self.stack.last() {
                let (left_high, right_high) = (top.left.high, top.right.high);
                self.reference[parent] = match (left_high, right_high) {
                    (Some(left), Some(right)) if self.lowpt[left] > self.lowpt[right] => {
                        Some(left)
                    }
                    (Some(left), None) => Some(left),
                    _ => right_high,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(n: usize) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for a in 0..n {
            for b in (a + 1)..n {
                edges.push((a, b));
            }
        }
        edges
    }

    fn complete_bipartite_3_3() -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for a in 0..3 {
            for b in 3..6 {
                edges.push((a, b));
            }
        }
        edges
    }

    #[test]
    fn small_complete_graphs_are_planar() {
        for n in 0..=4 {
            assert!(is_planar(n, &complete(n)), "K{n} should be planar");
        }
    }

    #[test]
    fn k5_is_not_planar() {
        assert!(!is_planar(5, &complete(5)));
        let mut minus_one = complete(5);
        minus_one.pop();
        assert!(is_planar(5, &minus_one));
    }

    #[test]
    fn k33_is_not_planar_but_its_subgraphs_are() {
        let edges = complete_bipartite_3_3();
        assert!(!is_planar(6, &edges));
        for skip in 0..edges.len() {
            let subgraph: Vec<_> = edges
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != skip)
                .map(|(_, &edge)| edge)
                .collect();
            assert!(is_planar(6, &subgraph), "K3,3 minus edge {skip}");
        }
    }

    #[test]
    fn petersen_graph_is_not_planar() {
        let edges = vec![
            (0, 1),
            (1, 2),
            (2, 3),
            (3, 4),
            (4, 0),
            (0, 5),
            (1, 6),
            (2, 7),
            (3, 8),
            (4, 9),
            (5, 7),
            (7, 9),
            (9, 6),
            (6, 8),
            (8, 5),
        ];
        assert!(!is_planar(10, &edges));
    }

    #[test]
    fn subdivided_k5_is_not_planar() {
        // K5 with the edge (0, 1) replaced by the path 0-5-1.
        let mut edges: Vec<_> = complete(5).into_iter().filter(|&e| e != (0, 1)).collect();
        edges.push((0, 5));
        edges.push((5, 1));
        assert!(!is_planar(6, &edges));
    }

    #[test]
    fn grid_and_wheel_are_planar() {
        let mut grid = Vec::new();
        for row in 0..4 {
            for col in 0..4 {
                let node = row * 4 + col;
                if col < 3 {
                    grid.push((node, node + 1));
                }
                if row < 3 {
                    grid.push((node, node + 4));
                }
            }
        }
        assert!(is_planar(16, &grid));

        let mut wheel: Vec<_> = (1..8).map(|i| (0, i)).collect();
        wheel.extend((1..8).map(|i| (i, i % 7 + 1)));
        assert!(is_planar(8, &wheel));
    }

    #[test]
    fn loops_and_duplicates_are_ignored() {
        let edges = vec![(0, 0), (0, 1), (1, 0), (1, 2), (2, 0)];
        assert!(is_planar(3, &edges));
    }

    #[test]
    fn disconnected_non_planar_component_is_detected() {
        let mut edges: Vec<_> = complete_bipartite_3_3()
            .into_iter()
            .map(|(a, b)| (a + 4, b + 4))
            .collect();
        edges.extend(complete(4));
        assert!(!is_planar(10, &edges));
    }

    #[test]
    fn builder_rejects_the_edge_that_breaks_planarity() {
        let mut builder = PlanarGraphBuilder::new(5);
        let mut kept = 0;
        for (a, b) in complete(5) {
            if builder.try_add_edge(a, b) {
                kept += 1;
            }
        }
        assert_eq!(kept, 9);
        assert_eq!(builder.edge_count(), 9);
        assert_eq!(max_planar_edges(5), Some(9));
    }

    #[test]
    fn planar_bound_needs_three_nodes() {
        assert_eq!(max_planar_edges(2), None);
        assert_eq!(max_planar_edges(3), Some(3));
        assert_eq!(max_planar_edges(264), Some(786));
    }
}
