use connectome::planarity::{is_planar, max_planar_edges};
use connectome::{
    FilterError, FilterPolicy, Graph, RegionLabels, build_graph, filter, filter_graphs,
};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn labels(n: usize) -> RegionLabels {
    (0..n).map(|i| format!("r{i}")).collect::<Vec<_>>().into()
}

/// Symmetric matrix with zero diagonal and weights drawn from (0, 1).
fn random_matrix(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let mut matrix = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let w = rng.gen_range(0.001..1.0);
            matrix[[i, j]] = w;
            matrix[[j, i]] = w;
        }
    }
    matrix
}

fn random_graph(seed: u64, n: usize) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    build_graph(&random_matrix(&mut rng, n), &labels(n)).unwrap()
}

fn keys(graph: &Graph) -> Vec<(usize, usize)> {
    graph.edges().iter().map(|e| e.key()).collect()
}

fn is_subset(small: &Graph, large: &Graph) -> bool {
    small.edges().iter().all(|e| large.edges().contains(e))
}

#[test]
fn density_keeps_floor_of_requested_fraction() {
    for (seed, n) in [(1, 5), (2, 8), (3, 13)] {
        let graph = random_graph(seed, n);
        let pairs = n * (n - 1) / 2;
        for density in [0.0, 0.05, 0.2, 0.37, 0.5, 0.99, 1.0] {
            let filtered = filter(&graph, FilterPolicy::Density, density);
            assert_eq!(
                filtered.edge_count(),
                (density * pairs as f64).floor() as usize,
                "n={n}, density={density}"
            );
            assert!(is_subset(&filtered, &graph));
            assert_eq!(filtered.node_count(), n);
        }
    }
}

#[test]
fn density_sweep_is_nested() {
    let graph = random_graph(7, 11);
    let sweep: Vec<Graph> = [0.1, 0.2, 0.3, 0.5, 0.8, 1.0]
        .iter()
        .map(|&d| filter(&graph, FilterPolicy::Density, d))
        .collect();
    for pair in sweep.windows(2) {
        assert!(pair[0].edge_count() <= pair[1].edge_count());
        assert!(is_subset(&pair[0], &pair[1]));
    }
}

#[test]
fn threshold_keeps_exactly_the_edges_at_or_above() {
    let graph = random_graph(11, 10);
    for threshold in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let filtered = filter(&graph, FilterPolicy::Threshold, threshold);
        let expected: Vec<(usize, usize)> = graph
            .edges()
            .iter()
            .filter(|e| e.weight >= threshold)
            .map(|e| e.key())
            .collect();
        assert_eq!(keys(&filtered), expected);
    }
}

#[test]
fn filtering_is_deterministic() {
    let graph = random_graph(5, 9);
    for policy in FilterPolicy::ALL {
        let first = filter(&graph, policy, 0.3);
        let second = filter(&graph, policy, 0.3);
        assert_eq!(first, second, "{policy}");
    }
}

#[test]
fn pmfg_of_complete_graph_is_maximal_planar() {
    for (seed, n) in [(21, 3), (22, 4), (23, 6), (24, 10), (25, 16)] {
        let graph = random_graph(seed, n);
        let pmfg = filter(&graph, FilterPolicy::Pmfg, 0.0);
        assert_eq!(Some(pmfg.edge_count()), max_planar_edges(n), "n={n}");
        assert!(is_planar(n, &keys(&pmfg)));
        assert!(is_subset(&pmfg, &graph));
    }
}

#[test]
fn pmfg_always_keeps_the_eight_strongest_edges() {
    // Every graph with fewer than nine edges is planar.
    let graph = random_graph(31, 12);
    let mut weights: Vec<f64> = graph.edges().iter().map(|e| e.weight).collect();
    weights.sort_by(|a, b| b.total_cmp(a));
    let pmfg = filter(&graph, FilterPolicy::Pmfg, 0.0);
    for weight in &weights[..8] {
        assert!(pmfg.edges().iter().any(|e| e.weight == *weight));
    }
}

#[test]
fn batch_filtering_matches_one_by_one() {
    let graphs: Vec<Graph> = (0..6).map(|seed| random_graph(seed, 7)).collect();
    for policy in FilterPolicy::ALL {
        let batch = filter_graphs(&graphs, policy, 0.4);
        let single: Vec<Graph> = graphs.iter().map(|g| filter(g, policy, 0.4)).collect();
        assert_eq!(batch, single);
    }
}

#[test]
fn unknown_policy_name_is_rejected() {
    assert_eq!(
        "foo".parse::<FilterPolicy>(),
        Err(FilterError::UnsupportedFilterPolicy("foo".to_string()))
    );
    assert_eq!("pmfg".parse::<FilterPolicy>(), Ok(FilterPolicy::Pmfg));
}

#[test]
fn all_zero_matrix_gives_empty_filtered_graphs() {
    let n = 6;
    let graph = build_graph(&Array2::<f64>::zeros((n, n)), &labels(n)).unwrap();
    assert_eq!(filter(&graph, FilterPolicy::Threshold, 0.1).edge_count(), 0);
    assert_eq!(filter(&graph, FilterPolicy::Density, 0.0).edge_count(), 0);
}
