use std::collections::HashMap;

use petgraph::unionfind::UnionFind;

use crate::network::Network;

/// Merges buses joined by closed switches.
///
/// Returns, for each bus, the index of its electrical node and the number of
/// nodes. Nodes are numbered in order of first appearance.
pub(crate) fn electrical_nodes(network: &Network) -> (Vec<usize>, usize) {
    let nb = network.buses.len();
    let mut uf = UnionFind::<usize>::new(nb);
    for sw in network.switches.iter().filter(|sw| !sw.open) {
        uf.union(sw.bus1, sw.bus2);
    }
    relabel(&uf.into_labeling())
}

/// Computes the connected component number of every bus.
///
/// Buses are joined through closed switches and through branches closed at
/// both ends. Components are numbered by decreasing size, ties going to the
/// component holding the earliest bus, so the largest one is number 0.
pub(crate) fn components(network: &Network) -> Vec<usize> {
    let nb = network.buses.len();
    let mut uf = UnionFind::<usize>::new(nb);
    for sw in network.switches.iter().filter(|sw| !sw.open) {
        uf.union(sw.bus1, sw.bus2);
    }
    for br in network.branches.iter().filter(|br| br.is_connected()) {
        uf.union(br.bus1, br.bus2);
    }
    let (labels, n) = relabel(&uf.into_labeling());

    let mut size = vec![0usize; n];
    for &l in &labels {
        size[l] += 1;
    }
    // labels are already in order of first bus, so a stable sort on size
    // keeps the tie-break
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| size[*b].cmp(&size[*a]));

    let mut num = vec![0; n];
    for (k, &l) in order.iter().enumerate() {
        num[l] = k;
    }
    labels.iter().map(|&l| num[l]).collect()
}

fn relabel(roots: &[usize]) -> (Vec<usize>, usize) {
    let mut seen: HashMap<usize, usize> = HashMap::new();
    let labels = roots
        .iter()
        .map(|r| {
            let next = seen.len();
            *seen.entry(*r).or_insert(next)
        })
        .collect();
    (labels, seen.len())
}
