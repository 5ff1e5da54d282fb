//! Kruskal MST-based k-clustering (Zahn's method), used by D10 (§4.4):
//! build the minimum spanning tree over same-day containers, then cut the
//! `k-1` heaviest edges to split it into `k` clusters.

use std::collections::HashMap;

use crate::domain::ids::PointIdx;
use crate::domain::problem::ProblemInstance;

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    /// Returns `true` if the union merged two distinct components.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// Splits `members` into `k` clusters (`k` clamped to `[1, members.len()]`).
/// A single member or `k == 1` returns one cluster containing everything.
pub fn cluster_by_mst(members: &[PointIdx], k: usize, problem: &ProblemInstance) -> Vec<Vec<PointIdx>> {
    let n = members.len();
    if n == 0 {
        return Vec::new();
    }
    let k = k.clamp(1, n);
    if k == 1 || n == 1 {
        return vec![members.to_vec()];
    }

    let mut edges: Vec<(f64, usize, usize)> = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            edges.push((problem.distance(members[i], members[j]), i, j));
        }
    }
    edges.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut uf = UnionFind::new(n);
    let mut mst_edges: Vec<(f64, usize, usize)> = Vec::with_capacity(n - 1);
    for &(w, i, j) in &edges {
        if uf.union(i, j) {
            mst_edges.push((w, i, j));
            if mst_edges.len() == n - 1 {
                break;
            }
        }
    }

    mst_edges.sort_by(|a, b| b.0.total_cmp(&a.0));
    let cuts = k.saturating_sub(1).min(mst_edges.len());
    let cut_set: std::collections::HashSet<(usize, usize)> =
        mst_edges.iter().take(cuts).map(|&(_, i, j)| (i, j)).collect();

    let mut uf2 = UnionFind::new(n);
    for &(_, i, j) in mst_edges.iter().skip(cuts) {
        uf2.union(i, j);
    }
    let _ = &cut_set;

    let mut groups: HashMap<usize, Vec<PointIdx>> = HashMap::new();
    for idx in 0..n {
        let root = uf2.find(idx);
        groups.entry(root).or_default().push(members[idx]);
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testutil::sample_irp_instance;

    #[test]
    fn splits_into_requested_cluster_count_when_enough_members() {
        let problem = sample_irp_instance(6, 1, 10.0);
        let clusters = cluster_by_mst(&problem.containers, 3, &problem);
        assert_eq!(clusters.len(), 3);
        let total: usize = clusters.iter().map(|c| c.len()).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn k_of_one_returns_single_cluster() {
        let problem = sample_irp_instance(4, 1, 10.0);
        let clusters = cluster_by_mst(&problem.containers, 1, &problem);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 4);
    }

    #[test]
    fn single_member_returns_single_cluster() {
        let problem = sample_irp_instance(1, 1, 10.0);
        let clusters = cluster_by_mst(&problem.containers, 5, &problem);
        assert_eq!(clusters.len(), 1);
    }
}
