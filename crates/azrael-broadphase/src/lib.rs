//! Broad-phase partitioning: sweep-and-prune over cached AABBs, producing
//! disjoint collision islands. Two ids land in the same island iff their
//! boxes are connected through a chain of pairwise overlaps.

mod union_find;


use azrael_types::aabb::Aabb;
use azrael_types::ObjectId;
use smallvec::SmallVec;
use union_find::UnionFind;

/// Picks the sweep axis: largest variance of box centres, ties broken by the
/// lower axis index.
fn sweep_axis(aabbs: &[(ObjectId, Aabb)]) -> usize {
    let n = aabbs.len() as f32;
    let mut mean = [0.0f32; 3];
    for (_, aabb) in aabbs {
        let c = aabb.center();
        for axis in 0..3 {
            mean[axis] += c[axis];
        }
    }
    for m in &mut mean {
        *m /= n;
    }

    let mut variance = [0.0f32; 3];
    for (_, aabb) in aabbs {
        let c = aabb.center();
        for axis in 0..3 {
            let d = c[axis] - mean[axis];
            variance[axis] += d * d;
        }
    }

    let mut best = 0;
    for axis in 1..3 {
        if variance[axis] > variance[best] {
            best = axis;
        }
    }
    best
}

/// Partitions the ids into collision islands.
///
/// Sweeps the highest-variance axis with an open set of live intervals; every
/// start event confirms candidates on the other two axes with a closed
/// interval test and merges via union-find. O((N + K) log N) for K
/// overlapping pairs.
pub fn islands(aabbs: &[(ObjectId, Aabb)]) -> Vec<Vec<ObjectId>> {
    if aabbs.is_empty() {
        return Vec::new();
    }

    let axis = sweep_axis(aabbs);

    // (coordinate, is_end, index). Starts sort before ends at the same
    // coordinate, so boxes touching on a face count as overlapping.
    let mut events: Vec<(f32, bool, usize)> = Vec::with_capacity(aabbs.len() * 2);
    for (idx, (_, aabb)) in aabbs.iter().enumerate() {
        events.push((aabb.min[axis], false, idx));
        events.push((aabb.max[axis], true, idx));
    }
    events.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut uf = UnionFind::new(aabbs.len());
    let mut open: SmallVec<[usize; 32]> = SmallVec::new();
    for (_, is_end, idx) in events {
        if is_end {
            if let Some(pos) = open.iter().position(|&o| o == idx) {
                open.swap_remove(pos);
            }
            continue;
        }
        for &other in &open {
            if aabbs[idx].1.overlaps(&aabbs[other].1) {
                uf.union(idx, other);
            }
        }
        open.push(idx);
    }

    // Deterministic output: members sorted within an island, islands sorted
    // by their smallest member.
    let mut by_root: std::collections::HashMap<usize, Vec<ObjectId>> =
        std::collections::HashMap::new();
    for (idx, (id, _)) in aabbs.iter().enumerate() {
        by_root.entry(uf.find(idx)).or_default().push(*id);
    }
    let mut out: Vec<Vec<ObjectId>> = by_root.into_values().collect();
    for island in &mut out {
        island.sort_unstable();
    }
    out.sort_by_key(|island| island[0]);
    out
}
