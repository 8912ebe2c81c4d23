//! A weighted variant of
//! [pathfinding's astar function](https://docs.rs/pathfinding/latest/pathfinding/directed/astar/index.html)
//! that works with floating point costs and finalizes nodes once they are
//! expanded, so a node is never expanded twice even when the heuristic is
//! inconsistent.
use fxhash::FxBuildHasher;
use indexmap::map::Entry::{Occupied, Vacant};
use indexmap::IndexMap;
use num_traits::Zero;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

use log::debug;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use std::hash::Hash;

struct SmallestCostHolder<K> {
    estimated_cost: K,
    cost: K,
    index: usize,
}

impl<K: PartialOrd> Eq for SmallestCostHolder<K> {}

impl<K: PartialOrd> PartialEq for SmallestCostHolder<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd> PartialOrd for SmallestCostHolder<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: PartialOrd> Ord for SmallestCostHolder<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // First orders per estimated cost, then prefers the node that already
        // travelled further, which tends to reach the goal sooner on ties.
        match other
            .estimated_cost
            .partial_cmp(&self.estimated_cost)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => self
                .cost
                .partial_cmp(&other.cost)
                .unwrap_or(Ordering::Equal),
            s => s,
        }
    }
}

/// Per node bookkeeping: parent index, best known cost and whether the node
/// has been expanded.
struct Visit<C> {
    parent: usize,
    cost: C,
    closed: bool,
}

fn reverse_path<N, C>(parents: &FxIndexMap<N, Visit<C>>, start: usize) -> Vec<N>
where
    N: Eq + Hash + Clone,
{
    let mut path: Vec<N> = itertools::unfold(start, |i| {
        parents.get_index(*i).map(|(node, visit)| {
            *i = visit.parent;
            node.clone()
        })
    })
    .collect();
    path.reverse();
    path
}

/// Searches from `start` until `success` holds for an expanded node, which it
/// is given together with the cost it was reached at. Returns the node
/// sequence from start to that node together with its cost, or [None] if the
/// frontier runs dry first.
pub fn astar<N, C, FN, IN, FH, FS>(
    start: &N,
    mut successors: FN,
    mut heuristic: FH,
    mut success: FS,
) -> Option<(Vec<N>, C)>
where
    N: Eq + Hash + Clone,
    C: Zero + PartialOrd + Copy,
    FN: FnMut(&N) -> IN,
    IN: IntoIterator<Item = (N, C)>,
    FH: FnMut(&N) -> C,
    FS: FnMut(&N, C) -> bool,
{
    let mut to_see = BinaryHeap::new();
    to_see.push(SmallestCostHolder {
        estimated_cost: Zero::zero(),
        cost: Zero::zero(),
        index: 0,
    });
    let mut parents: FxIndexMap<N, Visit<C>> = FxIndexMap::default();
    parents.insert(
        start.clone(),
        Visit {
            parent: usize::MAX,
            cost: Zero::zero(),
            closed: false,
        },
    );
    while let Some(SmallestCostHolder { cost, index, .. }) = to_see.pop() {
        let successors = {
            let Some((node, visit)) = parents.get_index_mut(index) else {
                continue;
            };
            // A node may sit in the heap several times if a cheaper way to it
            // was found after it was first pushed. Only the first pop counts.
            if visit.closed || cost > visit.cost {
                continue;
            }
            visit.closed = true;
            if success(node, cost) {
                let path = reverse_path(&parents, index);
                return Some((path, cost));
            }
            successors(node)
        };
        for (successor, move_cost) in successors {
            let new_cost = cost + move_cost;
            let h; // heuristic(&successor)
            let n; // index for successor
            match parents.entry(successor) {
                Vacant(e) => {
                    h = heuristic(e.key());
                    n = e.index();
                    e.insert(Visit {
                        parent: index,
                        cost: new_cost,
                        closed: false,
                    });
                }
                Occupied(mut e) => {
                    let visit = e.get_mut();
                    if !visit.closed && visit.cost > new_cost {
                        visit.parent = index;
                        visit.cost = new_cost;
                        h = heuristic(e.key());
                        n = e.index();
                    } else {
                        continue;
                    }
                }
            }

            to_see.push(SmallestCostHolder {
                estimated_cost: new_cost + h,
                cost: new_cost,
                index: n,
            });
        }
    }
    debug!("Search frontier exhausted after visiting {} nodes", parents.len());
    None
}
