use crate::{split_sizes, Circuit, Partition, Side};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct BisectionPartitioningConfig {
    /// The seed for the random number generator. If `None`, the generator is seeded from system entropy.
    pub rng_seed: Option<u64>,
}

impl Default for BisectionPartitioningConfig {
    fn default() -> Self {
        Self { rng_seed: None }
    }
}

impl BisectionPartitioningConfig {
    pub(crate) fn rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Counters collected while searching, for progress reporting only.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchStats {
    /// Search tree nodes entered, leaves included.
    pub nodes: u64,
    /// Complete assignments reached.
    pub leaves: u64,
    /// How often a cheaper partition replaced the best one.
    pub improvements: u64,
    /// Number of leaves skipped by pruning. Saturates for very large circuits.
    pub pruned: u128,
}

impl SearchStats {
    /// Share of the `2^n` search space that was pruned.
    pub fn pruned_rate(&self, cell_count: usize) -> f64 {
        self.pruned as f64 / 2f64.powi(cell_count as i32)
    }

    fn prune(&mut self, free_cells: usize) {
        let leaves = 1u128.checked_shl(free_cells as u32).unwrap_or(u128::MAX);
        self.pruned = self.pruned.saturating_add(leaves);
    }
}

#[derive(Clone, Debug)]
pub struct Bisection {
    pub partition: Partition,
    pub stats: SearchStats,
}

struct Search<'a> {
    circuit: &'a Circuit,
    best: Partition,
    stats: SearchStats,
}

impl Circuit {
    /// Splits the circuit into two balanced halves while minimizing the cut cost.
    /// `initial` must be a balanced partition and bounds the search from the start;
    /// it is returned unchanged if nothing cheaper exists.
    pub fn partition_bisection(&self, initial: Partition) -> Bisection {
        let n = self.cell_count();
        let (left, right) = split_sizes(n);

        let mut search = Search {
            circuit: self,
            best: initial,
            stats: SearchStats::default(),
        };
        if n > 0 {
            let mut assigned = vec![Side::Unassigned; n];
            search.branch(&mut assigned, 0, 0, left, right);
        }

        Bisection {
            partition: search.best,
            stats: search.stats,
        }
    }
}

impl Search<'_> {
    fn branch(
        &mut self,
        assigned: &mut [Side],
        cx: u32,
        label: i64,
        left_remain: usize,
        right_remain: usize,
    ) {
        self.stats.nodes += 1;

        if left_remain == 0 && right_remain == 0 {
            self.stats.leaves += 1;
            if label < i64::from(self.best.cost) {
                self.best = Partition {
                    cost: label as u32,
                    assignment: assigned.to_vec(),
                };
                self.stats.improvements += 1;
                log::debug!("new best cut cost: {label}");
            }
            log::trace!("reach leaf | label = {label}, best = {}", self.best.cost);
            return;
        }

        if label >= i64::from(self.best.cost) {
            self.stats.prune(left_remain + right_remain);
        } else {
            if left_remain > 0 {
                let delta = self.circuit.assign_with_delta(assigned, cx, Side::Left);
                self.branch(assigned, cx + 1, label + delta, left_remain - 1, right_remain);
                assigned[cx as usize] = Side::Unassigned;
            } else {
                self.stats.prune(right_remain - 1);
            }

            if right_remain > 0 {
                let delta = self.circuit.assign_with_delta(assigned, cx, Side::Right);
                self.branch(assigned, cx + 1, label + delta, left_remain, right_remain - 1);
                assigned[cx as usize] = Side::Unassigned;
            } else {
                self.stats.prune(left_remain - 1);
            }
        }

        log::trace!(
            "pruned: {:.6}% | label = {label}, best = {}",
            self.stats.pruned_rate(assigned.len()) * 100.0,
            self.best.cost
        );
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    use super::*;
    use crate::count_sides;

    fn solve(circuit: &Circuit, seed: u64) -> Bisection {
        let initial = circuit.partition_random(&mut StdRng::seed_from_u64(seed));
        circuit.partition_bisection(initial)
    }

    #[test]
    fn test_single_net_four_cells() {
        let circuit = Circuit::from_nets(4, vec![vec![0, 1, 2, 3]]).unwrap();
        let result = solve(&circuit, 1);
        assert_eq!(result.partition.cost, 1);
        assert_eq!(count_sides(&result.partition.assignment), (2, 2));
    }

    #[test]
    fn test_no_nets() {
        let circuit = Circuit::from_nets(4, vec![]).unwrap();
        let result = solve(&circuit, 1);
        assert_eq!(result.partition.cost, 0);
        assert_eq!(count_sides(&result.partition.assignment), (2, 2));
    }

    #[test]
    fn test_two_cells_forced_cut() {
        let circuit = Circuit::from_nets(2, vec![vec![0, 1]]).unwrap();
        let result = solve(&circuit, 1);
        assert_eq!(result.partition.cost, 1);
        assert_eq!(count_sides(&result.partition.assignment), (1, 1));
    }

    #[test]
    fn test_empty_circuit() {
        let circuit = Circuit::from_nets(0, vec![]).unwrap();
        let result = solve(&circuit, 1);
        assert_eq!(result.partition.cost, 0);
        assert!(result.partition.assignment.is_empty());
        assert_eq!(result.stats, SearchStats::default());
    }

    #[test]
    fn test_single_cell() {
        let circuit = Circuit::from_nets(1, vec![vec![0]]).unwrap();
        let result = solve(&circuit, 1);
        assert_eq!(result.partition.cost, 0);
        assert_eq!(result.partition.assignment, vec![Side::Right]);
    }

    #[test]
    fn test_improves_bad_initial_bound() {
        // Two clusters {0, 1, 2} and {3, 4, 5} joined by a single net.
        let circuit = Circuit::from_nets(
            6,
            vec![vec![0, 1, 2], vec![1, 2], vec![3, 4, 5], vec![4, 5], vec![2, 3]],
        )
        .unwrap();
        use Side::*;
        let assignment = vec![Left, Right, Left, Right, Left, Right];
        let initial = Partition {
            cost: circuit.total_cut_cost(&assignment),
            assignment,
        };
        assert_eq!(initial.cost, 5);

        let result = circuit.partition_bisection(initial);

        assert_eq!(result.partition.cost, 1);
        assert_eq!(
            result.partition.assignment,
            vec![Left, Left, Left, Right, Right, Right]
        );
        assert!(result.stats.improvements > 0);
        assert!(result.stats.pruned > 0);
    }

    #[test]
    fn test_keeps_optimal_initial_bound() {
        let circuit = Circuit::from_nets(4, vec![vec![0, 1], vec![2, 3]]).unwrap();
        use Side::*;
        let initial = Partition {
            cost: 0,
            assignment: vec![Right, Right, Left, Left],
        };

        let result = circuit.partition_bisection(initial.clone());

        assert_eq!(result.partition, initial);
        assert_eq!(result.stats.leaves, 0);
        assert_eq!(result.stats.pruned, 1 << 4);
    }

    #[test]
    fn test_run_with_seed() {
        let circuit = Circuit::from_nets(
            8,
            vec![vec![0, 4], vec![1, 5], vec![2, 6], vec![3, 7], vec![0, 1, 2, 3]],
        )
        .unwrap();
        let config = BisectionPartitioningConfig { rng_seed: Some(42) };

        let a = circuit.run(&config);
        let b = circuit.run(&config);

        assert_eq!(a, b);
        assert_eq!(a.cost, 1);
        assert!(a.assignment.iter().all(|&s| s != Side::Unassigned));
    }
}
