use crate::{Circuit, Partition, Side};
use rand::seq::SliceRandom;
use rand::Rng;

/// Returns how many cells go to the left and to the right side of a balanced partition.
/// The left side gets the smaller half when the count is odd.
pub fn split_sizes(cell_count: usize) -> (usize, usize) {
    let left = cell_count / 2;
    (left, cell_count - left)
}

/// Counts the cells on the left and on the right side.
pub fn count_sides(assigned: &[Side]) -> (usize, usize) {
    assigned.iter().fold((0, 0), |(left, right), side| match side {
        Side::Left => (left + 1, right),
        Side::Right => (left, right + 1),
        Side::Unassigned => (left, right),
    })
}

impl Circuit {
    /// Tries one random balanced partition per cell and keeps the cheapest one.
    /// Ties keep the partition found first.
    pub fn partition_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Partition {
        let n = self.cell_count();
        let (left, _) = split_sizes(n);

        let mut best = Partition {
            cost: 0,
            assignment: vec![],
        };
        let mut cids = (0..n).collect::<Vec<_>>();

        for trial in 0..n {
            cids.shuffle(rng);

            let mut assigned = vec![Side::Unassigned; n];
            for (i, &cx) in cids.iter().enumerate() {
                assigned[cx] = if i < left { Side::Left } else { Side::Right };
            }

            let cost = self.total_cut_cost(&assigned);
            log::trace!("random trial: {trial}, cut cost: {cost}");
            if trial == 0 || cost < best.cost {
                best = Partition {
                    cost,
                    assignment: assigned,
                };
            }
        }
        best
    }
}
