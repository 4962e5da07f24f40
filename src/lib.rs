// Exact balanced two-way min-cut partitioning of circuits using branch-and-bound.

use anyhow::{bail, ensure, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

mod bisection;
pub mod output;
mod partition_util;

pub use bisection::{Bisection, BisectionPartitioningConfig, SearchStats};
pub use partition_util::{count_sides, split_sizes};

/// The side of the cut a cell has been placed on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Side {
    #[default]
    Unassigned,
    Left,
    Right,
}

impl Side {
    /// Integer code used in result files.
    pub fn code(self) -> i32 {
        match self {
            Side::Unassigned => -1,
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Side::Unassigned),
            0 => Some(Side::Left),
            1 => Some(Side::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub id: u32,
    /// Only used for displaying a result, see [`Circuit::apply_assignment`].
    pub side: Side,
    /// Ids of the nets this cell is a member of. Sorted and free of duplicates.
    pub nets: Vec<u32>,
}

#[derive(Clone, Debug)]
pub struct Net {
    pub id: u32,
    /// Member cells. The first one is the source, the rest are sinks.
    pub cells: Vec<u32>,
    pub color: [u8; 3],
}

impl Net {
    pub fn source(&self) -> u32 {
        self.cells[0]
    }

    pub fn sinks(&self) -> &[u32] {
        &self.cells[1..]
    }

    /// Returns 1 if the net is cut under the given (possibly partial) assignment, otherwise 0.
    /// A net only counts once its source is assigned and some assigned sink sits on the other side.
    pub fn label(&self, assigned: &[Side]) -> u32 {
        let source = assigned[self.source() as usize];
        if source == Side::Unassigned {
            return 0;
        }
        let cut = self.sinks().iter().any(|&s| {
            let sink = assigned[s as usize];
            sink != Side::Unassigned && sink != source
        });
        cut as u32
    }
}

/// A partitioning result: the cut cost and the side of every cell.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Partition {
    pub cost: u32,
    pub assignment: Vec<Side>,
}

#[derive(Clone, Debug, Default)]
pub struct Circuit {
    pub cells: Vec<Cell>,
    pub nets: Vec<Net>,
    /// Name of the benchmark this circuit was loaded from, used to name result files.
    pub benchmark: Option<String>,
}

impl Circuit {
    /// Upper bound on the number of cells, checked before any cell is allocated.
    pub const MAX_CELLS: usize = 1 << 24;

    /// Builds a circuit from net member lists. The first member of every net is its source.
    /// All cells are allocated up front, so `cell_count` may not exceed [`Self::MAX_CELLS`].
    pub fn from_nets(cell_count: usize, nets: Vec<Vec<u32>>) -> Result<Self> {
        ensure!(
            cell_count <= Self::MAX_CELLS,
            "too many cells: {cell_count}, at most {} are supported",
            Self::MAX_CELLS
        );
        let mut circuit = Circuit {
            cells: (0..cell_count as u32)
                .map(|id| Cell {
                    id,
                    side: Side::Unassigned,
                    nets: vec![],
                })
                .collect(),
            nets: Vec::with_capacity(nets.len()),
            benchmark: None,
        };

        for (nx, members) in nets.into_iter().enumerate() {
            ensure!(!members.is_empty(), "net {nx} has no cells");
            for &cx in members.iter() {
                ensure!(
                    (cx as usize) < cell_count,
                    "net {nx} references cell {cx}, but there are only {cell_count} cells"
                );
                let cell_nets = &mut circuit.cells[cx as usize].nets;
                if cell_nets.last() != Some(&(nx as u32)) {
                    cell_nets.push(nx as u32);
                }
            }
            circuit.nets.push(Net {
                id: nx as u32,
                cells: members,
                color: net_color(nx as u32),
            });
        }
        Ok(circuit)
    }

    pub fn deserialize_benchmark<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
        let mut circuit = Self::parse_benchmark(file)
            .with_context(|| format!("could not parse benchmark {}", path.display()))?;
        circuit.benchmark = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(circuit)
    }

    /// Parses a benchmark: a header line `<cells> <nets>` followed by one line per net,
    /// each holding the number of member cells and then the member cell ids.
    pub fn parse_benchmark<R: Read>(reader: R) -> Result<Self> {
        let reader = BufReader::new(reader);

        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(i, l)| l.map(|l| (i + 1, l)))
            .filter(|l| match l {
                Ok((_, line)) => {
                    let line = line.trim();
                    !(line.is_empty() || line.starts_with('#') || line.starts_with('%'))
                }
                Err(_) => true,
            });

        // Parse the header line
        let (_, header) = lines.next().context("could not get header line")??;
        let header_parts = header.split_ascii_whitespace().collect::<Vec<_>>();
        ensure!(header_parts.len() >= 2, "header line needs a cell and a net count");
        let cell_count = header_parts[0]
            .parse::<usize>()
            .context("could not parse cell count")?;
        let net_count = header_parts[1]
            .parse::<usize>()
            .context("could not parse net count")?;

        // Parse the nets
        let mut nets = vec![];
        for line in lines {
            let (line_no, line) = line?;
            if nets.len() == net_count {
                bail!("line {line_no}: more nets than the {net_count} declared");
            }
            let parts = line
                .split_ascii_whitespace()
                .map(|p| p.parse::<u32>())
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("line {line_no}: could not parse net"))?;
            let (&size, members) = parts
                .split_first()
                .with_context(|| format!("line {line_no}: empty net"))?;
            ensure!(
                size as usize == members.len(),
                "line {line_no}: net declares {size} cells but lists {}",
                members.len()
            );
            nets.push(members.to_vec());
        }
        ensure!(
            nets.len() == net_count,
            "expected {net_count} nets, found {}",
            nets.len()
        );

        Self::from_nets(cell_count, nets)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Returns the number of cut nets under the given assignment.
    pub fn total_cut_cost(&self, assigned: &[Side]) -> u32 {
        self.nets.iter().map(|net| net.label(assigned)).sum()
    }

    /// Places `cx` on `side` and returns the change of the total cut cost.
    /// Only nets touching `cx` can change, so only those are evaluated.
    /// The change is never negative when `cx` was unassigned, but moving an
    /// already placed cell may lower the cost.
    pub fn assign_with_delta(&self, assigned: &mut [Side], cx: u32, side: Side) -> i64 {
        let nets = &self.cells[cx as usize].nets;
        let before: u32 = nets
            .iter()
            .map(|&nx| self.nets[nx as usize].label(assigned))
            .sum();
        assigned[cx as usize] = side;
        let after: u32 = nets
            .iter()
            .map(|&nx| self.nets[nx as usize].label(assigned))
            .sum();
        i64::from(after) - i64::from(before)
    }

    /// Copies a result onto the cells so it can be displayed.
    pub fn apply_assignment(&mut self, assigned: &[Side]) -> Result<()> {
        ensure!(
            assigned.len() == self.cells.len(),
            "assignment has {} entries, but the circuit has {} cells",
            assigned.len(),
            self.cells.len()
        );
        for (cell, &side) in self.cells.iter_mut().zip(assigned) {
            cell.side = side;
        }
        Ok(())
    }

    /// Finds a balanced partition with the lowest possible cut cost.
    pub fn run(&self, config: &BisectionPartitioningConfig) -> Partition {
        let mut rng = config.rng();
        self.run_with_rng(&mut rng)
    }

    pub fn run_with_rng<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Partition {
        let initial = self.partition_random(rng);
        log::info!("random partition result = {}", initial.cost);
        let bisection = self.partition_bisection(initial);
        log::info!(
            "branch and bound result = {}, pruned {:.6}%",
            bisection.partition.cost,
            bisection.stats.pruned_rate(self.cell_count()) * 100.0
        );
        bisection.partition
    }
}

/// Spreads net colors around the hue circle so neighbouring ids look different.
fn net_color(nx: u32) -> [u8; 3] {
    let hue = (nx as f32 * 0.618_034).fract() * 6.0;
    let x = 1.0 - (hue % 2.0 - 1.0).abs();
    let (r, g, b) = match hue as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let scale = |c: f32| (55.0 + c * 200.0) as u8;
    [scale(r), scale(g), scale(b)]
}
