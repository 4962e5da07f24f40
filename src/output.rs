//! Result files: the cut cost on the first line, then the side code of every cell in id order.

use crate::{Partition, Side};
use anyhow::{ensure, Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub fn serialize_result<W: Write>(writer: &mut W, partition: &Partition) -> Result<()> {
    writeln!(writer, "{}", partition.cost)?;
    for side in partition.assignment.iter() {
        writeln!(writer, "{}", side.code())?;
    }
    Ok(())
}

pub fn parse_result<R: Read>(reader: R) -> Result<Partition> {
    let mut lines = BufReader::new(reader).lines();

    let cost = lines
        .next()
        .context("result is empty")??
        .trim()
        .parse::<u32>()
        .context("could not parse cost")?;

    let mut assignment = vec![];
    for line in lines {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cx = assignment.len();
        let code = line
            .parse::<i32>()
            .with_context(|| format!("could not parse side of cell {cx}"))?;
        let side =
            Side::from_code(code).with_context(|| format!("unknown side {code} for cell {cx}"))?;
        assignment.push(side);
    }
    Ok(Partition { cost, assignment })
}

/// Writes the result to `dir/<benchmark>`, creating `dir` if needed, and returns the path written.
pub fn write_result<P: AsRef<Path>>(
    dir: P,
    benchmark: &str,
    partition: &Partition,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("could not create {}", dir.display()))?;

    let path = dir.join(benchmark);
    let file =
        File::create(&path).with_context(|| format!("could not create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serialize_result(&mut writer, partition)?;
    writer.flush()?;
    Ok(path)
}

pub fn read_result<P: AsRef<Path>>(path: P) -> Result<Partition> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    let partition =
        parse_result(file).with_context(|| format!("could not read result {}", path.display()))?;
    ensure!(
        !partition.assignment.is_empty() || partition.cost == 0,
        "result {} has a cost but no cells",
        path.display()
    );
    Ok(partition)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_serialize_result() {
        let partition = Partition {
            cost: 3,
            assignment: vec![Side::Left, Side::Right, Side::Right],
        };
        let mut buf = vec![];
        serialize_result(&mut buf, &partition).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "3\n0\n1\n1\n");
    }

    #[test]
    fn test_parse_result() {
        let partition = parse_result("2\n1\n0\n\n".as_bytes()).unwrap();
        assert_eq!(partition.cost, 2);
        assert_eq!(partition.assignment, vec![Side::Right, Side::Left]);

        assert!(parse_result("".as_bytes()).is_err());
        assert!(parse_result("x\n".as_bytes()).is_err());
        assert!(parse_result("1\n5\n".as_bytes()).is_err());
    }

    #[test]
    fn test_parse_result_error_names_cell() {
        let err = parse_result("1\n0\n\n\n1\n7\n".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "unknown side 7 for cell 2");

        let err = parse_result("1\n\n0\nL\n".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "could not parse side of cell 1");
    }

    #[test]
    fn test_write_and_read_result() {
        let dir = std::env::temp_dir().join(format!("bnb-partition-output-{}", std::process::id()));
        let partition = Partition {
            cost: 1,
            assignment: vec![Side::Right, Side::Left],
        };

        let path = write_result(&dir, "bench.txt", &partition).unwrap();
        assert_eq!(path, dir.join("bench.txt"));
        assert_eq!(read_result(&path).unwrap(), partition);

        fs::remove_dir_all(&dir).unwrap();
    }
}
