//! Writing and reading the attribution tables
//!
//! Both tables are CSV files in the output directory. Each table is written to
//! a temporary file first and only renamed into place once both have been
//! written. If moving the pair into place fails, the previous absolute table is
//! restored, so the directory never holds tables from two different runs.

use crate::errors::{AdapterError, AdapterResult};
use rsca_core::attribution::{AbsoluteContribution, AttributionTable, SourceShare};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ABSOLUTE_TABLE_FILE: &str = "co2_abs_contrib_timeseries.csv";
pub const SHARE_TABLE_FILE: &str = "co2_share_timeseries.csv";

/// Locations of the written tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub absolute: PathBuf,
    pub shares: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(out_dir: impl AsRef<Path>) -> Self {
        let out_dir = out_dir.as_ref();
        Self {
            absolute: out_dir.join(ABSOLUTE_TABLE_FILE),
            shares: out_dir.join(SHARE_TABLE_FILE),
        }
    }
}

/// Write both tables into `out_dir`, creating it if needed
pub fn write_attribution_tables(
    table: &AttributionTable,
    out_dir: impl AsRef<Path>,
) -> AdapterResult<OutputPaths> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir).map_err(AdapterError::io(out_dir))?;

    let paths = OutputPaths::in_dir(out_dir);
    let absolute_tmp = with_suffix(&paths.absolute, "partial");
    let shares_tmp = with_suffix(&paths.shares, "partial");

    let written = write_rows(&absolute_tmp, table.absolute_rows())
        .and_then(|_| write_rows(&shares_tmp, table.share_rows()))
        .and_then(|_| commit_pair(&absolute_tmp, &paths.absolute, &shares_tmp, &paths.shares));
    if let Err(e) = written {
        // Cleanup is best effort
        let _ = fs::remove_file(&absolute_tmp);
        let _ = fs::remove_file(&shares_tmp);
        return Err(e);
    }

    info!(
        absolute = %paths.absolute.display(),
        shares = %paths.shares.display(),
        rows = table.years().len(),
        "Wrote attribution tables"
    );
    Ok(paths)
}

pub fn read_absolute_table(path: impl AsRef<Path>) -> AdapterResult<Vec<AbsoluteContribution>> {
    read_rows(path.as_ref())
}

pub fn read_share_table(path: impl AsRef<Path>) -> AdapterResult<Vec<SourceShare>> {
    read_rows(path.as_ref())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Move both written tables into place as a unit.
///
/// The existing absolute table is set aside first. If either move fails it is
/// put back, or the new absolute table is removed when there was none.
fn commit_pair(
    absolute_tmp: &Path,
    absolute: &Path,
    shares_tmp: &Path,
    shares: &Path,
) -> AdapterResult<()> {
    let previous = with_suffix(absolute, "previous");
    let had_previous = absolute.exists();
    if had_previous {
        fs::rename(absolute, &previous).map_err(AdapterError::io(absolute))?;
    }

    let moved = fs::rename(absolute_tmp, absolute)
        .map_err(AdapterError::io(absolute))
        .and_then(|_| fs::rename(shares_tmp, shares).map_err(AdapterError::io(shares)));

    match moved {
        Ok(()) => {
            if had_previous {
                let _ = fs::remove_file(&previous);
            }
            Ok(())
        }
        Err(e) => {
            if had_previous {
                let _ = fs::rename(&previous, absolute);
            } else {
                let _ = fs::remove_file(absolute);
            }
            Err(e)
        }
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> AdapterResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(AdapterError::csv(path))?;
    for row in rows {
        writer.serialize(row).map_err(AdapterError::csv(path))?;
    }
    writer.flush().map_err(AdapterError::io(path))?;
    Ok(())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> AdapterResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(AdapterError::csv(path))?;
    reader
        .deserialize::<T>()
        .map(|row| row.map_err(AdapterError::csv(path)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use rsca_core::attribution::{attribute, EmissionsInput};
    use rsca_core::parameters::ModelParameters;
    use rsca_core::timeseries::YearAxis;

    fn table() -> AttributionTable {
        let years = YearAxis::from_bounds(1850, 1900).unwrap();
        let n = years.len();
        let inputs = EmissionsInput::new(
            years,
            Array1::linspace(0.1, 1.0, n),
            Array1::linspace(0.5, 0.7, n),
        )
        .unwrap();
        attribute(&inputs, &ModelParameters::default()).unwrap()
    }

    #[test]
    fn writes_both_tables_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested").join("out");
        let paths = write_attribution_tables(&table(), &out_dir).unwrap();

        assert_eq!(paths, OutputPaths::in_dir(&out_dir));
        let absolute = fs::read_to_string(&paths.absolute).unwrap();
        assert!(absolute.starts_with("year,RF_total_Wm2,RF_FF_abs_Wm2,RF_ELUC_abs_Wm2\n"));
        assert_eq!(absolute.lines().count(), 52);

        let shares = fs::read_to_string(&paths.shares).unwrap();
        assert!(shares.starts_with("year,FF_share,ELUC_share\n"));

        let leftovers: Vec<_> = fs::read_dir(&out_dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn tables_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let table = table();
        let paths = write_attribution_tables(&table, dir.path()).unwrap();

        let absolute = read_absolute_table(&paths.absolute).unwrap();
        assert_eq!(absolute.len(), table.years().len());
        assert_eq!(absolute[0].year, 1850);
        assert_eq!(absolute[50].year, 1900);
        assert_relative_eq!(absolute[50].rf_fossil, table.rf_fossil()[50]);

        let shares = read_share_table(&paths.shares).unwrap();
        assert_relative_eq!(shares[50].fossil + shares[50].land_use, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn failed_commit_keeps_previous_pair() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::in_dir(dir.path());
        fs::write(&paths.absolute, "previous run\n").unwrap();
        // A directory in place of the share table makes the second move fail
        fs::create_dir(&paths.shares).unwrap();
        fs::write(paths.shares.join("keep"), "").unwrap();

        let result = write_attribution_tables(&table(), dir.path());
        assert!(matches!(result, Err(AdapterError::Io { .. })));
        assert_eq!(fs::read_to_string(&paths.absolute).unwrap(), "previous run\n");

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {:?}", names);
    }

    #[test]
    fn failed_commit_without_previous_tables() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::in_dir(dir.path());
        fs::create_dir(&paths.shares).unwrap();
        fs::write(paths.shares.join("keep"), "").unwrap();

        assert!(write_attribution_tables(&table(), dir.path()).is_err());
        assert!(!paths.absolute.exists());
    }

    #[test]
    fn overwrites_previous_tables() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::in_dir(dir.path());
        fs::write(&paths.absolute, "previous run\n").unwrap();
        fs::write(&paths.shares, "previous run\n").unwrap();

        write_attribution_tables(&table(), dir.path()).unwrap();
        assert_eq!(read_absolute_table(&paths.absolute).unwrap().len(), 51);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn reading_a_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_share_table(dir.path().join(SHARE_TABLE_FILE));
        assert!(matches!(result, Err(AdapterError::Csv { .. })));
    }

    #[test]
    fn reading_the_wrong_table() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_attribution_tables(&table(), dir.path()).unwrap();
        assert!(read_absolute_table(&paths.shares).is_err());
    }
}
