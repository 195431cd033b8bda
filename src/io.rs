//! CSV input series and result files

use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Serialize;
use strum::{Display, EnumString};

use crate::config::Config;
use crate::domain::{DispatchTable, Entity, PriceSignal, TimeSeriesInput};

/// Default result file, holding only the grid import column
pub const DEFAULT_OUTPUT_FILE: &str = "Pbought_aggregated.csv";

/// Which columns [`write_table`] emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    /// `Time Step,P_grid`
    #[default]
    GridImport,
    /// Every entity, one row per timestep
    Full,
}

/// Read one numeric column of a CSV file with a header row
pub fn read_column(path: &Path, column: &str) -> Result<Vec<f64>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening CSV: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("reading CSV header of {}", path.display()))?
        .clone();
    let index = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "column {column} not found in {} (available: {})",
                path.display(),
                headers.iter().join(", ")
            )
        })?;

    let mut values = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading CSV record {row}"))?;
        let raw = record
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("row {row} has no {column} field"))?;
        let value: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("parsing {column} in row {row}: {raw:?}"))?;
        values.push(value);
    }
    Ok(values)
}

/// Demand, generation and price series as configured
pub fn load_input(config: &Config) -> Result<TimeSeriesInput> {
    let data = &config.data;
    let demand = read_column(&data.demand_file, &data.demand_column)?;
    let pv = read_column(&data.generation_file, &data.generation_column)?;
    let price = match &config.tariff.price_file {
        Some(path) => PriceSignal::Hourly(read_column(path, &data.price_column)?),
        None => PriceSignal::Flat(config.tariff.price),
    };

    tracing::info!(
        demand_rows = demand.len(),
        generation_rows = pv.len(),
        hourly_price = matches!(price, PriceSignal::Hourly(_)),
        "input series loaded"
    );

    TimeSeriesInput::new(demand, pv, price, config.tariff.feed_in_tariff)
        .context("input series are not a usable year")
}

pub fn write_table(table: &DispatchTable, path: &Path, format: OutputFormat) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;

    match format {
        OutputFormat::GridImport => {
            writer
                .write_record(["Time Step", "P_grid"])
                .context("writing CSV header")?;
            for (t, value) in table.column(Entity::GridImport).iter().enumerate() {
                writer
                    .write_record([t.to_string(), value.to_string()])
                    .context("writing CSV record")?;
            }
        }
        OutputFormat::Full => {
            for row in table.rows() {
                writer.serialize(row).context("writing CSV record")?;
            }
        }
    }

    writer.flush().context("flushing CSV writer")?;
    tracing::info!(path = %path.display(), %format, rows = table.horizon(), "results written");
    Ok(())
}

/// Pretty-printed JSON of any serializable report
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing report")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn table() -> DispatchTable {
        DispatchTable::try_from_fn(3, |entity| match entity {
            Entity::GridImport => vec![0.0, 250.5, 1000.0],
            Entity::Soc => vec![20_000.0, 20_000.0, 19_000.0],
            _ => vec![0.0; 3],
        })
        .unwrap()
    }

    #[test]
    fn test_read_column_by_name() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "HOUR,SUM_DEMAND").unwrap();
        writeln!(file, "0,1200.5").unwrap();
        writeln!(file, "1, 800").unwrap();

        let values = read_column(file.path(), "SUM_DEMAND").unwrap();
        assert_eq!(values, vec![1200.5, 800.0]);
    }

    #[test]
    fn test_read_column_missing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "A,B").unwrap();
        writeln!(file, "1,2").unwrap();

        let error = read_column(file.path(), "PRICE").unwrap_err().to_string();
        assert!(error.contains("available: A, B"), "{error}");
    }

    #[test]
    fn test_read_column_rejects_text() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "PRICE").unwrap();
        writeln!(file, "cheap").unwrap();
        assert!(read_column(file.path(), "PRICE").is_err());
    }

    #[test]
    fn test_grid_import_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_FILE);
        write_table(&table(), &path, OutputFormat::GridImport).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Time Step,P_grid\n0,0\n1,250.5\n2,1000\n");
    }

    #[test]
    fn test_full_output_has_every_entity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("full.csv");
        write_table(&table(), &path, OutputFormat::Full).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("time_step"));
        assert_eq!(headers.len(), 11);
        assert_eq!(reader.records().count(), 3);
        assert_eq!(read_column(&path, "soc").unwrap()[2], 19_000.0);
    }

    #[test]
    fn test_load_input_with_hourly_prices() {
        let dir = tempdir().unwrap();
        let write = |name: &str, header: &str, value: f64| {
            let path = dir.path().join(name);
            let body = std::iter::once(header.to_string())
                .chain((0..crate::domain::HOURS_PER_YEAR).map(|_| value.to_string()))
                .join("\n");
            std::fs::write(&path, body).unwrap();
            path
        };

        let mut config = Config::default();
        config.data.demand_file = write("demand.csv", "SUM_DEMAND", 1000.0);
        config.data.generation_file = write("pvgen.csv", "SUM_GENERATION", 400.0);
        config.tariff.price_file = Some(write("pricesignal.csv", "PRICE", 0.0003));

        let input = load_input(&config).unwrap();
        assert_eq!(input.horizon(), 8760);
        assert_eq!(input.shortfall(10), 600.0);
        assert_eq!(input.price(8759), 0.0003);
    }

    #[test]
    fn test_load_input_rejects_short_year() {
        let dir = tempdir().unwrap();
        let demand = dir.path().join("demand.csv");
        std::fs::write(&demand, "SUM_DEMAND\n1\n2\n").unwrap();
        let pv = dir.path().join("pvgen.csv");
        std::fs::write(&pv, "SUM_GENERATION\n1\n2\n").unwrap();

        let mut config = Config::default();
        config.data.demand_file = demand;
        config.data.generation_file = pv;
        assert!(load_input(&config).is_err());
    }
}
