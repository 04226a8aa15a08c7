//! Artifact export: result JSON plus trade and equity CSVs.
//!
//! All persisted JSON carries a `schema_version` field. Unknown (newer)
//! versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ledgerbt_core::domain::{EquityCurveRow, Trade};

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepResults;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade ledger.
///
/// Columns: date, side, price, quantity, equity_at_fill, commission
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "side", "price", "quantity", "equity_at_fill", "commission"])?;

    for t in trades {
        wtr.write_record([
            &t.date.to_string(),
            &t.side.to_string(),
            &format!("{:.6}", t.price),
            &format!("{:.6}", t.quantity),
            &format!("{:.2}", t.equity_at_fill),
            &format!("{:.2}", t.commission),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the equity curve, one row per bar.
pub fn export_equity_csv(equity_curve: &[EquityCurveRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity", "cash", "position_value"])?;
    for row in equity_curve {
        wtr.write_record([
            &row.date.to_string(),
            &format!("{:.2}", row.equity),
            &format!("{:.2}", row.cash),
            &format!("{:.2}", row.position_value),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One summary line per sweep run, in grid order.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "run_id",
        "sizing_mode",
        "sizing_param",
        "commission_rate",
        "slippage",
        "trades",
        "final_equity",
        "total_commission",
        "ruined_at",
    ])?;
    for r in results.all() {
        wtr.write_record([
            &r.run_id,
            &r.config.sizing.mode.to_string(),
            &r.config.sizing.param.to_string(),
            &r.config.costs.commission_rate.to_string(),
            &r.config.costs.slippage.to_string(),
            &r.trades.len().to_string(),
            &format!("{:.2}", r.final_equity),
            &format!("{:.2}", r.total_commission),
            &r.ruined_at.map(|d| d.to_string()).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{symbol}_{run_id prefix}/` under `output_dir` containing:
/// - `result.json` — the full `BacktestResult`
/// - `trades.csv` — trade ledger
/// - `equity.csv` — bar-by-bar equity curve
/// - `config.toml` — the configuration that produced the run
///
/// The directory name is derived from the config hash, so re-running the
/// same config overwrites its own artifacts. Returns the directory path.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{}", result.symbol, prefix));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(run_dir.join("equity.csv"), export_equity_csv(&result.equity_curve)?)?;
    std::fs::write(run_dir.join("config.toml"), result.config.to_toml_string()?)?;

    tracing::debug!(dir = %run_dir.display(), "artifacts written");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's result.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BacktestConfig;
    use crate::data_loader::{bars_from_reader, prepare, SignalInput, SignalRow};
    use crate::runner::run_backtest_from_data;
    use chrono::NaiveDate;
    use ledgerbt_core::domain::OrderSide;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn row(day: u32, equity: f64, cash: f64, position_value: f64) -> EquityCurveRow {
        EquityCurveRow {
            date: d(day),
            equity,
            cash,
            position_value,
        }
    }

    fn sample_result() -> BacktestResult {
        let config = BacktestConfig::new("SPY");
        BacktestResult {
            schema_version: SCHEMA_VERSION,
            run_id: config.run_id(),
            symbol: "SPY".into(),
            config,
            dataset_hash: "abc123".into(),
            start_date: Some(d(1)),
            end_date: Some(d(3)),
            bar_count: 3,
            initial_capital: 10_000.0,
            final_equity: 10_090.0,
            final_position: 95.0,
            total_commission: 9.5,
            total_slippage: 4.75,
            ruined_at: None,
            trades: vec![Trade {
                date: d(2),
                side: OrderSide::Buy,
                price: 100.05,
                quantity: 95.0,
                equity_at_fill: 9_985.5,
                commission: 9.5,
            }],
            equity_curve: vec![
                row(1, 10_000.0, 10_000.0, 0.0),
                row(2, 9_990.0, 485.75, 9_504.25),
                row(3, 10_090.0, 485.75, 9_604.25),
            ],
        }
    }

    /// A result produced by the engine with default costs, so fills carry
    /// slippage-adjusted prices and fractional quantities.
    fn engine_result() -> BacktestResult {
        let config = BacktestConfig::new("SPY");
        let csv = "date,open,close\n\
                   2024-03-01,100.37,101.13\n\
                   2024-03-04,101.29,99.81\n\
                   2024-03-05,99.77,102.41\n\
                   2024-03-06,102.53,103.07\n";
        let bars = bars_from_reader(csv.as_bytes(), "bars").unwrap();
        let rows = bars
            .iter()
            .zip([0.7, 1.0, 0.35, 0.0])
            .map(|(b, signal)| SignalRow {
                date: b.date,
                signal,
                target_size: None,
            })
            .collect();
        let data = prepare(&config, bars, SignalInput::Target(rows)).unwrap();
        run_backtest_from_data(&config, &data).unwrap()
    }

    #[test]
    fn json_roundtrip_is_exact_for_engine_output() {
        let original = engine_result();
        assert!(!original.trades.is_empty());
        assert!(original.trades.iter().any(|t| t.quantity.fract() != 0.0));

        let json = export_json(&original).unwrap();
        let restored = import_json(&json).unwrap();
        assert_eq!(restored, original);
        for (a, b) in restored.trades.iter().zip(&original.trades) {
            assert_eq!(a.quantity.to_bits(), b.quantity.to_bits());
            assert_eq!(a.equity_at_fill.to_bits(), b.equity_at_fill.to_bits());
        }
    }

    #[test]
    fn artifacts_reload_engine_output_exactly() {
        let original = engine_result();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&original, dir.path()).unwrap();
        assert_eq!(load_artifacts(&run_dir).unwrap(), original);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&result).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn json_defaults_missing_version() {
        let json = export_json(&sample_result()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value.as_object_mut().unwrap().remove("schema_version");
        let restored = import_json(&value.to_string()).unwrap();
        assert_eq!(restored.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn csv_trades_content() {
        let csv = export_trades_csv(&sample_result().trades).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,side,price,quantity,equity_at_fill,commission"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-03-02,BUY,100.050000,95.000000,9985.50,9.50"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn csv_empty_trades_has_header_only() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn csv_equity_one_row_per_bar() {
        let csv = export_equity_csv(&sample_result().equity_curve).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "date,equity,cash,position_value");
        assert_eq!(lines[3], "2024-03-03,10090.00,485.75,9604.25");
    }

    #[test]
    fn save_load_artifacts_roundtrip() {
        let result = sample_result();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&result, dir.path()).unwrap();

        assert!(run_dir.join("result.json").exists());
        assert!(run_dir.join("trades.csv").exists());
        assert!(run_dir.join("equity.csv").exists());
        let toml = std::fs::read_to_string(run_dir.join("config.toml")).unwrap();
        assert_eq!(BacktestConfig::from_toml_str(&toml).unwrap(), result.config);
        assert!(run_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("SPY_"));

        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded, result);
    }

    #[test]
    fn load_from_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_artifacts(&dir.path().join("nope")).is_err());
    }
}
