//! CSV loading and signal preparation for the runner.
//!
//! Turns on-disk inputs into the aligned arrays the engine expects:
//! 1. Read bars (`date,open,high,low,close,volume`)
//! 2. Read either a target signal (`date,signal[,target_size]`) or entry/exit
//!    triggers (`date,entry,exit`), latched into a holding signal
//! 3. Join to the bars by date; any mismatch is fatal
//! 4. Optionally shift the signal one bar forward (T+1 execution)
//! 5. Slice the requested date window
//!
//! The shift happens before windowing, so the first bar of a window still
//! sees the decision taken on the bar before it.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use ledgerbt_core::domain::{validate_bars, Bar};
use ledgerbt_core::error::EngineError;
use ledgerbt_core::latch::{latch_pair, states_to_signal, PositionState, TriggerPair};

use crate::config::{BacktestConfig, SignalSource};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("input alignment error: {0}")]
    Alignment(#[from] EngineError),
    #[error("no bars between {start:?} and {end:?}")]
    EmptyWindow {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

/// Bars and the aligned, shifted, windowed signal for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub signal: Vec<f64>,
    /// Per-bar sizing parameter, when the signal file carries one.
    pub target_sizes: Option<Vec<f64>>,
    /// BLAKE3 over the windowed bars, for provenance.
    pub dataset_hash: String,
}

// ─── Row types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BarRow {
    #[serde(alias = "Date", alias = "DATE", alias = "timestamp")]
    date: NaiveDate,
    #[serde(alias = "Open", alias = "OPEN")]
    open: f64,
    #[serde(default, alias = "High", alias = "HIGH")]
    high: Option<f64>,
    #[serde(default, alias = "Low", alias = "LOW")]
    low: Option<f64>,
    #[serde(alias = "Close", alias = "CLOSE")]
    close: f64,
    #[serde(default, alias = "Volume", alias = "VOLUME")]
    volume: Option<f64>,
}

impl From<BarRow> for Bar {
    fn from(row: BarRow) -> Self {
        let high = row.high.unwrap_or_else(|| row.open.max(row.close));
        let low = row.low.unwrap_or_else(|| row.open.min(row.close));
        Bar::new(row.date, row.open, high, low, row.close, row.volume.unwrap_or(0.0))
    }
}

/// One row of a target-signal file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignalRow {
    #[serde(alias = "Date", alias = "DATE", alias = "timestamp")]
    pub date: NaiveDate,
    #[serde(alias = "Signal", alias = "SIGNAL")]
    pub signal: f64,
    #[serde(default, alias = "Target_Size", alias = "TARGET_SIZE")]
    pub target_size: Option<f64>,
}

/// One row of a trigger file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TriggerRow {
    #[serde(alias = "Date", alias = "DATE", alias = "timestamp")]
    pub date: NaiveDate,
    #[serde(alias = "Entry", alias = "ENTRY", alias = "entries", deserialize_with = "de_flag")]
    pub entry: bool,
    #[serde(alias = "Exit", alias = "EXIT", alias = "exits", deserialize_with = "de_flag")]
    pub exit: bool,
}

/// Accept `true/false`, `1/0`, and `yes/no` in any case.
fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" | "y" => Ok(true),
        "false" | "0" | "0.0" | "no" | "n" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean flag, got '{other}'"
        ))),
    }
}

// ─── Readers ────────────────────────────────────────────────────────

fn read_rows<T, R>(reader: R, label: &str) -> Result<Vec<T>, LoadError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| LoadError::Csv {
            path: label.to_string(),
            source,
        })
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Parse bars from any reader. `label` names the source in errors.
pub fn bars_from_reader<R: Read>(reader: R, label: &str) -> Result<Vec<Bar>, LoadError> {
    let rows: Vec<BarRow> = read_rows(reader, label)?;
    let bars: Vec<Bar> = rows.into_iter().map(Bar::from).collect();
    validate_bars(&bars)?;
    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        tracing::warn!(
            source = label,
            insane,
            "bars with inconsistent OHLC or non-positive prices"
        );
    }
    Ok(bars)
}

pub fn read_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    bars_from_reader(open(path)?, &path.display().to_string())
}

pub fn signals_from_reader<R: Read>(reader: R, label: &str) -> Result<Vec<SignalRow>, LoadError> {
    read_rows(reader, label)
}

pub fn read_signals(path: &Path) -> Result<Vec<SignalRow>, LoadError> {
    signals_from_reader(open(path)?, &path.display().to_string())
}

pub fn triggers_from_reader<R: Read>(reader: R, label: &str) -> Result<TriggerPair, LoadError> {
    let rows: Vec<TriggerRow> = read_rows(reader, label)?;
    let entries: Vec<(NaiveDate, bool)> = rows.iter().map(|r| (r.date, r.entry)).collect();
    let exits: Vec<(NaiveDate, bool)> = rows.iter().map(|r| (r.date, r.exit)).collect();
    Ok(TriggerPair::from_indexed(&entries, &exits)?)
}

pub fn read_triggers(path: &Path) -> Result<TriggerPair, LoadError> {
    triggers_from_reader(open(path)?, &path.display().to_string())
}

// ─── Alignment ──────────────────────────────────────────────────────

/// Require `dates` to match the bar dates one-to-one.
fn check_alignment(
    bars: &[Bar],
    dates: &[NaiveDate],
    what: &'static str,
) -> Result<(), EngineError> {
    if dates.len() != bars.len() {
        return Err(EngineError::ShapeMismatch {
            what,
            expected: bars.len(),
            actual: dates.len(),
        });
    }
    for (index, (bar, &date)) in bars.iter().zip(dates).enumerate() {
        if bar.date != date {
            return Err(EngineError::DateMisalignment {
                index,
                left: bar.date,
                right: date,
            });
        }
    }
    Ok(())
}

/// Join target-signal rows to bars. Returns the signal and, when every row
/// carries one, the per-bar sizing parameter.
pub fn align_signal(
    bars: &[Bar],
    rows: &[SignalRow],
) -> Result<(Vec<f64>, Option<Vec<f64>>), EngineError> {
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    check_alignment(bars, &dates, "signal")?;

    let signal = rows.iter().map(|r| r.signal).collect();
    let sizes: Option<Vec<f64>> = rows.iter().map(|r| r.target_size).collect();
    Ok((signal, sizes))
}

/// Latch trigger columns aligned to bars into a holding signal.
pub fn align_triggers(
    bars: &[Bar],
    triggers: &TriggerPair,
    exposure: f64,
) -> Result<Vec<f64>, EngineError> {
    check_alignment(bars, &triggers.dates, "triggers")?;
    let states = latch_pair(triggers, PositionState::Flat)?;
    Ok(states_to_signal(&states, exposure))
}

/// Move every value one bar forward; the first bar gets `0.0`.
pub fn shift_forward(values: &[f64]) -> Vec<f64> {
    let mut shifted = Vec::with_capacity(values.len());
    if !values.is_empty() {
        shifted.push(0.0);
        shifted.extend_from_slice(&values[..values.len() - 1]);
    }
    shifted
}

/// Slice bars and their parallel columns to `[start, end]` (inclusive).
pub fn apply_window(
    bars: Vec<Bar>,
    signal: Vec<f64>,
    target_sizes: Option<Vec<f64>>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(Vec<Bar>, Vec<f64>, Option<Vec<f64>>), LoadError> {
    // Bars are strictly increasing, so both bounds are binary searches.
    let lo = bars.partition_point(|b| start.map_or(false, |s| b.date < s));
    let hi = bars.partition_point(|b| end.map_or(true, |e| b.date <= e));

    if lo >= hi {
        return Err(LoadError::EmptyWindow { start, end });
    }

    let sizes = target_sizes.map(|s| s[lo..hi].to_vec());
    Ok((bars[lo..hi].to_vec(), signal[lo..hi].to_vec(), sizes))
}

/// BLAKE3 over the bar contents.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            hasher.update(&value.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Assemble run inputs from already-parsed bars and signal source.
pub fn prepare(
    config: &BacktestConfig,
    bars: Vec<Bar>,
    source: SignalInput,
) -> Result<LoadedData, LoadError> {
    let (mut signal, mut sizes) = match source {
        SignalInput::Target(rows) => align_signal(&bars, &rows)?,
        SignalInput::Triggers(pair) => {
            let signal = align_triggers(&bars, &pair, config.signal.exposure)?;
            (signal, None)
        }
    };

    if config.signal.shift {
        signal = shift_forward(&signal);
        sizes = sizes.map(|s| shift_forward(&s));
    }

    let (bars, signal, target_sizes) = apply_window(
        bars,
        signal,
        sizes,
        config.backtest.start_date,
        config.backtest.end_date,
    )?;

    tracing::debug!(
        bars = bars.len(),
        first = %bars[0].date,
        last = %bars[bars.len() - 1].date,
        shifted = config.signal.shift,
        "inputs prepared"
    );

    Ok(LoadedData {
        dataset_hash: dataset_hash(&bars),
        bars,
        signal,
        target_sizes,
    })
}

/// Parsed signal input, before alignment.
#[derive(Debug, Clone)]
pub enum SignalInput {
    Target(Vec<SignalRow>),
    Triggers(TriggerPair),
}

/// Load bars plus the configured signal source from disk.
pub fn load_inputs(
    config: &BacktestConfig,
    bars_path: &Path,
    signal_path: &Path,
) -> Result<LoadedData, LoadError> {
    let bars = read_bars(bars_path)?;
    let source = match config.signal.source {
        SignalSource::Target => SignalInput::Target(read_signals(signal_path)?),
        SignalSource::Triggers => SignalInput::Triggers(read_triggers(signal_path)?),
    };
    prepare(config, bars, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BARS: &str = "\
Date,Open,High,Low,Close,Volume
2024-01-02,100,101,99,100.5,1000
2024-01-03,100.5,102,100,101.5,1200
2024-01-04,101.5,103,101,102.5,900
2024-01-05,102.5,104,102,103.5,1100
";

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bars() -> Vec<Bar> {
        bars_from_reader(BARS.as_bytes(), "bars").unwrap()
    }

    #[test]
    fn bars_parse_with_capitalized_headers() {
        let bars = bars();
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0].date, d(2));
        assert_eq!(bars[3].close, 103.5);
        assert_eq!(bars[1].volume, 1200.0);
    }

    #[test]
    fn missing_high_low_default_to_body() {
        let csv = "date,open,close\n2024-01-02,100,98\n";
        let bars = bars_from_reader(csv.as_bytes(), "bars").unwrap();
        assert_eq!(bars[0].high, 100.0);
        assert_eq!(bars[0].low, 98.0);
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn unsorted_bars_are_rejected() {
        let csv = "date,open,close\n2024-01-03,1,1\n2024-01-02,1,1\n";
        assert!(matches!(
            bars_from_reader(csv.as_bytes(), "bars"),
            Err(LoadError::Alignment(EngineError::NonIncreasingDates { .. }))
        ));
    }

    #[test]
    fn malformed_row_names_the_source() {
        let csv = "date,open,close\nnot-a-date,1,1\n";
        let err = bars_from_reader(csv.as_bytes(), "prices.csv").unwrap_err();
        assert!(err.to_string().contains("prices.csv"));
    }

    #[test]
    fn trigger_flags_accept_numeric_and_words() {
        let csv = "date,entry,exit\n2024-01-02,1,0\n2024-01-03,False,TRUE\n2024-01-04,no,yes\n";
        let pair = triggers_from_reader(csv.as_bytes(), "triggers").unwrap();
        assert_eq!(pair.entries, vec![true, false, false]);
        assert_eq!(pair.exits, vec![false, true, true]);
    }

    #[test]
    fn signal_dates_must_match_bars() {
        let rows: Vec<SignalRow> = [2, 4, 3, 5]
            .into_iter()
            .map(|day| SignalRow {
                date: d(day),
                signal: 1.0,
                target_size: None,
            })
            .collect();
        let err = align_signal(&bars(), &rows).unwrap_err();
        assert_eq!(
            err,
            EngineError::DateMisalignment {
                index: 1,
                left: d(3),
                right: d(4),
            }
        );
        assert!(align_signal(&bars(), &rows[..3]).unwrap_err().is_shape_mismatch());
    }

    #[test]
    fn target_sizes_only_when_every_row_has_one() {
        let mut rows: Vec<SignalRow> = (2..=5)
            .map(|day| SignalRow {
                date: d(day),
                signal: 1.0,
                target_size: Some(0.5),
            })
            .collect();
        let (_, sizes) = align_signal(&bars(), &rows).unwrap();
        assert_eq!(sizes, Some(vec![0.5; 4]));

        rows[2].target_size = None;
        let (_, sizes) = align_signal(&bars(), &rows).unwrap();
        assert_eq!(sizes, None);
    }

    #[test]
    fn shift_forward_delays_by_one_bar() {
        assert_eq!(shift_forward(&[1.0, 0.5, 0.0]), vec![0.0, 1.0, 0.5]);
        assert!(shift_forward(&[]).is_empty());
    }

    #[test]
    fn window_is_inclusive() {
        let signal = vec![0.1, 0.2, 0.3, 0.4];
        let (bars, signal, _) =
            apply_window(bars(), signal, None, Some(d(3)), Some(d(4))).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, d(3));
        assert_eq!(signal, vec![0.2, 0.3]);
    }

    #[test]
    fn open_ended_window() {
        let (from_fourth, _, _) =
            apply_window(bars(), vec![0.0; 4], None, Some(d(4)), None).unwrap();
        assert_eq!(from_fourth.len(), 2);
        let (to_second, _, _) = apply_window(bars(), vec![0.0; 4], None, None, Some(d(2))).unwrap();
        assert_eq!(to_second.len(), 1);
    }

    #[test]
    fn empty_window_is_an_error() {
        let result = apply_window(bars(), vec![0.0; 4], None, Some(d(20)), None);
        assert!(matches!(result, Err(LoadError::EmptyWindow { .. })));
    }

    #[test]
    fn shift_happens_before_window() {
        let mut config = BacktestConfig::new("SPY");
        config.backtest.start_date = Some(d(4));
        let rows: Vec<SignalRow> = (2..=5)
            .map(|day| SignalRow {
                date: d(day),
                signal: if day == 3 { 1.0 } else { 0.0 },
                target_size: None,
            })
            .collect();
        let data = prepare(&config, bars(), SignalInput::Target(rows)).unwrap();
        assert_eq!(data.bars[0].date, d(4));
        // Decision on the 3rd becomes tradable on the 4th.
        assert_eq!(data.signal, vec![1.0, 0.0]);
    }

    #[test]
    fn triggers_are_latched_and_scaled() {
        let csv = "date,entry,exit\n2024-01-02,0,0\n2024-01-03,1,0\n2024-01-04,0,0\n2024-01-05,0,1\n";
        let pair = triggers_from_reader(csv.as_bytes(), "triggers").unwrap();
        let mut config = BacktestConfig::new("SPY");
        config.signal.source = SignalSource::Triggers;
        config.signal.shift = false;
        config.signal.exposure = 0.5;
        let data = prepare(&config, bars(), SignalInput::Triggers(pair)).unwrap();
        assert_eq!(data.signal, vec![0.0, 0.5, 0.5, 0.0]);
        assert!(data.target_sizes.is_none());
    }

    #[test]
    fn dataset_hash_tracks_contents() {
        let a = bars();
        let mut b = bars();
        assert_eq!(dataset_hash(&a), dataset_hash(&b));
        b[2].close += 0.01;
        assert_ne!(dataset_hash(&a), dataset_hash(&b));
    }
}
