//! Parameter sweeps over sizing and cost settings.
//!
//! Every grid point gets its own `Simulation`; nothing mutable is shared, so
//! the parallel path returns exactly what the serial path returns.

use rayon::prelude::*;

use crate::config::BacktestConfig;
use crate::data_loader::LoadedData;
use crate::runner::{run_backtest_from_data, BacktestResult, RunError};

/// Parameter grid over sizing and cost settings.
///
/// Each axis left empty keeps the base config's value.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    /// Sizing parameters (fraction or currency, per the base sizing mode).
    pub sizing_params: Vec<f64>,
    pub commission_rates: Vec<f64>,
    pub slippages: Vec<f64>,
}

impl ParamGrid {
    /// Sizing fractions from 25% to 100% of equity.
    pub fn sizing_default() -> Self {
        Self {
            sizing_params: vec![0.25, 0.5, 0.75, 0.95, 1.0],
            ..Self::default()
        }
    }

    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.sizing_params.len().max(1)
            * self.commission_rates.len().max(1)
            * self.slippages.len().max(1)
    }

    /// Generates all configurations in the grid, in a fixed order.
    pub fn generate_configs(&self, base_config: &BacktestConfig) -> Vec<BacktestConfig> {
        fn axis(values: &[f64], base: f64) -> Vec<f64> {
            if values.is_empty() {
                vec![base]
            } else {
                values.to_vec()
            }
        }

        let params = axis(&self.sizing_params, base_config.sizing.param);
        let rates = axis(&self.commission_rates, base_config.costs.commission_rate);
        let slips = axis(&self.slippages, base_config.costs.slippage);

        let mut configs = Vec::with_capacity(self.size());
        for &param in &params {
            for &rate in &rates {
                for &slippage in &slips {
                    let mut config = base_config.clone();
                    config.sizing.param = param;
                    config.costs.commission_rate = rate;
                    config.costs.slippage = slippage;
                    configs.push(config);
                }
            }
        }
        configs
    }
}

/// Parameter sweep executor.
///
/// Runs backtests for all configurations in a grid, optionally in parallel.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Executes a parameter sweep over the given grid on shared input data.
    ///
    /// Results come back in grid order regardless of scheduling. The first
    /// failing configuration aborts the sweep.
    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base_config: &BacktestConfig,
        data: &LoadedData,
    ) -> Result<SweepResults, RunError> {
        self.sweep_with_progress(grid, base_config, data, |_, _, _| {})
    }

    /// Executes a sweep, invoking the callback after each backtest with
    /// `(index, total, result)`.
    pub fn sweep_with_progress<F>(
        &self,
        grid: &ParamGrid,
        base_config: &BacktestConfig,
        data: &LoadedData,
        progress_callback: F,
    ) -> Result<SweepResults, RunError>
    where
        F: Fn(usize, usize, &BacktestResult) + Send + Sync,
    {
        let configs = grid.generate_configs(base_config);
        for config in &configs {
            config.validate()?;
        }
        let total = configs.len();
        tracing::info!(total, parallel = self.parallel, "starting sweep");

        let run_one = |(idx, config): (usize, &BacktestConfig)| {
            let result = run_backtest_from_data(config, data)?;
            progress_callback(idx, total, &result);
            Ok::<_, RunError>(result)
        };

        let results: Vec<BacktestResult> = if self.parallel {
            configs
                .par_iter()
                .enumerate()
                .map(run_one)
                .collect::<Result<Vec<_>, RunError>>()?
        } else {
            configs
                .iter()
                .enumerate()
                .map(run_one)
                .collect::<Result<Vec<_>, RunError>>()?
        };

        Ok(SweepResults::new(results))
    }
}

/// Results from a parameter sweep.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        Self { results }
    }

    /// Returns all results in grid order.
    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns results sorted by final equity (descending). Ties keep grid order.
    pub fn sorted_by_final_equity(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| b.final_equity.total_cmp(&a.final_equity));
        sorted
    }

    /// Returns the top N results by final equity.
    pub fn top_n(&self, n: usize) -> Vec<&BacktestResult> {
        self.sorted_by_final_equity().into_iter().take(n).collect()
    }
}
