//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use weightbook::{FeeModel, Symbol, TargetAllocation};

use crate::error::{Error, Result};
use crate::settle::Settlement;
use crate::target::TargetSpec;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub broker: BrokerConfig,
    pub strategy: StrategyConfig,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub kind: BrokerKind,
    /// JSON market file for the paper broker.
    pub market_file: PathBuf,
    #[serde(default = "default_quote_asset")]
    pub quote_asset: Symbol,
    #[serde(default)]
    pub fill: PaperFill,
    /// Status polls before a delayed paper order fills.
    #[serde(default = "default_fill_after_polls")]
    pub fill_after_polls: u32,
}

fn default_quote_asset() -> Symbol {
    Symbol::new("USD")
}
fn default_fill_after_polls() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    /// Simulated account loaded from a market file.
    Paper,
}

/// How the paper broker fills orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperFill {
    #[default]
    Immediate,
    /// Orders fill after `fill_after_polls` status polls.
    Delayed,
}

/// Which strategy drives the rebalancer, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    FixedWeight(FixedWeightConfig),
    Momentum(MomentumConfig),
    Crossover(CrossoverConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixedWeightConfig {
    #[serde(default = "default_fixed_name")]
    pub name: String,
    /// Inline weights. Exactly one of `portfolio` and `target_file` is set.
    #[serde(default)]
    pub portfolio: Vec<TargetAllocation>,
    pub target_file: Option<PathBuf>,
    /// Quote asset the symbols are priced and traded in.
    pub quote: Option<Symbol>,
}

fn default_fixed_name() -> String {
    "Custom ETF".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MomentumConfig {
    #[serde(default = "default_momentum_name")]
    pub name: String,
    /// Candidate universe. Duplicates are evaluated once.
    pub symbols: Vec<Symbol>,
    #[serde(default = "default_number_of_symbols")]
    pub number_of_symbols: usize,
    /// Trailing window in calendar days.
    #[serde(default = "default_analysis_period")]
    pub analysis_period: u32,
    /// Deadband as a fraction of portfolio value.
    pub rebalance_threshold: Option<f64>,
    #[serde(default = "default_min_price")]
    pub min_price: f64,
}

fn default_momentum_name() -> String {
    "Top Momentum".into()
}
fn default_number_of_symbols() -> usize {
    5
}
fn default_analysis_period() -> u32 {
    1500
}
fn default_min_price() -> f64 {
    weightbook::momentum::DEFAULT_MIN_PRICE
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrossoverConfig {
    #[serde(default = "default_crossover_name")]
    pub name: String,
    pub symbol: Symbol,
    /// Moving-average window in bars.
    #[serde(default = "default_window")]
    pub window: usize,
    /// Absolute price band around the average.
    #[serde(default = "default_band")]
    pub band: f64,
    /// Quantity bought on an upward cross.
    pub quantity: f64,
    #[serde(default)]
    pub bars: BarSize,
}

fn default_crossover_name() -> String {
    "MA Crossover".into()
}
fn default_window() -> usize {
    5
}
fn default_band() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarSize {
    Minute,
    #[default]
    Day,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Ticks per rebalance.
    pub rebalance_period: u32,
}

fn default_tick_interval() -> u64 {
    86_400
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub settlement: SettlementMode,
    /// Fixed wait after a sell phase.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_fill_timeout")]
    pub fill_timeout_secs: u64,
    /// Check each buy against free cash after the sells settled.
    #[serde(default = "default_true")]
    pub check_cash: bool,
    #[serde(default = "default_max_orders")]
    pub max_orders_per_run: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    #[default]
    FixedDelay,
    AwaitFills,
}

fn default_settle_delay() -> u64 {
    5
}
fn default_poll_interval() -> u64 {
    500
}
fn default_fill_timeout() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_max_orders() -> usize {
    50
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            settlement: SettlementMode::default(),
            settle_delay_secs: default_settle_delay(),
            poll_interval_ms: default_poll_interval(),
            fill_timeout_secs: default_fill_timeout(),
            check_cash: true,
            max_orders_per_run: default_max_orders(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CostConfig {
    #[serde(default = "default_percent_fee")]
    pub percent_fee: f64,
    #[serde(default)]
    pub min_fee: f64,
}

fn default_percent_fee() -> f64 {
    0.001
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            percent_fee: default_percent_fee(),
            min_fee: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// Relative `market_file` and `target_file` paths are resolved against
    /// the config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::from_toml(&contents)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.broker.market_file.is_relative() {
            self.broker.market_file = base.join(&self.broker.market_file);
        }
        if let StrategyConfig::FixedWeight(fixed) = &mut self.strategy {
            if let Some(file) = fixed.target_file.as_mut().filter(|f| f.is_relative()) {
                *file = base.join(&*file);
            }
        }
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.schedule.rebalance_period == 0 {
            return Err(Error::Config("rebalance_period must be >= 1".into()));
        }
        if self.execution.settlement == SettlementMode::AwaitFills
            && self.execution.poll_interval_ms == 0
        {
            return Err(Error::Config(
                "poll_interval_ms must be > 0 when awaiting fills".into(),
            ));
        }
        if self.execution.max_orders_per_run == 0 {
            return Err(Error::Config("max_orders_per_run must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.cost.percent_fee) {
            return Err(Error::Config("percent_fee must be in [0.0, 1.0)".into()));
        }
        if self.cost.min_fee < 0.0 {
            return Err(Error::Config("min_fee must be >= 0".into()));
        }

        match &self.strategy {
            StrategyConfig::FixedWeight(fixed) => {
                match (fixed.portfolio.is_empty(), &fixed.target_file) {
                    (false, None) => {
                        TargetSpec::from_targets(fixed.portfolio.clone())?;
                    }
                    (true, Some(_)) => {}
                    _ => {
                        return Err(Error::Config(
                            "fixed_weight needs exactly one of portfolio and target_file".into(),
                        ));
                    }
                }
            }
            StrategyConfig::Momentum(m) => {
                if m.symbols.is_empty() {
                    return Err(Error::Config("momentum symbols must not be empty".into()));
                }
                if m.number_of_symbols == 0 {
                    return Err(Error::Config("number_of_symbols must be >= 1".into()));
                }
                if m.analysis_period == 0 {
                    return Err(Error::Config("analysis_period must be >= 1".into()));
                }
                if let Some(t) = m.rebalance_threshold {
                    if !(0.0..1.0).contains(&t) {
                        return Err(Error::Config(
                            "rebalance_threshold must be in [0.0, 1.0)".into(),
                        ));
                    }
                }
                if m.min_price < 0.0 {
                    return Err(Error::Config("min_price must be >= 0".into()));
                }
            }
            StrategyConfig::Crossover(c) => {
                if c.window == 0 {
                    return Err(Error::Config("crossover window must be >= 1".into()));
                }
                if !c.band.is_finite() || c.band < 0.0 {
                    return Err(Error::Config("crossover band must be >= 0".into()));
                }
                if !c.quantity.is_finite() || c.quantity <= 0.0 {
                    return Err(Error::Config("crossover quantity must be > 0".into()));
                }
            }
        }
        Ok(())
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.tick_interval_secs)
    }

    /// Settlement policy between order phases.
    pub fn settlement(&self) -> Settlement {
        match self.execution.settlement {
            SettlementMode::FixedDelay => {
                Settlement::FixedDelay(Duration::from_secs(self.execution.settle_delay_secs))
            }
            SettlementMode::AwaitFills => Settlement::AwaitFills {
                poll: Duration::from_millis(self.execution.poll_interval_ms),
                timeout: Duration::from_secs(self.execution.fill_timeout_secs),
            },
        }
    }

    pub fn fee_model(&self) -> FeeModel {
        FeeModel {
            percent_fee: self.cost.percent_fee,
            min_fee: self.cost.min_fee,
        }
    }
}
