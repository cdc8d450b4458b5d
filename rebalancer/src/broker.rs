//! Broker resolution: pick and build the broker named in the config.
//!
//! The `paper` broker is a [`MockBroker`] seeded from a JSON market file:
//!
//! ```json
//! {
//!   "as_of": "2024-06-28",
//!   "cash": 10000.0,
//!   "holdings": [{ "symbol": "SPY", "quantity": 10 }],
//!   "prices": { "SPY": 545.2 },
//!   "history": { "SPY": [{ "date": "2024-06-27", "close": 541.1 }] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use log::info;
use serde::Deserialize;
use weightbook::{Holding, Symbol};
use weightbook_broker::mock::{FillMode, MockBroker};
use weightbook_broker::{Bar, Broker};

use crate::config::{BrokerConfig, BrokerKind, Config, PaperFill};
use crate::error::{Error, Result};

/// Starting state of a paper account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketFile {
    /// The day daily history windows end on. Defaults to the latest bar.
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub cash: f64,
    #[serde(default)]
    pub holdings: Vec<Holding>,
    /// Last prices; a symbol without one uses its last close.
    #[serde(default)]
    pub prices: BTreeMap<Symbol, f64>,
    #[serde(default)]
    pub history: BTreeMap<Symbol, Vec<MarketBar>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MarketBar {
    pub date: NaiveDate,
    pub close: f64,
}

impl MarketFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::MarketRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| Error::MarketParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Build a paper broker holding this market.
    pub fn into_broker(self, config: &BrokerConfig) -> MockBroker {
        let fill_mode = match config.fill {
            PaperFill::Immediate => FillMode::ImmediateFull,
            PaperFill::Delayed => FillMode::AfterPolls(config.fill_after_polls),
        };
        let mut builder = MockBroker::builder()
            .quote_asset(config.quote_asset)
            .fill_mode(fill_mode)
            .with_cash(self.cash);
        if let Some(date) = self.as_of {
            builder = builder.as_of(date);
        }
        for h in self.holdings {
            builder = builder.with_holding(h.symbol, h.quantity);
        }
        for (symbol, price) in self.prices {
            builder = builder.with_price(symbol, price);
        }
        for (symbol, bars) in self.history {
            let bars = bars.iter().map(|b| Bar::new(b.date, b.close)).collect();
            builder = builder.with_history(symbol, bars);
        }
        builder.build()
    }
}

/// Connect to the configured broker.
pub fn connect(config: &Config) -> Result<Box<dyn Broker>> {
    match config.broker.kind {
        BrokerKind::Paper => {
            let market = MarketFile::load(&config.broker.market_file)?;
            info!(
                "Paper broker: {} holdings, {} symbols with history, ${:.2} cash",
                market.holdings.len(),
                market.history.len(),
                market.cash
            );
            Ok(Box::new(market.into_broker(&config.broker)))
        }
    }
}
