use weightbook::{Symbol, TargetAllocation};
use weightbook_broker::Broker;

use super::{Proposal, Strategy};
use crate::error::Result;

/// Holds a configured set of weights ("custom ETF"). No deadband: every
/// drift is traded.
#[derive(Debug, Clone)]
pub struct FixedWeight {
    name: String,
    targets: Vec<TargetAllocation>,
    quote: Option<Symbol>,
}

impl FixedWeight {
    pub fn new(name: &str, targets: Vec<TargetAllocation>) -> Self {
        Self {
            name: name.to_string(),
            targets,
            quote: None,
        }
    }

    pub fn with_quote(mut self, quote: Option<Symbol>) -> Self {
        self.quote = quote;
        self
    }

    pub fn targets(&self) -> &[TargetAllocation] {
        &self.targets
    }
}

impl Strategy for FixedWeight {
    fn name(&self) -> &str {
        &self.name
    }

    fn quote(&self) -> Option<Symbol> {
        self.quote
    }

    fn propose(&mut self, _broker: &dyn Broker) -> Result<Proposal> {
        Ok(Proposal::Weights {
            targets: self.targets.clone(),
            skipped: Vec::new(),
        })
    }
}
