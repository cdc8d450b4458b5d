//! weightbook-rebalancer: scheduled portfolio rebalancer on top of weightbook.
//!
//! A strategy decides target weights (or orders) each cycle, the diff engine
//! turns weights into a phased plan, and the sequencer submits it to a broker
//! with sells settled before buys, logging every step to a JSONL audit trail.

pub mod audit;
pub mod broker;
pub mod commands;
pub mod config;
pub mod error;
pub mod execution;
pub mod reconcile;
pub mod scheduler;
pub mod settle;
pub mod strategy;
pub mod target;
