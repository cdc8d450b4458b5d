//! JSONL audit trail logging.
//!
//! Each cycle appends events to an audit.jsonl file, one JSON object per
//! line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use weightbook::{Phase, PlannedOrder, PortfolioSnapshot, RebalancePlan, Skip, TargetAllocation};
use weightbook_broker::OrderId;

use crate::error::Result;
use crate::settle::SettleOutcome;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger. A disabled log accepts events and drops them.
pub struct AuditLog {
    writer: Option<BufWriter<std::fs::File>>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
        })
    }

    /// A log that writes nothing.
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
        writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

pub fn log_cycle_started(audit: &mut AuditLog, strategy: &str) -> Result<()> {
    audit.log("cycle_started", serde_json::json!({ "strategy": strategy }))
}

pub fn log_snapshot(audit: &mut AuditLog, snapshot: &PortfolioSnapshot) -> Result<()> {
    let holdings: Vec<_> = snapshot
        .holdings
        .iter()
        .map(|h| {
            serde_json::json!({
                "symbol": h.symbol,
                "qty": h.quantity,
                "price": snapshot.price(h.symbol),
            })
        })
        .collect();
    audit.log(
        "snapshot",
        serde_json::json!({
            "portfolio_value": snapshot.portfolio_value,
            "holdings": holdings,
        }),
    )
}

pub fn log_targets(audit: &mut AuditLog, targets: &[TargetAllocation]) -> Result<()> {
    audit.log("targets_computed", serde_json::json!({ "targets": targets }))
}

pub fn log_skip(audit: &mut AuditLog, skip: &Skip) -> Result<()> {
    audit.log("symbol_skipped", serde_json::json!(skip))
}

pub fn log_plan(audit: &mut AuditLog, plan: &RebalancePlan) -> Result<()> {
    audit.log(
        "plan_computed",
        serde_json::json!({
            "divestitures": plan.divestitures,
            "sells": plan.sells,
            "buys": plan.buys,
            "within_threshold": plan.within_threshold,
        }),
    )
}

pub fn log_order_submitted(
    audit: &mut AuditLog,
    order: &PlannedOrder,
    id: OrderId,
) -> Result<()> {
    audit.log(
        "order_submitted",
        serde_json::json!({
            "symbol": order.symbol,
            "side": order.side,
            "qty": order.quantity,
            "price": order.reference_price,
            "reason": order.reason,
            "order_id": id.0,
        }),
    )
}

pub fn log_order_failed(audit: &mut AuditLog, order: &PlannedOrder, error: &str) -> Result<()> {
    audit.log(
        "order_failed",
        serde_json::json!({
            "symbol": order.symbol,
            "side": order.side,
            "qty": order.quantity,
            "error": error,
        }),
    )
}

pub fn log_phase_settled(
    audit: &mut AuditLog,
    phase: Phase,
    outcome: &SettleOutcome,
) -> Result<()> {
    audit.log(
        "phase_settled",
        serde_json::json!({
            "phase": phase.to_string(),
            "waited_ms": outcome.waited.as_millis() as u64,
            "open": outcome.open,
        }),
    )
}

pub fn log_cycle_completed(
    audit: &mut AuditLog,
    submitted: usize,
    failed: usize,
    skipped: usize,
) -> Result<()> {
    audit.log(
        "cycle_completed",
        serde_json::json!({
            "submitted": submitted,
            "failed": failed,
            "skipped": skipped,
        }),
    )
}
