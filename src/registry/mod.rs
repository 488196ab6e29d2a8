//! In-memory store of the latest balance per label tuple.
//!
//! # Responsibilities
//! - Hold one current value and update time per (address, name, network)
//! - Render the full snapshot in the Prometheus text exposition format
//!
//! # Design Decisions
//! - Values are `U256` and printed as exact decimal integers
//! - Entries are created on first successful poll and never removed
//! - A single lock around the map; writes are rare and reads are cheap
//! - Output is sorted by label tuple so scrapes are deterministic

use alloy::primitives::U256;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

pub const BALANCE_METRIC: &str = "ethereum_balance";
const BALANCE_HELP: &str = "Ethereum Wallet Balance";
pub const UPDATED_METRIC: &str = "ethereum_balance_last_updated_timestamp_seconds";
const UPDATED_HELP: &str = "Unix time of the last successful balance update";

/// Labels identifying one balance series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BalanceLabels {
    pub address: String,
    pub address_name: String,
    pub network_name: String,
}

impl BalanceLabels {
    pub fn new(
        address: impl Into<String>,
        address_name: impl Into<String>,
        network_name: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            address_name: address_name.into(),
            network_name: network_name.into(),
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push_str("{address=\"");
        escape_label_value(&self.address, out);
        out.push_str("\",address_name=\"");
        escape_label_value(&self.address_name, out);
        out.push_str("\",network_name=\"");
        escape_label_value(&self.network_name, out);
        out.push_str("\"}");
    }
}

/// Latest known value of one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSample {
    pub value: U256,
    pub updated_at: SystemTime,
}

/// Shared balance registry. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct BalanceRegistry {
    inner: Arc<RwLock<BTreeMap<BalanceLabels, BalanceSample>>>,
}

impl BalanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite the entry for `labels`, stamping it with the current time.
    pub fn set(&self, labels: BalanceLabels, value: U256) {
        self.set_at(labels, value, SystemTime::now());
    }

    /// Like [`set`](Self::set) with an explicit update time.
    pub fn set_at(&self, labels: BalanceLabels, value: U256, updated_at: SystemTime) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(labels, BalanceSample { value, updated_at });
    }

    pub fn get(&self, labels: &BalanceLabels) -> Option<BalanceSample> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(labels).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, sorted by labels.
    pub fn snapshot(&self) -> Vec<(BalanceLabels, BalanceSample)> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Render the current snapshot in the text exposition format.
    pub fn dump(&self) -> String {
        let entries = self.snapshot();
        let mut out = String::new();

        let _ = writeln!(out, "# HELP {BALANCE_METRIC} {BALANCE_HELP}");
        let _ = writeln!(out, "# TYPE {BALANCE_METRIC} gauge");
        for (labels, sample) in &entries {
            out.push_str(BALANCE_METRIC);
            labels.write_to(&mut out);
            let _ = writeln!(out, " {}", sample.value);
        }

        if !entries.is_empty() {
            let _ = writeln!(out, "# HELP {UPDATED_METRIC} {UPDATED_HELP}");
            let _ = writeln!(out, "# TYPE {UPDATED_METRIC} gauge");
            for (labels, sample) in &entries {
                let secs = sample
                    .updated_at
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                out.push_str(UPDATED_METRIC);
                labels.write_to(&mut out);
                let _ = writeln!(out, " {secs}");
            }
        }

        out
    }
}

fn escape_label_value(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
}
