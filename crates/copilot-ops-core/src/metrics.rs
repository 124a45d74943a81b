// SPDX-License-Identifier: Apache-2.0

//! In-process counters exposed in the Prometheus text format.
//!
//! The counter set is created once at process start and handed to the
//! orchestrator and the HTTP server, never reached through a global.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

/// A monotonically increasing counter with a fixed label schema.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    help: &'static str,
    label_names: &'static [&'static str],
    values: Mutex<BTreeMap<Vec<String>, u64>>,
}

impl Counter {
    /// Creates a counter.
    #[must_use]
    pub fn new(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            label_names,
            values: Mutex::new(BTreeMap::new()),
        }
    }

    /// Increments the series identified by `label_values`, given in schema order.
    pub fn inc(&self, label_values: Vec<String>) {
        debug_assert_eq!(label_values.len(), self.label_names.len());
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        *values.entry(label_values).or_insert(0) += 1;
    }

    /// Current value of a series.
    #[must_use]
    pub fn get(&self, label_values: &[&str]) -> u64 {
        let key: Vec<String> = label_values.iter().map(|v| (*v).to_string()).collect();
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(&key).copied().unwrap_or(0)
    }

    /// Sum over every series.
    #[must_use]
    pub fn total(&self) -> u64 {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.values().sum()
    }

    /// Appends the counter in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, self.help);
        let _ = writeln!(out, "# TYPE {} counter", self.name);

        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if values.is_empty() && self.label_names.is_empty() {
            let _ = writeln!(out, "{} 0", self.name);
        }
        for (label_values, count) in values.iter() {
            if self.label_names.is_empty() {
                let _ = writeln!(out, "{} {count}", self.name);
                continue;
            }
            let labels: Vec<String> = self
                .label_names
                .iter()
                .zip(label_values)
                .map(|(name, value)| format!("{name}=\"{}\"", escape_label(value)))
                .collect();
            let _ = writeln!(out, "{}{{{}}} {count}", self.name, labels.join(","));
        }
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// The bot's counters.
#[derive(Debug)]
pub struct Metrics {
    /// Installations received.
    pub installs: Counter,
    /// Uninstallations received.
    pub uninstalls: Counter,
    /// Webhook actions received, by installation and action.
    pub actions: Counter,
    /// Control-plane operations, by installation, operation, status and method.
    pub operations: Counter,
}

impl Metrics {
    /// Creates the counter set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            installs: Counter::new(
                "num_of_install_total",
                "Total number of installs received",
                &[],
            ),
            uninstalls: Counter::new(
                "num_of_uninstall_total",
                "Total number of uninstalls received",
                &[],
            ),
            actions: Counter::new(
                "num_of_actions_total",
                "Total number of actions received",
                &["install", "action"],
            ),
            operations: Counter::new(
                "operations_triggered",
                "Metrics for action triggered by the operator with respect to the kubernetes operations.",
                &["install", "operation", "status", "method"],
            ),
        }
    }

    /// Renders every counter in Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for counter in [
            &self.installs,
            &self.uninstalls,
            &self.actions,
            &self.operations,
        ] {
            counter.render(&mut out);
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
