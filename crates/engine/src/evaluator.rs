//! Alert evaluator.
//!
//! Each tick refreshes the symbol directory and price cache, checks every
//! stored alert against the latest price for its base asset, notifies the
//! owning chat for each crossed threshold and deletes the fired alert.

use pricealert_alerts::{format_trigger_message, AlertStore, Notifier, StoreError};
use pricealert_core::{Alert, PriceMap};
use pricealert_feeds::{PriceCache, SymbolDirectory};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("Alert store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration for the evaluator loop.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Pause between ticks. Same as the price refresh interval.
    pub interval: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// An alert whose condition held, with the price that crossed it.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAlert {
    pub alert: Alert,
    pub price: f64,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub alerts_checked: usize,
    pub triggered: usize,
    pub notified: usize,
    pub removed: usize,
}

/// Check `alerts` against a price snapshot.
///
/// Alerts are grouped by base asset in order of first appearance; groups
/// without a price are skipped. The result keeps that group order and the
/// input order within each group.
pub fn evaluate_alerts(alerts: &[Alert], prices: &PriceMap) -> Vec<TriggeredAlert> {
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&Alert>)> = Vec::new();

    for alert in alerts {
        let base = alert.base_asset.to_uppercase();
        match group_index.get(&base) {
            Some(&i) => groups[i].1.push(alert),
            None => {
                group_index.insert(base.clone(), groups.len());
                groups.push((base, vec![alert]));
            }
        }
    }

    let mut triggered = Vec::new();
    for (base, group) in groups {
        let Some(&price) = prices.get(&base) else {
            continue;
        };

        triggered.extend(
            group
                .into_iter()
                .filter(|alert| alert.is_triggered(price))
                .map(|alert| TriggeredAlert {
                    alert: alert.clone(),
                    price,
                }),
        );
    }

    triggered
}

/// Background alert evaluator.
pub struct AlertEvaluator {
    directory: Arc<SymbolDirectory>,
    prices: Arc<PriceCache>,
    store: Arc<AlertStore>,
    notifier: Arc<dyn Notifier>,
    config: EvaluatorConfig,
}

impl AlertEvaluator {
    pub fn new(
        directory: Arc<SymbolDirectory>,
        prices: Arc<PriceCache>,
        store: Arc<AlertStore>,
        notifier: Arc<dyn Notifier>,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            directory,
            prices,
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Run one evaluation pass.
    pub async fn run_tick(&self) -> Result<TickReport, EvaluatorError> {
        self.directory.refresh().await;
        self.prices.refresh().await;

        let alerts = self.store.list_all().await?;
        let mut report = TickReport {
            alerts_checked: alerts.len(),
            ..TickReport::default()
        };
        if alerts.is_empty() {
            return Ok(report);
        }

        let snapshot = self.prices.snapshot();
        let triggered = evaluate_alerts(&alerts, &snapshot);
        report.triggered = triggered.len();

        for TriggeredAlert { alert, price } in &triggered {
            let pair = self
                .directory
                .lookup(&alert.base_asset)
                .unwrap_or_else(|| self.directory.quote().pair_for(&alert.base_asset));
            let text = format_trigger_message(alert, &pair, *price);

            match self.notifier.send(alert.chat_id, &text).await {
                Ok(()) => report.notified += 1,
                Err(e) => warn!(
                    alert_id = %alert.id,
                    chat_id = alert.chat_id,
                    error = %e,
                    "Alert notification failed, removing alert anyway"
                ),
            }

            // Same ownership-checked path as a user removal; a concurrent
            // removal makes this a silent no-op.
            match self.store.remove(alert.id, alert.user_id).await {
                Ok(true) => report.removed += 1,
                Ok(false) => debug!(alert_id = %alert.id, "Alert already removed"),
                Err(e) => error!(alert_id = %alert.id, error = %e, "Failed to remove fired alert"),
            }
        }

        Ok(report)
    }

    /// Tick forever, sleeping `interval` after each pass.
    pub async fn run(&self) {
        info!(interval = ?self.config.interval, "Alert evaluator started");

        loop {
            match self.run_tick().await {
                Ok(report) if report.triggered > 0 => info!(
                    checked = report.alerts_checked,
                    triggered = report.triggered,
                    notified = report.notified,
                    removed = report.removed,
                    "Alerts fired"
                ),
                Ok(report) => debug!(checked = report.alerts_checked, "Tick complete"),
                Err(e) => error!(error = %e, "Alert evaluation tick failed"),
            }

            tokio::time::sleep(self.config.interval).await;
        }
    }

    /// Run the loop on its own task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
