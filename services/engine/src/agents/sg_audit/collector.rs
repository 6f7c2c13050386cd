//! Multi-Region Collector
//!
//! Fans out one task per region, each describing that region's security
//! groups, and fans the answers back in through a single channel. Every task
//! reports exactly once, success or failure, so the aggregator's receive loop
//! always terminates. Failed or expired regions are logged and dropped.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::client::RegionClientProvider;
use super::error::RegionQueryError;
use super::types::{Account, Inventory, RegionGroupSet, SecurityGroup};

/// What a region task hands to the aggregator
struct RegionOutcome {
    region: String,
    result: Result<Vec<SecurityGroup>, RegionQueryError>,
}

/// Concurrent security group collector
#[derive(Clone)]
pub struct Collector {
    provider: Arc<dyn RegionClientProvider>,
    region_timeout: Option<Duration>,
}

impl Collector {
    /// Collector without a per-region deadline
    pub fn new(provider: Arc<dyn RegionClientProvider>) -> Self {
        Self {
            provider,
            region_timeout: None,
        }
    }

    /// Bound each region query; expiry drops the region like any other failure
    pub fn with_region_timeout(mut self, timeout: Duration) -> Self {
        self.region_timeout = Some(timeout);
        self
    }

    /// Inventory every requested region for `account`
    ///
    /// Never fails: regions whose query errors or times out are missing
    /// from the result. Entries arrive in completion order; use
    /// [`Inventory::sorted`] for a stable order.
    pub async fn list(&self, account: &Account, regions: &[String]) -> Inventory {
        self.list_as(Uuid::new_v4(), account, regions).await
    }

    /// [`Collector::list`] with a caller-chosen run id on every event
    pub async fn list_as(&self, run_id: Uuid, account: &Account, regions: &[String]) -> Inventory {
        let mut inventory = Inventory::new(account.clone());

        let mut seen = HashSet::new();
        let regions: Vec<&String> = regions.iter().filter(|r| seen.insert(r.as_str())).collect();

        if regions.is_empty() {
            debug!(account = %account.name, %run_id, "No regions requested");
            return inventory;
        }

        info!(
            account = %account.name,
            %run_id,
            regions = regions.len(),
            "Collecting security groups"
        );

        let (tx, mut rx) = mpsc::channel::<RegionOutcome>(regions.len());

        for (index, region) in regions.iter().enumerate() {
            debug!(
                account = %account.name,
                region = %region,
                region_index = index,
                %run_id,
                "Querying security groups"
            );

            let tx = tx.clone();
            let provider = Arc::clone(&self.provider);
            let account = account.clone();
            let region = region.to_string();
            let timeout = self.region_timeout;

            tokio::spawn(async move {
                let result = run_region(provider.as_ref(), &account, &region, timeout).await;
                // Only fails if the aggregator is gone, and then nobody is waiting
                let _ = tx.send(RegionOutcome { region, result }).await;
            });
        }

        // Once every task has reported (or died), recv() yields None
        drop(tx);

        for index in 0..regions.len() {
            let Some(outcome) = rx.recv().await else {
                warn!(
                    account = %account.name,
                    %run_id,
                    received = index,
                    expected = regions.len(),
                    "Region tasks ended without reporting"
                );
                break;
            };

            match outcome.result {
                Ok(groups) => {
                    debug!(
                        account = %account.name,
                        region = %outcome.region,
                        %run_id,
                        count = groups.len(),
                        "Retrieved security groups"
                    );
                    inventory
                        .region_sets
                        .push(RegionGroupSet::new(outcome.region, groups));
                }
                Err(e) => {
                    warn!(
                        account = %account.name,
                        region = %outcome.region,
                        %run_id,
                        error = %e,
                        "Could not describe security groups"
                    );
                }
            }
        }

        info!(
            account = %account.name,
            %run_id,
            collected = inventory.region_sets.len(),
            requested = regions.len(),
            "Collection complete"
        );

        inventory
    }
}

/// Query one region, turning a panic into an ordinary failure so the
/// task still reports under its own region
async fn run_region(
    provider: &dyn RegionClientProvider,
    account: &Account,
    region: &str,
    timeout: Option<Duration>,
) -> Result<Vec<SecurityGroup>, RegionQueryError> {
    AssertUnwindSafe(query_region(provider, account, region, timeout))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(RegionQueryError::Panicked(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn query_region(
    provider: &dyn RegionClientProvider,
    account: &Account,
    region: &str,
    timeout: Option<Duration>,
) -> Result<Vec<SecurityGroup>, RegionQueryError> {
    let client = provider.client_for(account, region)?;
    debug!(
        account = %account.name,
        region = client.region(),
        "Opened region client"
    );

    match timeout {
        Some(limit) => tokio::time::timeout(limit, client.describe_security_groups())
            .await
            .map_err(|_| RegionQueryError::Timeout(limit))?,
        None => client.describe_security_groups().await,
    }
}
