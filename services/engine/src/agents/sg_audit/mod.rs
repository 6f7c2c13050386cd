//! Security Group Audit Agent
//!
//! Inventories security groups across regions for an account and reports
//! the groups whose inbound rules admit `0.0.0.0/0`.
//!
//! ## Pipeline
//!
//! - [`Collector`]: one task per region, results fanned in over a channel.
//!   Failed, unreachable or slow regions are logged and left out.
//! - [`check_policy`]: pure filter from [`Inventory`] to [`ViolationReport`].
//!
//! ## Example Usage
//!
//! ```ignore
//! use sg_audit_engine::agents::sg_audit::{Account, AuditConfig, SecurityGroupAuditAgent};
//!
//! let config = AuditConfig::default().with_regions(["us-east-1", "eu-west-1"]);
//! let agent = SecurityGroupAuditAgent::with_aws_cli(config)?;
//!
//! let outcome = agent.audit(&Account::new("prod").with_profile("prod-readonly")).await;
//! println!("{} violating groups", outcome.summary.violating_groups);
//! ```

pub mod aws_cli;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod scanner;
pub mod types;

pub use aws_cli::AwsCliProvider;
pub use client::{RegionClient, RegionClientProvider};
pub use collector::Collector;
pub use config::AuditConfig;
pub use error::{ConfigError, RegionQueryError};
pub use scanner::check_policy;
pub use types::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Headline numbers for one audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub run_id: Uuid,
    pub account: String,
    pub timestamp: DateTime<Utc>,
    pub regions_requested: usize,
    pub regions_collected: usize,
    /// Requested regions that produced no inventory, sorted
    pub missing_regions: Vec<String>,
    pub groups_scanned: usize,
    pub violating_groups: usize,
}

/// Everything one audit run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub summary: AuditSummary,
    /// Sorted by region
    pub inventory: Inventory,
    /// Sorted by region
    pub report: ViolationReport,
}

/// Collects and scans security groups for an account
pub struct SecurityGroupAuditAgent {
    collector: Collector,
    config: AuditConfig,
}

impl SecurityGroupAuditAgent {
    /// Create an agent over any region client provider
    pub fn new(
        config: AuditConfig,
        provider: Arc<dyn RegionClientProvider>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let collector = Collector::new(provider).with_region_timeout(config.region_timeout());

        Ok(Self { collector, config })
    }

    /// Create an agent that queries through the configured AWS CLI
    pub fn with_aws_cli(config: AuditConfig) -> Result<Self, ConfigError> {
        let provider = Arc::new(AwsCliProvider::new(config.aws_cli.clone()));
        Self::new(config, provider)
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Run collection then scanning
    ///
    /// Infallible: unreachable regions show up in
    /// [`AuditSummary::missing_regions`], not as an error.
    pub async fn audit(&self, account: &Account) -> AuditOutcome {
        let run_id = Uuid::new_v4();
        let timestamp = Utc::now();

        info!(
            account = %account.name,
            %run_id,
            credentials = account.credentials.kind(),
            "Starting security group audit"
        );

        let inventory = self
            .collector
            .list_as(run_id, account, &self.config.regions)
            .await
            .sorted();
        let report = check_policy(&inventory);

        let requested: BTreeSet<&str> = self.config.regions.iter().map(String::as_str).collect();
        let collected: BTreeSet<&str> = inventory.regions().into_iter().collect();
        let missing_regions: Vec<String> = requested
            .difference(&collected)
            .map(|r| r.to_string())
            .collect();

        let summary = AuditSummary {
            run_id,
            account: account.name.clone(),
            timestamp,
            regions_requested: requested.len(),
            regions_collected: inventory.region_sets.len(),
            missing_regions,
            groups_scanned: inventory.group_count(),
            violating_groups: report.violation_count(),
        };

        info!(
            account = %account.name,
            %run_id,
            regions_collected = summary.regions_collected,
            regions_missing = summary.missing_regions.len(),
            groups_scanned = summary.groups_scanned,
            violating_groups = summary.violating_groups,
            "Security group audit complete"
        );

        AuditOutcome {
            summary,
            inventory,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticProvider {
        regions: HashMap<String, Vec<SecurityGroup>>,
    }

    struct StaticClient {
        region: String,
        groups: Option<Vec<SecurityGroup>>,
    }

    #[async_trait]
    impl RegionClient for StaticClient {
        fn region(&self) -> &str {
            &self.region
        }

        async fn describe_security_groups(&self) -> Result<Vec<SecurityGroup>, RegionQueryError> {
            self.groups.clone().ok_or_else(|| RegionQueryError::Service {
                code: Some(255),
                message: "Could not connect to the endpoint URL".to_string(),
            })
        }
    }

    impl RegionClientProvider for StaticProvider {
        fn client_for(
            &self,
            _account: &Account,
            region: &str,
        ) -> Result<Box<dyn RegionClient>, RegionQueryError> {
            Ok(Box::new(StaticClient {
                region: region.to_string(),
                groups: self.regions.get(region).cloned(),
            }))
        }
    }

    fn group(id: &str, cidr: &str) -> SecurityGroup {
        SecurityGroup::new(id, id).with_inbound(InboundRule::new("tcp", 22, 22).with_cidr(cidr))
    }

    #[tokio::test]
    async fn test_audit_end_to_end() {
        let open = group("sg-open", "0.0.0.0/0");
        let provider = Arc::new(StaticProvider {
            regions: HashMap::from([
                ("us-east-1".to_string(), vec![open.clone()]),
                ("eu-west-1".to_string(), vec![group("sg-private", "10.0.0.0/16")]),
            ]),
        });
        let config = AuditConfig::default().with_regions(["us-east-1", "eu-west-1", "ap-south-1"]);
        let agent = SecurityGroupAuditAgent::new(config, provider).unwrap();

        let outcome = agent.audit(&Account::new("prod")).await;

        assert_eq!(outcome.inventory.regions(), vec!["eu-west-1", "us-east-1"]);
        assert_eq!(outcome.report.regions(), vec!["eu-west-1", "us-east-1"]);
        assert_eq!(outcome.report.region("us-east-1").unwrap().security_groups, vec![open]);
        assert!(outcome.report.region("eu-west-1").unwrap().is_empty());

        let summary = &outcome.summary;
        assert_eq!(summary.account, "prod");
        assert_eq!(summary.regions_requested, 3);
        assert_eq!(summary.regions_collected, 2);
        assert_eq!(summary.missing_regions, vec!["ap-south-1".to_string()]);
        assert_eq!(summary.groups_scanned, 2);
        assert_eq!(summary.violating_groups, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let provider = Arc::new(StaticProvider {
            regions: HashMap::new(),
        });
        let config = AuditConfig::default().with_region_timeout_secs(0);

        assert!(matches!(
            SecurityGroupAuditAgent::new(config, provider),
            Err(ConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn test_with_aws_cli_keeps_config() {
        let config = AuditConfig::default().with_aws_cli("/opt/aws/bin/aws");
        let agent = SecurityGroupAuditAgent::with_aws_cli(config.clone()).unwrap();

        assert_eq!(agent.config(), &config);
    }
}
