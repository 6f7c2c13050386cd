//! Audit Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::aws_cli::DEFAULT_AWS_CLI;
use super::error::ConfigError;

/// Standard commercial AWS regions queried when none are given
pub const DEFAULT_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "sa-east-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
];

/// Default per-region deadline in seconds
pub const DEFAULT_REGION_TIMEOUT_SECS: u64 = 30;

/// Configuration for a security group audit run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Regions to inventory
    pub regions: Vec<String>,
    /// Deadline for each region query, in seconds
    pub region_timeout_secs: u64,
    /// AWS CLI executable
    pub aws_cli: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            region_timeout_secs: DEFAULT_REGION_TIMEOUT_SECS,
            aws_cli: DEFAULT_AWS_CLI.to_string(),
        }
    }
}

impl AuditConfig {
    /// Replace the region list
    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_region_timeout_secs(mut self, secs: u64) -> Self {
        self.region_timeout_secs = secs;
        self
    }

    pub fn with_aws_cli(mut self, path: impl Into<String>) -> Self {
        self.aws_cli = path.into();
        self
    }

    pub fn region_timeout(&self) -> Duration {
        Duration::from_secs(self.region_timeout_secs)
    }

    /// Reject settings that would make every query fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if let Some(position) = self.regions.iter().position(|r| r.trim().is_empty()) {
            return Err(ConfigError::BlankRegion(position));
        }

        if self.aws_cli.trim().is_empty() {
            return Err(ConfigError::EmptyCliPath);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AuditConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.regions.len(), DEFAULT_REGIONS.len());
        assert_eq!(config.region_timeout(), Duration::from_secs(30));
        assert_eq!(config.aws_cli, "aws");
    }

    #[test]
    fn test_empty_region_list_is_valid() {
        let config = AuditConfig::default().with_regions(Vec::<String>::new());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            AuditConfig::default().with_region_timeout_secs(0).validate(),
            Err(ConfigError::ZeroTimeout)
        );
        assert_eq!(
            AuditConfig::default()
                .with_regions(["us-east-1", " "])
                .validate(),
            Err(ConfigError::BlankRegion(1))
        );
        assert_eq!(
            AuditConfig::default().with_aws_cli("").validate(),
            Err(ConfigError::EmptyCliPath)
        );
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: AuditConfig =
            serde_json::from_str(r#"{"regions": ["eu-west-1"]}"#).unwrap();

        assert_eq!(config.regions, vec!["eu-west-1".to_string()]);
        assert_eq!(config.region_timeout_secs, DEFAULT_REGION_TIMEOUT_SECS);
    }
}
