//! AWS CLI Region Client
//!
//! Runs `aws ec2 describe-security-groups` for one region and decodes the
//! JSON it prints. The CLI handles pagination and the credential chain.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::client::{RegionClient, RegionClientProvider};
use super::error::RegionQueryError;
use super::types::{null_as_default, Account, Credentials, SecurityGroup};

/// Default executable name, resolved through `PATH`
pub const DEFAULT_AWS_CLI: &str = "aws";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroupsOutput {
    #[serde(default, deserialize_with = "null_as_default")]
    security_groups: Vec<SecurityGroup>,
}

/// Builds [`AwsCliClient`]s that shell out to the AWS CLI
#[derive(Debug, Clone)]
pub struct AwsCliProvider {
    binary: String,
}

impl AwsCliProvider {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for AwsCliProvider {
    fn default() -> Self {
        Self::new(DEFAULT_AWS_CLI)
    }
}

impl RegionClientProvider for AwsCliProvider {
    fn client_for(
        &self,
        account: &Account,
        region: &str,
    ) -> Result<Box<dyn RegionClient>, RegionQueryError> {
        if region.trim().is_empty() {
            return Err(RegionQueryError::Client("region identifier is blank".to_string()));
        }

        Ok(Box::new(AwsCliClient {
            binary: self.binary.clone(),
            region: region.to_string(),
            credentials: account.credentials.clone(),
        }))
    }
}

/// Region-scoped client backed by the AWS CLI
pub struct AwsCliClient {
    binary: String,
    region: String,
    credentials: Credentials,
}

impl AwsCliClient {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "ec2",
            "describe-security-groups",
            "--region",
            self.region.as_str(),
            "--output",
            "json",
        ]);

        match &self.credentials {
            Credentials::Default => {}
            Credentials::Profile(profile) => {
                cmd.args(["--profile", profile.as_str()]);
            }
            Credentials::Static {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                // Explicit keys must win over any ambient profile
                cmd.env_remove("AWS_PROFILE")
                    .env("AWS_ACCESS_KEY_ID", access_key_id)
                    .env("AWS_SECRET_ACCESS_KEY", secret_access_key);
                match session_token {
                    Some(token) => cmd.env("AWS_SESSION_TOKEN", token),
                    None => cmd.env_remove("AWS_SESSION_TOKEN"),
                };
            }
        }

        // An expired deadline drops the future; the child goes with it
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl RegionClient for AwsCliClient {
    fn region(&self) -> &str {
        &self.region
    }

    async fn describe_security_groups(&self) -> Result<Vec<SecurityGroup>, RegionQueryError> {
        debug!(
            region = %self.region,
            binary = %self.binary,
            credentials = self.credentials.kind(),
            "Running describe-security-groups"
        );

        let output = self.command().output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                "aws cli exited unsuccessfully".to_string()
            } else {
                stderr
            };
            return Err(RegionQueryError::Service {
                code: output.status.code(),
                message,
            });
        }

        let parsed: DescribeSecurityGroupsOutput = serde_json::from_slice(&output.stdout)?;
        debug!(
            region = %self.region,
            count = parsed.security_groups.len(),
            "Decoded security groups"
        );

        Ok(parsed.security_groups)
    }
}
