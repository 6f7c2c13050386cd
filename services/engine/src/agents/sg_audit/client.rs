//! Region Client Abstractions
//!
//! The collector only needs one capability per region: list every
//! security group. Providers decide how a region-scoped client is built.

use async_trait::async_trait;

use super::error::RegionQueryError;
use super::types::{Account, SecurityGroup};

/// A client bound to one account and one region
#[async_trait]
pub trait RegionClient: Send + Sync {
    /// Region this client queries
    fn region(&self) -> &str;

    /// Describe every security group in the region, unfiltered
    async fn describe_security_groups(&self) -> Result<Vec<SecurityGroup>, RegionQueryError>;
}

/// Builds region-scoped clients for an account
pub trait RegionClientProvider: Send + Sync {
    fn client_for(
        &self,
        account: &Account,
        region: &str,
    ) -> Result<Box<dyn RegionClient>, RegionQueryError>;
}
