//! Security Group Audit Types
//!
//! Data model shared by the collector and the policy scanner. Provider
//! records keep their PascalCase field names so `describe-security-groups`
//! output decodes directly, and unknown fields are carried through verbatim.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The CIDR literal meaning "every IPv4 address"
pub const UNRESTRICTED_IPV4_CIDR: &str = "0.0.0.0/0";

/// Decode an explicit `null` as the type's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Credential material handed to region clients
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Whatever the provider's default credential chain resolves
    #[default]
    Default,
    /// A named profile from the shared config/credentials files
    Profile(String),
    /// Explicit access keys
    Static {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
}

impl Credentials {
    /// Short label safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::Default => "default",
            Credentials::Profile(_) => "profile",
            Credentials::Static { .. } => "static",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Default => write!(f, "Default"),
            Credentials::Profile(name) => f.debug_tuple("Profile").field(name).finish(),
            Credentials::Static {
                access_key_id,
                session_token,
                ..
            } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .field("session_token", &session_token.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Account identity used to scope a collection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Display name, used in logs and reports
    pub name: String,
    /// Never serialized
    #[serde(skip)]
    pub credentials: Credentials,
}

impl Account {
    /// Create an account that relies on the default credential chain
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credentials: Credentials::Default,
        }
    }

    /// Use a named profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.credentials = Credentials::Profile(profile.into());
        self
    }

    /// Use explicit access keys
    pub fn with_static_keys(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        self.credentials = Credentials::Static {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        };
        self
    }
}

/// IPv4 source range on a rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IpRange {
    pub fn new(cidr: impl Into<String>) -> Self {
        Self {
            cidr_ip: Some(cidr.into()),
            description: None,
        }
    }
}

/// IPv6 source range on a rule (carried, never evaluated)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ipv6Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_ipv6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An inbound rule (`IpPermissions` entry)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InboundRule {
    /// `tcp`, `udp`, `icmp`, a protocol number, or `-1` for all traffic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_port: Option<i32>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub ip_ranges: Vec<IpRange>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub ipv6_ranges: Vec<Ipv6Range>,
    /// Group pairs, prefix lists and anything else the provider returns
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboundRule {
    /// Rule for a protocol and a single port or port range
    pub fn new(protocol: &str, from_port: i32, to_port: i32) -> Self {
        Self {
            ip_protocol: Some(protocol.to_string()),
            from_port: Some(from_port),
            to_port: Some(to_port),
            ..Default::default()
        }
    }

    /// Add an IPv4 source range
    pub fn with_cidr(mut self, cidr: &str) -> Self {
        self.ip_ranges.push(IpRange::new(cidr));
        self
    }

    /// Compact `proto:ports` label, e.g. `tcp:22`, `tcp:8000-8080`, `all`
    pub fn port_label(&self) -> String {
        let protocol = match self.ip_protocol.as_deref() {
            None | Some("-1") => return "all".to_string(),
            Some(p) => p,
        };

        match (self.from_port, self.to_port) {
            (Some(from), Some(to)) if from == to => format!("{}:{}", protocol, from),
            (Some(from), Some(to)) => format!("{}:{}-{}", protocol, from, to),
            _ => protocol.to_string(),
        }
    }
}

/// A cloud security group as returned by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub group_id: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Inbound rules
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub ip_permissions: Vec<InboundRule>,
    /// Egress rules, tags and other provider fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SecurityGroup {
    pub fn new(group_id: &str, group_name: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            group_name: group_name.to_string(),
            ..Default::default()
        }
    }

    /// Add an inbound rule
    pub fn with_inbound(mut self, rule: InboundRule) -> Self {
        self.ip_permissions.push(rule);
        self
    }
}

/// Security groups of a single region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionGroupSet {
    pub region: String,
    pub security_groups: Vec<SecurityGroup>,
}

impl RegionGroupSet {
    pub fn new(region: impl Into<String>, security_groups: Vec<SecurityGroup>) -> Self {
        Self {
            region: region.into(),
            security_groups,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.security_groups.is_empty()
    }
}

/// Everything collected for an account in one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub account: Account,
    /// One entry per region that answered, in arrival order
    pub region_sets: Vec<RegionGroupSet>,
}

impl Inventory {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            region_sets: Vec::new(),
        }
    }

    /// Region identifiers present in this inventory
    pub fn regions(&self) -> Vec<&str> {
        self.region_sets.iter().map(|s| s.region.as_str()).collect()
    }

    pub fn region(&self, region: &str) -> Option<&RegionGroupSet> {
        self.region_sets.iter().find(|s| s.region == region)
    }

    /// Total number of groups across regions
    pub fn group_count(&self) -> usize {
        self.region_sets.iter().map(|s| s.security_groups.len()).sum()
    }

    /// Copy ordered by region identifier, for presentation
    pub fn sorted(mut self) -> Self {
        self.region_sets.sort_by(|a, b| a.region.cmp(&b.region));
        self
    }
}

/// Inventory filtered down to groups open to the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationReport {
    pub account: Account,
    /// One entry per inventoried region, possibly empty
    pub region_sets: Vec<RegionGroupSet>,
}

impl ViolationReport {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            region_sets: Vec::new(),
        }
    }

    pub fn regions(&self) -> Vec<&str> {
        self.region_sets.iter().map(|s| s.region.as_str()).collect()
    }

    pub fn region(&self, region: &str) -> Option<&RegionGroupSet> {
        self.region_sets.iter().find(|s| s.region == region)
    }

    /// Number of violating groups across regions
    pub fn violation_count(&self) -> usize {
        self.region_sets.iter().map(|s| s.security_groups.len()).sum()
    }

    pub fn has_violations(&self) -> bool {
        self.region_sets.iter().any(|s| !s.is_empty())
    }

    pub fn sorted(mut self) -> Self {
        self.region_sets.sort_by(|a, b| a.region.cmp(&b.region));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_describe_output_group() {
        let raw = serde_json::json!({
            "GroupId": "sg-0123456789abcdef0",
            "GroupName": "web",
            "Description": "web tier",
            "VpcId": "vpc-1a2b3c4d",
            "OwnerId": "123456789012",
            "IpPermissions": [{
                "IpProtocol": "tcp",
                "FromPort": 443,
                "ToPort": 443,
                "IpRanges": [{"CidrIp": "0.0.0.0/0", "Description": "https"}],
                "Ipv6Ranges": [{"CidrIpv6": "::/0"}],
                "UserIdGroupPairs": [],
                "PrefixListIds": []
            }],
            "IpPermissionsEgress": [{"IpProtocol": "-1", "IpRanges": [{"CidrIp": "0.0.0.0/0"}]}],
            "Tags": [{"Key": "Name", "Value": "web"}]
        });

        let group: SecurityGroup = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(group.group_id, "sg-0123456789abcdef0");
        assert_eq!(group.vpc_id.as_deref(), Some("vpc-1a2b3c4d"));
        assert_eq!(group.ip_permissions.len(), 1);
        let rule = &group.ip_permissions[0];
        assert_eq!(rule.ip_ranges[0].cidr_ip.as_deref(), Some("0.0.0.0/0"));
        assert_eq!(rule.ipv6_ranges[0].cidr_ipv6.as_deref(), Some("::/0"));
        assert!(rule.extra.contains_key("UserIdGroupPairs"));
        assert!(group.extra.contains_key("IpPermissionsEgress"));
        assert!(group.extra.contains_key("Tags"));

        // Provider fields survive a re-encode untouched
        assert_eq!(serde_json::to_value(&group).unwrap(), raw);
    }

    #[test]
    fn test_missing_cidr_decodes_as_none() {
        let rule: InboundRule = serde_json::from_value(serde_json::json!({
            "IpProtocol": "tcp",
            "IpRanges": [{"Description": "no cidr"}]
        }))
        .unwrap();

        assert_eq!(rule.ip_ranges.len(), 1);
        assert!(rule.ip_ranges[0].cidr_ip.is_none());
    }

    #[test]
    fn test_null_collections_decode_as_empty() {
        let group: SecurityGroup = serde_json::from_value(serde_json::json!({
            "GroupId": null,
            "GroupName": null,
            "IpPermissions": [{
                "IpProtocol": "tcp",
                "IpRanges": null,
                "Ipv6Ranges": null
            }]
        }))
        .unwrap();

        assert!(group.group_id.is_empty());
        assert!(group.group_name.is_empty());
        assert!(group.ip_permissions[0].ip_ranges.is_empty());
        assert!(group.ip_permissions[0].ipv6_ranges.is_empty());

        let bare: SecurityGroup =
            serde_json::from_value(serde_json::json!({"GroupId": "sg-1", "IpPermissions": null}))
                .unwrap();
        assert!(bare.ip_permissions.is_empty());
    }

    #[test]
    fn test_reencode_adds_no_fields() {
        let raw = serde_json::json!({
            "GroupId": "sg-1",
            "IpPermissions": [{"IpRanges": [{"CidrIp": "0.0.0.0/0"}]}]
        });

        let group: SecurityGroup = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(serde_json::to_value(&group).unwrap(), raw);
    }

    #[test]
    fn test_port_label() {
        assert_eq!(InboundRule::new("tcp", 22, 22).port_label(), "tcp:22");
        assert_eq!(InboundRule::new("tcp", 8000, 8080).port_label(), "tcp:8000-8080");
        assert_eq!(InboundRule::new("-1", -1, -1).port_label(), "all");
        assert_eq!(InboundRule::default().port_label(), "all");
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let account = Account::new("prod").with_static_keys(
            "AKIAEXAMPLE",
            "super-secret",
            Some("session-secret".to_string()),
        );
        let rendered = format!("{:?}", account);

        assert!(rendered.contains("AKIAEXAMPLE"));
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("session-secret"));
        assert_eq!(account.credentials.kind(), "static");
    }

    #[test]
    fn test_account_serialization_skips_credentials() {
        let account = Account::new("prod").with_profile("prod-admin");
        let json = serde_json::to_value(&account).unwrap();

        assert_eq!(json, serde_json::json!({"name": "prod"}));
    }

    #[test]
    fn test_inventory_sorted_by_region() {
        let mut inventory = Inventory::new(Account::new("test"));
        inventory.region_sets.push(RegionGroupSet::new("us-west-2", vec![]));
        inventory.region_sets.push(RegionGroupSet::new("eu-west-1", vec![]));
        inventory
            .region_sets
            .push(RegionGroupSet::new("ap-south-1", vec![SecurityGroup::new("sg-1", "a")]));

        let sorted = inventory.sorted();

        assert_eq!(sorted.regions(), vec!["ap-south-1", "eu-west-1", "us-west-2"]);
        assert_eq!(sorted.group_count(), 1);
    }
}
