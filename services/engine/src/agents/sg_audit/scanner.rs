//! Open Ingress Policy Scanner
//!
//! Flags security groups with an inbound IPv4 range of exactly `0.0.0.0/0`.
//! Pure: no I/O, input untouched.

use super::types::{
    InboundRule, Inventory, IpRange, RegionGroupSet, SecurityGroup, ViolationReport,
    UNRESTRICTED_IPV4_CIDR,
};

impl IpRange {
    /// Exact match on the IPv4 "anywhere" literal; a missing CIDR never matches
    pub fn is_unrestricted(&self) -> bool {
        self.cidr_ip.as_deref() == Some(UNRESTRICTED_IPV4_CIDR)
    }
}

impl InboundRule {
    pub fn allows_any_source(&self) -> bool {
        self.ip_ranges.iter().any(IpRange::is_unrestricted)
    }
}

impl SecurityGroup {
    /// Whether any inbound rule admits traffic from every IPv4 address
    pub fn allows_unrestricted_ingress(&self) -> bool {
        self.ip_permissions.iter().any(InboundRule::allows_any_source)
    }

    /// Inbound rules that admit any source
    pub fn open_rules(&self) -> impl Iterator<Item = &InboundRule> {
        self.ip_permissions.iter().filter(|r| r.allows_any_source())
    }
}

/// Reduce an inventory to the groups open to the world
///
/// Every inventoried region appears in the report, empty if clean, and
/// each violating group appears once however many of its ranges match.
pub fn check_policy(inventory: &Inventory) -> ViolationReport {
    let mut report = ViolationReport::new(inventory.account.clone());

    for set in &inventory.region_sets {
        let violating = set
            .security_groups
            .iter()
            .filter(|g| g.allows_unrestricted_ingress())
            .cloned()
            .collect();

        report
            .region_sets
            .push(RegionGroupSet::new(set.region.clone(), violating));
    }

    report
}

impl Inventory {
    pub fn check_policy(&self) -> ViolationReport {
        check_policy(self)
    }
}
