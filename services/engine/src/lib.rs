//! Security Group Audit Engine Library
//!
//! Multi-region security group inventory with an open-ingress policy check.

pub mod agents;

pub use agents::sg_audit;
pub use agents::sg_audit::{Collector, SecurityGroupAuditAgent};
