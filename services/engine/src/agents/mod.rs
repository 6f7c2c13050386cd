//! Agent modules for the audit engine
//!
//! - `sg_audit`: multi-region security group collection and open-ingress scanning

pub mod sg_audit;

pub use sg_audit::SecurityGroupAuditAgent;
