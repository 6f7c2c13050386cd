//! Security Group Audit Agent - Standalone Binary
//!
//! Inventories security groups across AWS regions and lists the ones whose
//! inbound rules allow traffic from 0.0.0.0/0.
//!
//! ## Usage
//!
//! ```bash
//! # Audit the default region set with the ambient credentials
//! sg-audit-agent --account prod
//!
//! # Audit two regions through a named profile, as JSON
//! sg-audit-agent --account prod --profile prod-readonly --regions us-east-1,eu-west-1 --output json
//!
//! # CI gate: non-zero exit when anything is open to the world
//! sg-audit-agent --account prod --fail-on-violation
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sg_audit_engine::sg_audit::aws_cli::DEFAULT_AWS_CLI;
use sg_audit_engine::sg_audit::config::DEFAULT_REGION_TIMEOUT_SECS;
use sg_audit_engine::sg_audit::{
    Account, AuditConfig, AuditOutcome, AuditSummary, SecurityGroupAuditAgent, ViolationReport,
};

/// Security Group Audit Agent - Find security groups open to the world
#[derive(Parser, Debug)]
#[command(name = "sg-audit-agent", version, about)]
struct Args {
    /// Account display name used in logs and reports
    #[arg(long, default_value = "default", env = "SG_AUDIT_ACCOUNT")]
    account: String,

    /// Named AWS profile (otherwise the default credential chain)
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Regions to audit, comma separated (defaults to the standard commercial regions)
    #[arg(long, value_delimiter = ',', env = "SG_AUDIT_REGIONS")]
    regions: Vec<String>,

    /// Per-region deadline in seconds
    #[arg(long, default_value_t = DEFAULT_REGION_TIMEOUT_SECS, env = "SG_AUDIT_REGION_TIMEOUT")]
    region_timeout: u64,

    /// AWS CLI executable
    #[arg(long, default_value = DEFAULT_AWS_CLI, env = "SG_AUDIT_AWS_CLI")]
    aws_cli: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Exit with an error when any violation is found
    #[arg(long, default_value = "false")]
    fail_on_violation: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Log format on stderr
    #[arg(long, value_enum, default_value = "text", env = "SG_AUDIT_LOG_FORMAT")]
    log_format: LogFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable table
    Text,
    /// JSON summary and report
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: &'a AuditSummary,
    report: &'a ViolationReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, &args.log_format);

    let mut config = AuditConfig::default()
        .with_region_timeout_secs(args.region_timeout)
        .with_aws_cli(args.aws_cli.clone());
    if !args.regions.is_empty() {
        config = config.with_regions(args.regions.iter().map(|r| r.trim().to_string()));
    }

    let mut account = Account::new(args.account.clone());
    if let Some(profile) = &args.profile {
        account = account.with_profile(profile.clone());
    }

    info!(
        account = %account.name,
        regions = config.regions.len(),
        region_timeout = config.region_timeout_secs,
        "Starting Security Group Audit Agent"
    );

    let agent =
        SecurityGroupAuditAgent::with_aws_cli(config).context("Invalid audit configuration")?;

    let outcome = agent.audit(&account).await;

    if !outcome.summary.missing_regions.is_empty() {
        warn!(
            regions = %outcome.summary.missing_regions.join(","),
            "Some regions could not be inventoried"
        );
    }

    match args.output {
        OutputFormat::Text => print_text(&outcome),
        OutputFormat::Json => {
            let output = JsonOutput {
                summary: &outcome.summary,
                report: &outcome.report,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize report")?
            );
        }
    }

    if args.fail_on_violation && outcome.report.has_violations() {
        anyhow::bail!(
            "{} security group(s) allow inbound traffic from 0.0.0.0/0",
            outcome.summary.violating_groups
        );
    }

    Ok(())
}

fn init_logging(verbose: bool, format: &LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn print_text(outcome: &AuditOutcome) {
    let summary = &outcome.summary;

    println!(
        "\n{:<16} {:<22} {:<24} {:<22} {}",
        "REGION", "GROUP ID", "NAME", "VPC", "OPEN RULES"
    );
    println!("{}", "-".repeat(110));

    for set in &outcome.report.region_sets {
        for group in &set.security_groups {
            let rules: Vec<String> = group.open_rules().map(|r| r.port_label()).collect();
            println!(
                "{:<16} {:<22} {:<24} {:<22} {}",
                set.region,
                group.group_id,
                truncate(&group.group_name, 24),
                group.vpc_id.as_deref().unwrap_or("-"),
                rules.join(",")
            );
        }
    }

    println!(
        "\n{} violating group(s), {} group(s) scanned in {}/{} region(s)",
        summary.violating_groups,
        summary.groups_scanned,
        summary.regions_collected,
        summary.regions_requested
    );

    if !summary.missing_regions.is_empty() {
        println!("Not inventoried: {}", summary.missing_regions.join(", "));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max - 3).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}
