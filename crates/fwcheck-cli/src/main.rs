use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use fwcheck_core::targets::MissingPolicyMode;
use fwcheck_core::workspace::WorkspaceMode;
use fwcheck_core::{CheckConfig, CheckError, CheckOutcome, run_check};

mod args;

fn main() -> Result<()> {
    let args = args::Args::parse();
    init_logging();

    if args.unpacker.is_none() && !args.pre_unpacked {
        bail!("--unpacker is required unless --pre-unpacked is set");
    }

    let workspace_mode = if args.pre_unpacked {
        WorkspaceMode::PreUnpacked
    } else {
        WorkspaceMode::Fresh
    };

    let missing_policy = match args.missing_policy {
        Some(args::MissingPolicy::Skip) => MissingPolicyMode::Skip,
        Some(args::MissingPolicy::Fail) => MissingPolicyMode::Fail,
        // Declared lists skip quietly; discovered manifests fail fast.
        None if args.targets.is_some() => MissingPolicyMode::Skip,
        None => MissingPolicyMode::Fail,
    };

    let config = CheckConfig {
        artifact: args.firmware.clone(),
        policy_dir: args.policy_dir.clone(),
        include_dir: args.include_dir.clone(),
        unpacker: args.unpacker.clone(),
        analyzer_bin: args.analyzer_bin.clone(),
        analyzer_options: args
            .analyzer_options
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        declared_targets: args.targets.clone(),
        missing_policy,
        workspace_mode,
        keep_unpacked: args.keep_unpacked,
        tool_timeout: args.timeout_secs.map(Duration::from_secs),
    };

    let outcome = match run_check(&config) {
        Ok(outcome) => outcome,
        Err(err) => {
            if let CheckError::ToolFailed {
                tool: "unpacker", ..
            }
            | CheckError::Launch {
                tool: "unpacker", ..
            }
            | CheckError::Timeout {
                tool: "unpacker", ..
            } = &err
            {
                tracing::error!("unpacking failed, check the unpacker script");
            }
            return Err(err.into());
        }
    };

    match outcome {
        CheckOutcome::Skipped { target, policy } => {
            tracing::warn!(
                name = %target,
                policy = %policy.display(),
                "skipped, policy file does not exist"
            );
            Ok(())
        }
        CheckOutcome::Completed(report) => {
            let rendered = report.render().context("serialize report")?;
            match &args.report {
                Some(path) => {
                    std::fs::write(path, &rendered)
                        .with_context(|| format!("write report to '{}'", path.display()))?;
                    tracing::info!(path = %path.display(), "report written");
                }
                None => println!("{rendered}"),
            }
            if report.passed {
                tracing::info!("firmware analysis: checks passed");
                Ok(())
            } else {
                tracing::error!("firmware analysis: checks failed");
                std::process::exit(1);
            }
        }
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();
}
