//! `csdk-release-verify`: pre-release checks for the CSDK.
//!
//! Reads `tools/release/config.yml` and `manifest.yml` under `--root`, then
//! verifies the manifest, commit statuses, CI jobs, branches and pull
//! requests. Every failure is written to the error log.
//!
//! Exit codes: `0` all checks passed, `1` verification failed, `2` the run
//! could not start (bad configuration, missing credential, unwritable log).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use csdk_release_core::config::{config_path, manifest_path};
use csdk_release_core::{
    write_docs_review, Credentials, ErrorLog, GitHubClient, JenkinsClient, Manifest,
    ReleaseConfig, ReleaseVerifier, Verdict, ERROR_LOG_FILE,
};

#[derive(Parser, Debug)]
#[command(name = "csdk-release-verify")]
#[command(author = "CSDK Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify that every CSDK repository is ready for release", long_about = None)]
struct Cli {
    /// CSDK root containing manifest.yml and tools/release/config.yml
    #[arg(short, long)]
    root: PathBuf,

    /// Skip TLS certificate verification for the Jenkins server
    #[arg(long)]
    disable_jenkins_server_verify: bool,

    /// Where to write validation errors (truncated every run)
    #[arg(long, default_value = ERROR_LOG_FILE)]
    error_log: PathBuf,

    /// Write README/CHANGELOG links of every pinned library to this Markdown file
    #[arg(long)]
    docs_review: Option<PathBuf>,

    /// Write the full verification report to this JSON file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    csdk_release_core::telemetry::init_tracing(cli.json, level);

    match run(&cli).await {
        Ok(Verdict::Pass) => ExitCode::SUCCESS,
        Ok(Verdict::Fail) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Load inputs from `root`, failing on the first configuration problem.
fn load_inputs(root: &Path) -> Result<(ReleaseConfig, Manifest)> {
    let config = ReleaseConfig::load(&config_path(root)).context("Failed to load release config")?;
    let manifest = Manifest::load(&manifest_path(root)).context("Failed to load manifest")?;
    Ok((config, manifest))
}

async fn run(cli: &Cli) -> Result<Verdict> {
    info!(
        version = csdk_release_core::VERSION,
        root = %cli.root.display(),
        "csdk-release-verify starting"
    );
    // A run that stops on a configuration error still leaves an empty log.
    let mut log = ErrorLog::create(&cli.error_log)
        .with_context(|| format!("Failed to create error log {:?}", cli.error_log))?;
    let (config, manifest) = load_inputs(&cli.root)?;
    let credentials = Credentials::from_env(&config, cli.disable_jenkins_server_verify)
        .context("Failed to resolve credentials")?;

    let target = config.target.clone();
    let github = GitHubClient::new(&target.github_api_url, &credentials.github_token)
        .context("Failed to set up the GitHub client")?;
    let jenkins = JenkinsClient::new(
        &target.jenkins_url,
        &credentials.jenkins_username,
        &credentials.jenkins_password,
        credentials.verify_ci_tls,
    )
    .context("Failed to set up the Jenkins client")?;

    let verifier = ReleaseVerifier::new(Arc::new(github), Arc::new(jenkins), target);
    let report = verifier.verify(&config, &manifest, &mut log).await;

    if let Some(path) = &cli.docs_review {
        write_docs_review(path, &report.libraries)
            .with_context(|| format!("Failed to write documentation review {:?}", path))?;
        info!(path = %path.display(), libraries = report.libraries.len(), "wrote documentation review");
    }
    if let Some(path) = &cli.report {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report {:?}", path))?;
    }

    for notice in &report.notices {
        println!("note: {notice}");
    }
    println!("{}", report.summary_line(&cli.error_log.display().to_string()));
    Ok(report.verdict)
}
