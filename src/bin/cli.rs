use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use keyword_actions::prelude::*;
use keyword_actions::workflow::{BrowserType, PlaywrightConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keyword-actions")]
#[command(about = "Run keyword-driven test suites", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a suite
    Run {
        #[command(flatten)]
        inputs: Inputs,

        /// Write the suite result as JSON to this file
        #[arg(short, long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Load a suite and check it without running anything
    Validate {
        #[command(flatten)]
        inputs: Inputs,
    },
}

#[derive(clap::Args)]
struct Inputs {
    /// Path to the suite YAML/JSON file
    #[arg(value_name = "SUITE")]
    suite: PathBuf,

    /// Engine configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment to select from the configuration
    #[arg(short, long)]
    env: Option<String>,

    /// Browser override (chromium, firefox, webkit)
    #[arg(short, long)]
    browser: Option<String>,

    /// Locator repository (default: <suite dir>/locators.yaml)
    #[arg(short, long)]
    locators: Option<PathBuf>,

    /// Flows directory (default: <suite dir>/flows)
    #[arg(short, long)]
    flows: Option<PathBuf>,
}

/// Everything a run needs, loaded from disk
struct Loaded {
    config: EngineConfig,
    suite: Suite,
    locators: LocatorRepository,
    flows: std::collections::HashMap<String, Vec<Step>>,
}

impl Inputs {
    fn load(&self) -> anyhow::Result<Loaded> {
        if !self.suite.exists() {
            anyhow::bail!("Suite file not found: {}", self.suite.display());
        }
        let base = self.suite.parent().unwrap_or_else(|| Path::new("."));

        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        config.select_environment(self.env.as_deref());
        if let Some(name) = &self.browser {
            let browser = parse_browser(name)?;
            config
                .platforms
                .playwright
                .get_or_insert_with(PlaywrightConfig::default)
                .browser = browser;
        }

        let suite = SuiteLoader::load_suite(&self.suite)?;
        let locators_path = self
            .locators
            .clone()
            .unwrap_or_else(|| base.join("locators.yaml"));
        let locators = SuiteLoader::load_locators(&locators_path)?;
        let flows_dir = self.flows.clone().unwrap_or_else(|| base.join("flows"));
        let flows = SuiteLoader::load_flows_dir(&flows_dir)?;
        SuiteLoader::check_flow_names(flows.keys(), &suite.test_case_ids())?;

        tracing::info!(
            cases = suite.testcases.len(),
            locators = locators.len(),
            flows = flows.len(),
            "Loaded suite"
        );
        Ok(Loaded {
            config,
            suite,
            locators,
            flows,
        })
    }
}

fn parse_browser(name: &str) -> anyhow::Result<BrowserType> {
    match name.trim().to_lowercase().as_str() {
        "chromium" | "chrome" => Ok(BrowserType::Chromium),
        "firefox" => Ok(BrowserType::Firefox),
        "webkit" | "safari" => Ok(BrowserType::Webkit),
        other => anyhow::bail!("Unknown browser: {}", other),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "keyword_actions=debug"
    } else {
        "keyword_actions=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run { inputs, report } => run_suite(inputs, report).await,
        Commands::Validate { inputs } => validate(inputs),
    }
}

#[tracing::instrument(skip_all, fields(suite = %inputs.suite.display()))]
async fn run_suite(inputs: Inputs, report: Option<PathBuf>) -> anyhow::Result<bool> {
    let Loaded {
        config,
        suite,
        locators,
        flows,
    } = inputs.load()?;

    println!("Running suite: {}\n", inputs.suite.display());

    let surface = Arc::new(SessionSurface::start(&config).await?);
    let mut executor = Executor::new(config, surface.clone())
        .with_locators(locators)
        .with_flows(flows);

    let cancel = executor.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, cancelling run");
            cancel.cancel();
        }
    });

    let result = executor.run_suite(&suite).await;

    if let Err(e) = surface.shutdown().await {
        tracing::warn!(error = %e, "Browser did not close cleanly");
    }

    print_suite_result(&result);

    if let Some(path) = report {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(result.success())
}

fn validate(inputs: Inputs) -> anyhow::Result<bool> {
    let loaded = inputs.load()?;
    let executor = Executor::new(loaded.config, Arc::new(keyword_actions::bridge::NullSurface))
        .with_locators(loaded.locators)
        .with_flows(loaded.flows);

    let problems = executor.validate(&loaded.suite);
    if problems.is_empty() {
        println!(
            "✓ {} is valid ({} test cases)",
            inputs.suite.display(),
            loaded.suite.testcases.len()
        );
        return Ok(true);
    }

    println!("✗ {} has {} problem(s):", inputs.suite.display(), problems.len());
    for problem in &problems {
        println!("  - {}", problem);
    }
    Ok(false)
}

fn print_suite_result(result: &SuiteResult) {
    println!("\n=== Suite Result ===\n");
    println!("Success: {}", if result.success() { "YES" } else { "NO" });
    println!("Run ID: {}\n", result.run_id);

    for case in &result.cases {
        let status = match case.status {
            CaseStatus::Passed => "✓",
            CaseStatus::Failed => "✗",
            CaseStatus::Skipped => "-",
        };
        println!("{} {} ({} ms)", status, case.id, case.duration_ms);
        if let Some(step) = &case.failed_step {
            println!("      Step: {}", step);
        }
        if let Some(cause) = &case.root_cause {
            println!("      Error: {}", cause);
        }
        if let Some(path) = &case.screenshot {
            println!("      Screenshot: {}", path.display());
        }
    }

    println!(
        "\nPassed: {}  Failed: {}  Skipped: {}",
        result.passed(),
        result.failed(),
        result.skipped()
    );
    if result.cancelled {
        println!("\n=== Run cancelled ===");
    }
}
