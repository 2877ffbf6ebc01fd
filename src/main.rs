use anyhow::Result;
use asg_unprotect::aws::AwsManager;
use asg_unprotect::config::Config;
use asg_unprotect::logging::{init_logging, StructuredLogger, TracingAdvisorySink};
use asg_unprotect::classifier::ClassificationResult;
use asg_unprotect::{RunOptions, RunReport, UnprotectError, Updater};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "asg-unprotect")]
#[command(about = "Remove scale-in protection from Auto Scaling Group instances running an outdated launch template version")]
#[command(version)]
struct Cli {
    /// The ASG to update
    #[arg(long)]
    asg: String,

    /// If set updates are not actually performed
    #[arg(long)]
    dry_run: bool,

    /// Remove protection even when no instance runs the latest version
    #[arg(long)]
    force: bool,

    /// Print up-to-date instance IDs to stdout
    #[arg(long)]
    output_latest_instances: bool,

    /// Print out-of-date instance IDs to stdout
    #[arg(long)]
    output_invalid_instances: bool,

    /// Remove already unprotected old instances from the ASG's target groups as well
    #[arg(long)]
    deregister_from_target_groups: bool,

    /// The minimum log level to output
    #[arg(long, value_enum, ignore_case = true)]
    log_level: Option<LogLevel>,

    /// Configuration file path (JSON or TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// AWS profile to use
    #[arg(short, long)]
    profile: Option<String>,

    /// AWS region
    #[arg(long)]
    region: Option<String>,

    /// Instance IDs per SetInstanceProtection call (1-50)
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Cli {
    /// Flags take precedence over the config file and environment
    fn apply_to(&self, config: &mut Config) {
        if let Some(level) = self.log_level {
            config.logging.level = level.as_str().to_string();
        }
        if let Some(profile) = &self.profile {
            config.aws.profile = Some(profile.clone());
        }
        if let Some(region) = &self.region {
            config.aws.region = Some(region.clone());
        }
        if let Some(batch_size) = self.batch_size {
            config.protection.batch_size = batch_size;
        }
    }

    fn run_options(&self, config: &Config) -> RunOptions {
        RunOptions {
            asg: self.asg.clone(),
            dry_run: self.dry_run,
            force: self.force,
            deregister_from_target_groups: self.deregister_from_target_groups,
            batch_size: config.protection.batch_size,
        }
    }

    fn print_requested_ids(&self, classification: &ClassificationResult) {
        if self.output_latest_instances {
            for id in &classification.latest_ids {
                println!("{}", id);
            }
        }
        if self.output_invalid_instances {
            for id in &classification.outdated_ids {
                println!("{}", id);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    cli.apply_to(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {:#}", e);
        std::process::exit(1);
    }

    // Held until exit so buffered file records are flushed
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(anyhow::anyhow!("Failed to initialize logging: {}", e));
        }
    };

    info!("Starting asg-unprotect v{}", env!("CARGO_PKG_VERSION"));

    let aws = AwsManager::new(config.aws.region.clone(), config.aws.profile.clone()).await;
    debug!("Using AWS region {}", aws.region());

    let sink = TracingAdvisorySink;
    let options = cli.run_options(&config);

    match update(&cli, &Updater::new(&aws, &sink), &options).await {
        Ok(report) => {
            debug!(
                "{}: {} batches, {} instances",
                report.asg,
                report.execution.batches.len(),
                report.execution.instances
            );
            Ok(())
        }
        Err(e) => {
            report_failure(&e);
            std::process::exit(1);
        }
    }
}

/// ID lists are printed before any mutating call, so they survive a failed batch
async fn update(
    cli: &Cli,
    updater: &Updater<'_>,
    options: &RunOptions,
) -> asg_unprotect::Result<RunReport> {
    let group = updater.classify_group(&options.asg).await?;
    cli.print_requested_ids(&group.classification);
    updater.apply(group, options).await
}

fn report_failure(error: &UnprotectError) {
    StructuredLogger::log_error(error, "update");
    eprintln!("error updating: {}", error.user_message());
}
