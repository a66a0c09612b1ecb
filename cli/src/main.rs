use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use etlwatch::config::{self, ConfigError, Environment};
use etlwatch::mail::{ConsoleMailer, MailError, Mailer, Notifier, SmtpMailer};
use etlwatch::source::{EtlJobLog, SsisCatalog};
use etlwatch::{EnvConfig, Outcome, RunOptions, Settings};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

#[derive(Parser)]
#[command(name = "etlwatch", about = "Mail newly logged ETL failures to operations")]
struct Cli {
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbosity: u8,

    /// Deployment root holding `config/config.properties` [env: ROOT_DIR]
    #[arg(long)]
    root_dir: Option<PathBuf>,

    /// Properties file, instead of the one under the root directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the email instead of sending it
    #[arg(long, global = true, default_value_t = false)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Latest error in the orchestration catalog
    #[command(alias = "cubo")]
    Catalog {
        /// Keep a copy of the report under the root directory while sending
        #[arg(long)]
        report_file: bool,
    },
    /// Warehouse and staging errors of the latest job
    #[command(alias = "pentaho")]
    Jobs {
        /// Do not write the report file under the root directory
        #[arg(long)]
        no_report_file: bool,

        /// Inspect this job instead of the latest one
        #[arg(long, value_name = "JOBID")]
        job_id: Option<i64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("could not initialise logging: {e}");
    }

    match run(cli).await {
        Ok(outcome) => {
            log::debug!("run finished: {:?}", outcome);
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    dotenvy::dotenv().ok();

    let root = match cli.root_dir {
        Some(dir) => dir,
        None => Environment::from_env()
            .map_err(ConfigError::from)
            .context("reading environment")?
            .root_dir(),
    };
    let properties = cli
        .config
        .unwrap_or_else(|| config::properties_path(&root));
    log::debug!("loading configuration from {}", properties.display());

    let settings = Settings::load(&properties).context("loading configuration")?;

    let options = match &cli.command {
        Commands::Catalog { report_file } => RunOptions {
            report_path: report_file.then(|| config::report_path(&root)),
            job_id: None,
        },
        Commands::Jobs {
            no_report_file,
            job_id,
        } => RunOptions {
            report_path: (!no_report_file).then(|| config::report_path(&root)),
            job_id: *job_id,
        },
    };

    if cli.dry_run {
        let options = RunOptions {
            report_path: None,
            ..options
        };
        execute(&cli.command, &settings, ConsoleMailer, &options).await
    } else {
        let mailer = SmtpMailer::from_config(&settings.mail).context("configuring SMTP")?;
        execute(&cli.command, &settings, mailer, &options).await
    }
}

async fn execute<M: Mailer>(
    command: &Commands,
    settings: &Settings,
    mailer: M,
    options: &RunOptions,
) -> Result<Outcome> {
    let notifier = Notifier::new(mailer, &settings.mail);
    let outcome = match command {
        Commands::Catalog { .. } => {
            let source = SsisCatalog::new(settings.warehouse.clone());
            etlwatch::run_catalog(&source, &notifier, options).await?
        }
        Commands::Jobs { .. } => {
            let source = EtlJobLog::from_settings(settings);
            etlwatch::run_job_log(&source, &notifier, options).await?
        }
    };
    Ok(outcome)
}

/// Configuration problems exit 2, anything else 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    let configuration = err.chain().any(|cause| {
        cause.is::<ConfigError>() || cause.is::<MailError>()
    });
    if configuration {
        return 2;
    }
    err.chain()
        .find_map(|cause| cause.downcast_ref::<etlwatch::Error>())
        .map(etlwatch::Error::exit_code)
        .unwrap_or(1)
}
