use clap::{Parser, Subcommand};
use sheetpipe_config::AppConfig;
use sheetpipe_core::{Pipeline, RunContext, TableSchema};
use sheetpipe_gsheets_destination::GsheetsLoader;
use sheetpipe_mongo_source::MongoExtractor;
use sheetpipe_staging::FileStaging;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "sheetpipe")]
#[command(about = "MongoDB to Google Sheets export pipeline", long_about = None)]
struct Cli {
    /// Path to configuration directory
    #[arg(short, long, default_value = "config", global = true)]
    config_dir: String,

    /// Run id; defaults to $SHEETPIPE_RUN_ID or a generated one
    #[arg(long, global = true)]
    run_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query MongoDB and stage the result table (scheduler task 1)
    Extract,

    /// Write the staged table to the spreadsheet (scheduler task 2)
    Load,

    /// Run both tasks in order within this process
    Run,

    /// Validate configuration files
    Validate,
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let level = match config.logging.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder().with_max_level(level);
    if config.logging.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn build_pipeline(config: &AppConfig) -> Pipeline {
    Pipeline::new(
        Box::new(MongoExtractor::new(config.source.clone())),
        Box::new(GsheetsLoader::new(config.destination.clone())),
        Box::new(FileStaging::new(config.staging.dir.clone())),
        TableSchema::user_export(),
    )
}

fn run_context(cli: &Cli) -> RunContext {
    match &cli.run_id {
        Some(id) => RunContext::new(id.clone()),
        None => RunContext::from_env(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Extract => {
            let config = AppConfig::load(&cli.config_dir)?;
            init_tracing(&config)?;
            config.validate()?;

            let run = run_context(&cli);
            build_pipeline(&config).run_extract(&run).await?;
        }

        Commands::Load => {
            let config = AppConfig::load(&cli.config_dir)?;
            init_tracing(&config)?;
            config.validate()?;

            let run = run_context(&cli);
            build_pipeline(&config).run_load(&run).await?;
        }

        Commands::Run => {
            let config = AppConfig::load(&cli.config_dir)?;
            init_tracing(&config)?;
            config.validate()?;

            let run = run_context(&cli);
            info!("Running extract and load in-process (run {})", run.run_id());
            build_pipeline(&config).run(&run).await?;
        }

        Commands::Validate => {
            let config = AppConfig::load(&cli.config_dir)?;

            match config.validate() {
                Ok(()) => {
                    println!("✓ Configuration is valid");
                    println!(
                        "  source:      {}.{} ({})",
                        config.source.database,
                        config.source.collection,
                        if config.source.exclude_id_pattern.is_empty() {
                            "no id exclusion".to_string()
                        } else {
                            format!("excluding ids matching '{}'", config.source.exclude_id_pattern)
                        }
                    );
                    println!(
                        "  destination: spreadsheet {} (first worksheet)",
                        config.destination.spreadsheet_id
                    );
                    println!("  staging:     {}", config.staging.dir);
                }
                Err(e) => {
                    println!("✗ Configuration is invalid: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
