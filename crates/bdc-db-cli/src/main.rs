//! bdc-db CLI - database management for Brazil Data Cube applications.

use bdc_db::{ops, BrazilDataCubeDb, Db, DbError, Settings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "bdc-db")]
#[command(about = "Database management for Brazil Data Cube applications and services")]
#[command(version)]
struct Cli {
    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    #[command(subcommand)]
    Db(DbCommands),
}

#[derive(Subcommand)]
enum DbCommands {
    /// Create the database repository
    Init,

    /// Drop the database repository
    Destroy {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Create all tables in foreign-key dependency order
    CreateSchema {
        /// Print each created table
        #[arg(short, long)]
        verbose: bool,
    },

    /// Drop all tables in reverse dependency order
    DropSchema {
        /// Print each dropped table
        #[arg(short, long)]
        verbose: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Create the registered namespaces (database schemas)
    CreateNamespaces,

    /// List the registered namespaces
    ShowNamespaces,

    /// Enable the PostGIS extension in the database
    CreateExtensionPostgis,

    /// List the trigger files registered by providers
    ShowTriggers,

    /// Execute every registered trigger file
    CreateTriggers {
        /// Print the content of each executed file
        #[arg(short, long)]
        verbose: bool,
    },

    /// Drop the database triggers matching the registered trigger files
    DropTriggers {
        /// Report the matching triggers without dropping them
        #[arg(long)]
        preview: bool,
    },

    /// Execute every registered script file
    LoadScripts {
        /// Print the content of each executed file
        #[arg(short, long)]
        verbose: bool,
    },

    /// Execute a SQL file
    LoadFile {
        /// A SQL input file to execute
        #[arg(short, long)]
        file: PathBuf,

        /// Print the file content
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), DbError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| DbError::Config(e.to_string()))?;

    let settings = Settings::from_env()?;
    let ext = BrazilDataCubeDb::new(settings.clone())?;

    let Commands::Db(command) = cli.command;
    match command {
        DbCommands::Init => {
            println!("Creating database {}...", bdc_db::db::database_name(&settings)?);
            ops::init(&ext).await?;
            println!("Database created!");
        }

        DbCommands::Destroy { force } => {
            if !force && !confirm("Are you sure you want to drop the db?")? {
                return Err(DbError::Aborted);
            }
            println!("Dropping database {}...", bdc_db::db::database_name(&settings)?);
            ops::destroy(&ext).await?;
            println!("Database dropped!");
        }

        DbCommands::CreateSchema { verbose } => {
            if !bdc_db::db::database_exists(&settings).await? {
                println!("Database repository does not exist. Use 'db init' before!");
                return Ok(());
            }
            println!("Creating database schema...");
            let db = Db::connect(&settings).await?;
            let created = ops::create_schema(&db, &ext).await?;
            if verbose {
                for table in &created {
                    println!("\tCreating table {}", table);
                }
            }
            println!("Database schema created!");
        }

        DbCommands::DropSchema { verbose, force } => {
            if !force
                && !confirm(
                    "Are you sure you want to drop the database schema (all data will be lost)?",
                )?
            {
                return Err(DbError::Aborted);
            }
            println!("Dropping database schema...");
            let db = Db::connect(&settings).await?;
            let dropped = ops::drop_schema(&db, &ext).await?;
            if verbose {
                for table in &dropped {
                    println!("\tDropping table {}", table);
                }
            }
            println!("Database schema dropped!");
        }

        DbCommands::CreateNamespaces => {
            let db = Db::connect(&settings).await?;
            for namespace in ext.namespaces() {
                println!("Creating namespace {}...", namespace);
            }
            ops::create_namespaces(&db, &ext).await?;
            println!("Namespaces created!");
        }

        DbCommands::ShowNamespaces => {
            if ext.namespaces().is_empty() {
                println!("No namespace available.");
            }
            for namespace in ext.namespaces() {
                println!("\t-> {}", namespace);
            }
        }

        DbCommands::CreateExtensionPostgis => {
            println!("Creating extension postgis...");
            let db = Db::connect(&settings).await?;
            ops::create_extension_postgis(&db).await?;
            println!("Extension created!");
        }

        DbCommands::ShowTriggers => {
            if ext.triggers().is_empty() {
                println!("No trigger available.");
            }
            for (provider, entries) in ext.triggers() {
                println!("Available triggers in \"{}\"", provider);
                for path in entries.values() {
                    println!("\t-> {}", path.display());
                }
            }
        }

        DbCommands::CreateTriggers { verbose } => {
            if ext.triggers().is_empty() {
                println!("No trigger configured.");
                return Ok(());
            }
            let db = Db::connect(&settings).await?;
            let applied = ops::create_triggers(&db, &ext).await?;
            report_artifacts(&applied, verbose)?;
            println!("Triggers registered!");
        }

        DbCommands::DropTriggers { preview } => {
            if ext.triggers().is_empty() {
                println!("No trigger available.");
                return Ok(());
            }
            let db = Db::connect(&settings).await?;
            let matched = ops::drop_triggers(&db, &ext, preview).await?;
            for trigger in &matched {
                if preview {
                    println!(
                        "The trigger \"{}\" on \"{}.{}\" matches.",
                        trigger.trigger_name, trigger.schema, trigger.table_name
                    );
                } else {
                    println!("The trigger \"{}\" was removed.", trigger.trigger_name);
                }
            }
            if matched.is_empty() {
                println!("No trigger to remove.");
            }
        }

        DbCommands::LoadScripts { verbose } => {
            if ext.scripts().is_empty() {
                println!("No scripts configured.");
                return Ok(());
            }
            let db = Db::connect(&settings).await?;
            let applied = ops::load_scripts(&db, &ext).await?;
            report_artifacts(&applied, verbose)?;
            println!("Scripts executed!");
        }

        DbCommands::LoadFile { file, verbose } => {
            println!("Loading file {}...", file.display());
            if verbose {
                println!("{}", std::fs::read_to_string(&file)?);
            }
            let db = Db::connect(&settings).await?;
            ops::load_file(&db, &file).await?;
            println!("File {} loaded!", file.display());
        }
    }

    Ok(())
}

fn report_artifacts(applied: &[ops::AppliedArtifact], verbose: bool) -> Result<(), DbError> {
    for artifact in applied {
        println!("\t-> {}", artifact.path.display());
        if verbose {
            println!("{}", std::fs::read_to_string(&artifact.path)?);
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, DbError> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| DbError::Config(format!("confirmation prompt failed: {}", e)))
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
