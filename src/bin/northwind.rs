use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use northwind_loader::util::{env, logging};

#[derive(Parser, Debug)]
#[command(name = "northwind", version, about = "Northwind export loader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Drop and re-create a database, then run seed scripts against it
    ResetDb {
        /// Connection used for DROP/CREATE DATABASE (defaults to env)
        #[arg(long)]
        db_url: Option<String>,
        /// Name of the database to recreate
        #[arg(long)]
        database: String,
        /// Seed script to run after creation (repeatable)
        #[arg(long = "script")]
        scripts: Vec<PathBuf>,
        /// Confirm that the database and everything in it may be destroyed
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Execute SQL script files against the configured database
    RunScript {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Schema to put first on the search_path
        #[arg(long)]
        schema: Option<String>,
        #[arg(required = true)]
        scripts: Vec<PathBuf>,
    },
    /// Copy <table>_data.csv files into existing tables
    LoadCsv {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Schema to put first on the search_path
        #[arg(long)]
        schema: Option<String>,
        /// Directory with the csv exports
        #[arg(long, default_value = "north_data")]
        dir: PathBuf,
        /// Comma-separated tables to load (default: employees,customers,orders)
        #[arg(long, value_delimiter = ',')]
        tables: Option<Vec<String>>,
    },
    /// Reset the suppliers table, load the supplier JSON export and link products
    Suppliers {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Schema to put first on the search_path
        #[arg(long)]
        schema: Option<String>,
        /// Supplier export (JSON array)
        #[arg(long, default_value = "suppliers.json")]
        file: PathBuf,
        /// Load suppliers without linking the products table
        #[arg(long, default_value_t = false)]
        skip_backfill: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    logging::init_tracing(logging::DEFAULT_FILTER)?;
    env::bootstrap_cli("northwind");

    let cli = Cli::parse();

    match cli.command {
        Commands::ResetDb {
            db_url,
            database,
            scripts,
            yes,
        } => {
            use northwind_loader::cli::reset_db::{run, ResetDbConfig};
            run(ResetDbConfig {
                database_url: db_url,
                database,
                scripts,
                confirm: yes,
            })
            .await?;
        }
        Commands::RunScript {
            db_url,
            schema,
            scripts,
        } => {
            use northwind_loader::cli::run_script::{run, RunScriptConfig};
            run(RunScriptConfig {
                database_url: db_url,
                schema,
                scripts,
            })
            .await?;
        }
        Commands::LoadCsv {
            db_url,
            schema,
            dir,
            tables,
        } => {
            use northwind_loader::cli::csv_import::{run, CsvImportConfig};
            let tables = tables.map(|vals| {
                vals.into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            });
            run(CsvImportConfig {
                database_url: db_url,
                schema,
                dir,
                tables,
            })
            .await?;
        }
        Commands::Suppliers {
            db_url,
            schema,
            file,
            skip_backfill,
        } => {
            use northwind_loader::cli::suppliers::{run, SupplierIngestConfig};
            run(SupplierIngestConfig {
                database_url: db_url,
                schema,
                file,
                skip_backfill,
            })
            .await?;
        }
    }
    Ok(())
}
