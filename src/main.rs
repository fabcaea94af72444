//! Command-line interface for mongo-fixtures
//!
//! # Usage Examples
//!
//! ## Seed
//! ```bash
//! # Load class-level fixtures only
//! mongo-fixtures seed --plan tests/resources/plan.yaml \
//!   --uri mongodb://localhost:27017/app
//!
//! # Prepare a single test method (cleanup first if it asks for it)
//! mongo-fixtures seed --plan tests/resources/plan.yaml --method lists_people \
//!   --uri mongodb://localhost:27017 --database app
//! ```
//!
//! ## Clean
//! ```bash
//! # Delete all documents and GridFS buckets outside admin/config/local
//! mongo-fixtures clean --uri mongodb://localhost:27017
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mongo_fixtures::{
    FixtureListener, FixturePlan, MongoStore, ResourceLoader, TestClass, TestContext,
    DATABASE_KEY, URI_KEY,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mongo-fixtures")]
#[command(about = "Seed MongoDB with test fixtures and clean them up again")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct ConnectionOpts {
    /// MongoDB connection string
    #[arg(
        long,
        global = true,
        default_value = "mongodb://localhost:27017",
        env = "MONGODB_URI"
    )]
    uri: String,

    /// Database for fixtures that do not name one (overrides the URI's database)
    #[arg(long, global = true, env = "MONGODB_DATABASE")]
    database: Option<String>,
}

impl ConnectionOpts {
    fn config(&self) -> BTreeMap<String, String> {
        let mut config = BTreeMap::new();
        config.insert(URI_KEY.to_string(), self.uri.clone());
        if let Some(database) = &self.database {
            config.insert(DATABASE_KEY.to_string(), database.clone());
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load the fixtures of a plan file
    Seed {
        /// Path to fixture plan YAML file
        #[arg(long, short = 'p')]
        plan: PathBuf,

        /// Test method to prepare (default: class-level fixtures only)
        #[arg(long, short = 'm')]
        method: Option<String>,

        /// Directory resource paths resolve against (default: the plan's directory)
        #[arg(long)]
        resource_root: Option<PathBuf>,
    },
    /// Delete all documents and drop all GridFS buckets
    Clean,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.connection.config();
    let store = MongoStore::connect(&cli.connection.uri)
        .await
        .context("Failed to connect to MongoDB")?;
    let mut listener = FixtureListener::new();

    match cli.command {
        Commands::Seed {
            plan: plan_path,
            method,
            resource_root,
        } => {
            let plan = FixturePlan::from_file(&plan_path)
                .with_context(|| format!("Failed to load fixture plan from {plan_path:?}"))?;
            let root = resource_root.unwrap_or_else(|| {
                plan_path
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_default()
            });
            let resources = ResourceLoader::new(root);
            tracing::debug!("Resolving resources under {}", resources.root().display());

            let mut context = TestContext::new(&plan.class, &config, &store, &resources);
            if let Some(name) = &method {
                context = context.for_method(plan.method(name)?);
            }

            let report = match listener.before_test_method(&context).await {
                Ok(report) => report,
                Err(e) if e.is_configuration() => {
                    anyhow::bail!("{e} Pass --database or include a database in --uri.")
                }
                Err(e) => return Err(e).context("Failed to prepare fixtures"),
            };
            tracing::info!(
                "Seeded {} documents and {} files ({} bytes)",
                report.documents_inserted,
                report.files_uploaded,
                report.bytes_uploaded
            );
        }
        Commands::Clean => {
            let class = TestClass::new("mongo-fixtures");
            let resources = ResourceLoader::new(".");
            let context = TestContext::new(&class, &config, &store, &resources);
            let report = listener
                .cleanup(&context)
                .await
                .context("Failed to clean up fixtures")?;
            tracing::info!(
                "Cleaned {} databases: {:?}",
                report.databases.len(),
                report.databases
            );
        }
    }

    Ok(())
}
