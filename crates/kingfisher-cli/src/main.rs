use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use kingfisher_adapter_pg::{Session, SessionOptions};
use kingfisher_core::KingfisherConfig;

mod commands;

/// Read when `--config` is not given and the file exists.
const DEFAULT_CONFIG_FILE: &str = "kingfisher.yaml";

#[derive(Parser, Debug)]
#[command(name = "kingfisher", version, about = "Query and export OCDS data from a Kingfisher database")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug, Default)]
struct GlobalArgs {
    /// Configuration file (defaults to ./kingfisher.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database URL, overriding the configured upstream
    #[arg(long, global = true, env = "KINGFISHER_DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Schema to put in front of `public` on the search path
    #[arg(long, global = true)]
    search_path: Option<String>,

    /// Notebook ID to tag statements with
    #[arg(long, global = true)]
    notebook_id: Option<String>,

    /// Directory for downloaded files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query and print, download or save its results.
    Query(commands::query::QueryArgs),

    /// Measure how often fields are populated in a summary table.
    Coverage(commands::coverage::CoverageArgs),

    /// List source IDs containing a pattern.
    SourceIds {
        /// Case-insensitive substring; empty lists every source
        #[arg(default_value = "")]
        pattern: String,
    },

    /// List collections, newest first.
    Collections {
        /// Only collections of this source
        source_id: Option<String>,
    },

    /// Download a release or record package.
    Package {
        #[command(subcommand)]
        cmd: commands::package::PackageCommand,
    },

    /// Flatten the release package returned by a query into a workbook and upload it.
    Flatten(commands::flatten::FlattenArgs),

    /// Set the search path and show it.
    SetSearchPath {
        schema: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.global)?;
    let session = connect(&config).await?;

    match cli.cmd {
        Command::Query(args) => commands::query::run(&session, &config, args).await?,
        Command::Coverage(args) => commands::coverage::run(&session, &config, args).await?,
        Command::SourceIds { pattern } => {
            let table = session.list_source_ids(&pattern).await?;
            println!("{}", table);
        }
        Command::Collections { source_id } => {
            let table = session.list_collections(source_id.as_deref()).await?;
            println!("{}", table);
        }
        Command::Package { cmd } => commands::package::run(&session, &config, cmd).await?,
        Command::Flatten(args) => commands::flatten::run(&session, &config, args).await?,
        Command::SetSearchPath { schema } => {
            session.set_search_path(&schema).await?;
            let rows = session.get_list_from_query("SHOW search_path", &[]).await?;
            if let Some(path) = rows.first().and_then(|row| row.first()) {
                println!("{}", kingfisher_core::frame::cell_text(path));
            }
        }
    }

    Ok(())
}

/// Load the configuration file and apply command-line overrides.
fn load_config(global: &GlobalArgs) -> Result<KingfisherConfig> {
    let mut config = match &global.config {
        Some(path) => read_config(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => read_config(Path::new(DEFAULT_CONFIG_FILE))?,
        None => KingfisherConfig::default(),
    };

    if let Some(url) = &global.database_url {
        config.upstream.database_url_env = None;
        config.upstream.database_url = Some(url.clone());
    }
    if let Some(schema) = &global.search_path {
        config.session.search_path = Some(schema.clone());
    }
    if let Some(id) = &global.notebook_id {
        config.session.notebook_id = Some(id.clone());
    }
    if let Some(dir) = &global.output_dir {
        config.export.output_dir = dir.clone();
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<KingfisherConfig> {
    let config = KingfisherConfig::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

async fn connect(config: &KingfisherConfig) -> Result<Session> {
    Session::connect(&config.upstream, SessionOptions::from(&config.session))
        .await
        .with_context(|| format!("Failed to connect to {}", config.upstream.redacted()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_coverage() {
        let cli = Cli::try_parse_from([
            "kingfisher",
            "coverage",
            "--scope",
            "awards_summary",
            ":date",
            "ALL :items/description",
        ])
        .unwrap();
        let Command::Coverage(args) = cli.cmd else {
            panic!("expected coverage");
        };
        assert_eq!(args.scope.as_deref(), Some("awards_summary"));
        assert_eq!(args.fields, vec![":date", "ALL :items/description"]);
    }

    #[test]
    fn test_cli_requires_coverage_fields() {
        assert!(Cli::try_parse_from(["kingfisher", "coverage"]).is_err());
    }

    #[test]
    fn test_load_config_with_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kingfisher.yaml");
        fs::write(
            &path,
            "upstream:\n  database_url_env: KINGFISHER_TEST_URL\nsession:\n  search_path: view_data_a\n",
        )
        .unwrap();

        let global = GlobalArgs {
            config: Some(path),
            database_url: Some("postgresql://localhost/kingfisher".to_string()),
            search_path: Some("view_data_b".to_string()),
            ..Default::default()
        };
        let config = load_config(&global).unwrap();

        assert_eq!(config.upstream.database_url_env, None);
        assert_eq!(config.upstream.connection_string(), "postgresql://localhost/kingfisher");
        assert_eq!(config.session.search_path.as_deref(), Some("view_data_b"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let global = GlobalArgs {
            config: Some(PathBuf::from("/nonexistent/kingfisher.yaml")),
            ..Default::default()
        };
        let err = load_config(&global).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
