//! `kingfisher package`: download OCDS packages.

use anyhow::Result;
use clap::Subcommand;

use kingfisher_adapter_pg::Session;
use kingfisher_core::KingfisherConfig;
use kingfisher_export::{download_package_from_ocid, download_package_from_query, DirectorySink};

#[derive(Subcommand, Debug)]
pub enum PackageCommand {
    /// Package the releases of one OCID in one collection.
    Ocid {
        collection_id: i64,
        ocid: String,
        /// `release` or `record`
        #[arg(long = "type", default_value = "release")]
        package_type: String,
    },

    /// Package the `data` column of a query.
    Query {
        sql: String,
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,
        /// `release` or `record`
        #[arg(long = "type", default_value = "release")]
        package_type: String,
    },
}

pub async fn run(session: &Session, config: &KingfisherConfig, cmd: PackageCommand) -> Result<()> {
    let sink = DirectorySink::new(&config.export.output_dir);
    let path = match cmd {
        PackageCommand::Ocid {
            collection_id,
            ocid,
            package_type,
        } => download_package_from_ocid(session, collection_id, &ocid, &package_type, &sink).await?,
        PackageCommand::Query {
            sql,
            params,
            package_type,
        } => {
            let params = super::parse_params(&params);
            download_package_from_query(session, &sql, &params, &package_type, &sink).await?
        }
    };
    println!("Saved {}", path.display());
    Ok(())
}
