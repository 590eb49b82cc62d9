//! `kingfisher flatten`: turn a release package into an uploaded workbook.

use anyhow::Result;
use clap::Args;

use kingfisher_adapter_pg::Session;
use kingfisher_core::KingfisherConfig;
use kingfisher_export::{save_dataframe_to_spreadsheet, DirectoryUploader, XlsxFlattener};

#[derive(Args, Debug)]
pub struct FlattenArgs {
    /// Query whose first cell is a release package
    pub sql: String,

    /// Title of the uploaded workbook, without `.xlsx`
    #[arg(long)]
    pub name: String,

    #[arg(long = "param", short = 'p')]
    pub params: Vec<String>,

    /// Directory that receives uploads (defaults to <output_dir>/uploads)
    #[arg(long)]
    pub upload_dir: Option<std::path::PathBuf>,
}

pub async fn run(session: &Session, config: &KingfisherConfig, args: FlattenArgs) -> Result<()> {
    let params = super::parse_params(&args.params);
    let table = session.get_dataframe_from_query(&args.sql, &params).await?;

    let output_dir = &config.export.output_dir;
    let upload_dir = args.upload_dir.unwrap_or_else(|| output_dir.join("uploads"));
    let flattener = XlsxFlattener::new(&config.export.schema_url);
    let uploader = DirectoryUploader::new(upload_dir);

    save_dataframe_to_spreadsheet(&table, &args.name, output_dir, &flattener, &uploader).await?;
    Ok(())
}
