//! `kingfisher query`: run SQL and send the results somewhere.

use anyhow::{Context, Result};
use clap::Args;

use kingfisher_adapter_pg::Session;
use kingfisher_core::KingfisherConfig;
use kingfisher_export::{
    download_data_as_json, download_dataframe_as_csv, save_straight_to_sheets, save_to_sheets, DirectorySink,
    StdinPrompt, XlsxSpreadsheetClient,
};

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// SQL with positional parameters ($1, $2, ...)
    pub sql: String,

    /// Parameter value, parsed as JSON when possible; repeat for each parameter
    #[arg(long = "param", short = 'p')]
    pub params: Vec<String>,

    /// Save the results as CSV under this file name
    #[arg(long)]
    pub csv: Option<String>,

    /// Save the results as a JSON array of row objects under this file name
    #[arg(long)]
    pub json: Option<String>,

    /// Add the results to the spreadsheet as a worksheet with this name
    #[arg(long)]
    pub sheet: Option<String>,

    /// Spreadsheet to add the worksheet to (defaults to export.spreadsheet_name)
    #[arg(long)]
    pub spreadsheet: Option<String>,

    /// Save the worksheet without asking first
    #[arg(long, default_value_t = false)]
    pub yes: bool,
}

pub async fn run(session: &Session, config: &KingfisherConfig, args: QueryArgs) -> Result<()> {
    let params = super::parse_params(&args.params);
    let table = session.get_dataframe_from_query(&args.sql, &params).await?;
    println!("{}", table);

    let sink = DirectorySink::new(&config.export.output_dir);
    if let Some(filename) = &args.csv {
        let path = download_dataframe_as_csv(&table, filename, &sink)?;
        println!("Saved {}", path.display());
    }
    if let Some(filename) = &args.json {
        let path = download_data_as_json(&serde_json::Value::Array(table.to_records()), filename, &sink)?;
        println!("Saved {}", path.display());
    }

    if let Some(sheet) = &args.sheet {
        let spreadsheet = args
            .spreadsheet
            .as_deref()
            .or(config.export.spreadsheet_name.as_deref())
            .context("No spreadsheet name: pass --spreadsheet or set export.spreadsheet_name")?;
        let mut client = XlsxSpreadsheetClient::new(&config.export.output_dir);
        let prompt = StdinPrompt;

        let saved = if args.yes {
            Some(save_straight_to_sheets(&table, spreadsheet, sheet, &mut client, &prompt).await?)
        } else {
            save_to_sheets(&table, spreadsheet, sheet, &mut client, &prompt).await?
        };
        if let Some(title) = saved {
            println!("Saved worksheet '{}' to {}", title, spreadsheet);
        }
    }

    Ok(())
}
