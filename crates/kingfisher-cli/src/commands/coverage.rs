//! `kingfisher coverage`: field coverage of a summary table.

use anyhow::Result;
use clap::Args;

use kingfisher_adapter_pg::{CoverageOptions, CoverageOutcome, CoverageReport, Session};
use kingfisher_core::{CoverageGenerator, KingfisherConfig};

#[derive(Args, Debug)]
pub struct CoverageArgs {
    /// Fields as JSON pointers, e.g. `awards/date`, `:items/description` or `ALL :items`
    #[arg(required = true)]
    pub fields: Vec<String>,

    /// Summary table to measure (inferred from the first field when omitted)
    #[arg(long)]
    pub scope: Option<String>,

    /// Print the generated SQL before running it
    #[arg(long, default_value_t = false)]
    pub print_sql: bool,

    /// Print the generated SQL without running it
    #[arg(long, default_value_t = false)]
    pub sql_only: bool,
}

pub async fn run(session: &Session, config: &KingfisherConfig, args: CoverageArgs) -> Result<()> {
    let generator =
        CoverageGenerator::new(session.summary_tables().await?).with_root_table(&config.coverage.root_table);
    let options = CoverageOptions {
        print_sql: args.print_sql || args.sql_only,
        return_sql: args.sql_only,
    };

    let outcome = session
        .calculate_coverage_with(&generator, &args.fields, args.scope.as_deref(), options)
        .await?;

    let warnings = match &outcome {
        CoverageOutcome::Sql(query) => &query.warnings,
        CoverageOutcome::Report(report) => &report.warnings,
    };
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }

    if let CoverageOutcome::Report(report) = outcome {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn render_percentage(value: Option<f64>) -> String {
    match value {
        Some(p) => format!("{:.2}%", p),
        None => "-".to_string(),
    }
}

fn render_report(report: &CoverageReport) -> String {
    let width = report
        .fields
        .iter()
        .map(|(alias, _)| alias.len())
        .chain(std::iter::once("total".len()))
        .max()
        .unwrap_or(0);

    let mut out = format!("{} rows in {}\n", report.total, report.scope);
    for (alias, value) in &report.fields {
        out.push_str(&format!("{:<width$}  {}\n", alias, render_percentage(*value)));
    }
    out.push_str(&format!("{:<width$}  {}\n", "total", render_percentage(report.total_percentage)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_report() {
        let report = CoverageReport {
            scope: "awards_summary".to_string(),
            total: 3,
            fields: vec![("date".to_string(), Some(66.67)), ("all_items".to_string(), Some(100.0))],
            total_percentage: Some(66.67),
            warnings: Vec::new(),
        };
        assert_eq!(
            render_report(&report),
            "3 rows in awards_summary\ndate       66.67%\nall_items  100.00%\ntotal      66.67%\n"
        );
    }

    #[test]
    fn test_render_empty_scope() {
        let report = CoverageReport {
            scope: "parties_summary".to_string(),
            total: 0,
            fields: vec![("roles".to_string(), None)],
            total_percentage: None,
            warnings: Vec::new(),
        };
        assert_eq!(render_report(&report), "0 rows in parties_summary\nroles  -\ntotal  -\n");
    }
}
