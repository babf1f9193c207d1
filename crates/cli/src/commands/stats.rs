//! Inference statistics command

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct StatRow {
    #[tabled(rename = "Counter")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: u64,
}

/// Show the detector's inference counters
pub async fn show_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats = client.stats().await?;

    match format {
        OutputFormat::Json => print_json(&stats),
        OutputFormat::Table => {
            println!("{}", "Inference Statistics".bold());
            let rows = [
                StatRow {
                    name: "Total",
                    value: stats.total_inferences,
                },
                StatRow {
                    name: "Intrusions",
                    value: stats.intrusions,
                },
                StatRow {
                    name: "Rejected records",
                    value: stats.rejected_records,
                },
                StatRow {
                    name: "Failed",
                    value: stats.failed_inferences,
                },
                StatRow {
                    name: "Slow",
                    value: stats.slow_inferences,
                },
            ];
            print_table(&rows, format);
        }
    }

    Ok(())
}
