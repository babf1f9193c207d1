//! Feature schema command

use anyhow::Result;
use colored::Colorize;
use ids_lib::{fields::find_field, ReconcilePolicy};
use serde::Serialize;
use tabled::Tabled;

use super::{load_local, Target};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct SchemaRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Label")]
    label: String,
}

#[derive(Serialize)]
struct SchemaOutput {
    features: Vec<String>,
    artifact_version: String,
}

/// Show the feature order the classifier expects
pub async fn show_schema(target: &Target, format: OutputFormat) -> Result<()> {
    let output = match target {
        Target::Local(dir) => {
            let detector = load_local(dir, ReconcilePolicy::Lenient)?;
            SchemaOutput {
                features: detector.schema().names().to_vec(),
                artifact_version: detector.version().to_string(),
            }
        }
        Target::Remote(client) => {
            let schema = client.schema().await?;
            SchemaOutput {
                features: schema.features,
                artifact_version: schema.artifact_version,
            }
        }
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            println!("{}", "Feature Schema".bold());
            println!("Artifacts: {}", output.artifact_version.cyan());
            println!();

            let rows: Vec<SchemaRow> = output
                .features
                .iter()
                .enumerate()
                .map(|(i, name)| SchemaRow {
                    position: i + 1,
                    feature: name.clone(),
                    label: find_field(name)
                        .map(|f| f.label.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            print_table(&rows, format);
        }
    }

    Ok(())
}
