//! Intrusion prediction command

use anyhow::{Context, Result};
use colored::Colorize;
use ids_lib::{
    fields::{self, TRAFFIC_FIELDS},
    predictor::{reconcile_with, ReconcilePolicy},
    FeatureRecord, FeatureSchema, Verdict,
};
use serde::Serialize;
use std::collections::HashSet;
use tabled::Tabled;

use super::{load_local, Target};
use crate::output::{color_status, format_value, format_verdict, print_json, OutputFormat};

/// Parse a `name=value` feature argument
pub fn parse_feature(arg: &str) -> Result<(String, f64), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", arg))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing feature name in '{}'", arg));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.to_string(), value))
}

/// Build the record sent for prediction, checking catalogued fields
pub fn build_record(features: &[(String, f64)], defaults: bool) -> Result<FeatureRecord> {
    let mut record = if defaults {
        fields::default_record()
    } else {
        FeatureRecord::new()
    };
    for (name, value) in features {
        record.insert(name.clone(), *value);
    }

    if record.is_empty() {
        anyhow::bail!("No features given; pass -F name=value or --defaults");
    }
    fields::check_record(&record).context("Invalid feature value")?;
    Ok(record)
}

/// Row for the features table
#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

#[derive(Serialize)]
struct PredictionOutput {
    verdict: Verdict,
    label: i64,
    message: String,
    artifact_version: String,
    features: FeatureRecord,
    defaulted_features: Vec<String>,
    ignored_features: Vec<String>,
}

/// Predict a verdict for the given features
pub async fn predict(
    target: &Target,
    features: Vec<(String, f64)>,
    defaults: bool,
    strict: bool,
    format: OutputFormat,
) -> Result<()> {
    let record = build_record(&features, defaults)?;
    let policy = if strict {
        ReconcilePolicy::Strict
    } else {
        ReconcilePolicy::Lenient
    };

    let output = match target {
        Target::Local(dir) => {
            let detector = load_local(dir, policy)?;
            let prediction = detector.predict(&record)?;
            PredictionOutput {
                verdict: prediction.verdict,
                label: prediction.label,
                message: prediction.verdict.message().to_string(),
                artifact_version: detector.version().to_string(),
                features: record,
                defaulted_features: prediction.defaulted_features,
                ignored_features: prediction.ignored_features,
            }
        }
        Target::Remote(client) => {
            if strict {
                // The service applies its own policy; check against its schema first
                let schema = client.schema().await?;
                let schema = FeatureSchema::new(schema.features)
                    .context("Service returned an invalid schema")?;
                reconcile_with(&record, &schema, ReconcilePolicy::Strict)?;
            }
            let response = client.predict(&record).await?;
            PredictionOutput {
                verdict: response.verdict,
                label: response.label,
                message: response.message,
                artifact_version: response.artifact_version,
                features: record,
                defaulted_features: response.defaulted_features,
                ignored_features: response.ignored_features,
            }
        }
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => print_prediction(&output, &features, defaults),
    }

    Ok(())
}

fn print_prediction(output: &PredictionOutput, given: &[(String, f64)], defaults: bool) {
    let given: HashSet<&str> = given.iter().map(|(name, _)| name.as_str()).collect();
    let ignored: HashSet<&str> = output.ignored_features.iter().map(String::as_str).collect();

    let mut names: Vec<&str> = output.features.names().collect();
    names.sort_by_key(|name| {
        (
            TRAFFIC_FIELDS
                .iter()
                .position(|f| f.key == *name)
                .unwrap_or(usize::MAX),
            name.to_string(),
        )
    });

    let mut rows: Vec<FeatureRow> = names
        .into_iter()
        .map(|name| {
            let source = if ignored.contains(name) {
                "ignored"
            } else if defaults && !given.contains(name) {
                "form default"
            } else {
                "given"
            };
            FeatureRow {
                feature: name.to_string(),
                value: output.features.get(name).map(format_value).unwrap_or_default(),
                source: color_status(source),
            }
        })
        .collect();
    rows.extend(output.defaulted_features.iter().map(|name| FeatureRow {
        feature: name.clone(),
        value: "0".to_string(),
        source: color_status("defaulted"),
    }));

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!();
    println!("{}", format_verdict(output.verdict));
    println!(
        "{} label {} · artifacts {}",
        "ℹ".blue().bold(),
        output.label,
        output.artifact_version
    );
    if !output.defaulted_features.is_empty() {
        println!(
            "{} {} feature(s) were missing and scored as 0",
            "⚠".yellow().bold(),
            output.defaulted_features.len()
        );
    }
}
