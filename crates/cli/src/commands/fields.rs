//! Input field catalogue command

use ids_lib::fields::TRAFFIC_FIELDS;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    format_kind, format_value, print_info, print_json, print_table, OutputFormat,
};

#[derive(Tabled, Serialize)]
struct FieldRow {
    #[tabled(rename = "Key")]
    key: &'static str,
    #[tabled(rename = "Field")]
    label: &'static str,
    #[tabled(rename = "Accepts")]
    accepts: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Description")]
    description: &'static str,
}

/// List the traffic fields an operator can supply
pub fn show_fields(format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(TRAFFIC_FIELDS),
        OutputFormat::Table => {
            let rows: Vec<FieldRow> = TRAFFIC_FIELDS
                .iter()
                .map(|f| FieldRow {
                    key: f.key,
                    label: f.label,
                    accepts: format_kind(&f.kind),
                    default: format_value(f.default),
                    description: f.description,
                })
                .collect();
            print_table(&rows, format);
            println!();
            print_info("Pass values with: idsctl predict -F count=5 -F logged_in=1");
        }
    }
}
