// crates/meeple-cli/src/commands/model.rs
//
// `meeple model`: display the loaded model artifact and blend settings.

use meeple_rpc::handlers::model::GetModelInfoResponse;

use crate::output::{format_json, format_table, FieldRow, OutputFormat};
use crate::rpc_client;

/// Run the model command.
pub async fn run(endpoint: &str, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let info: GetModelInfoResponse =
        rpc_client::call(endpoint, "model/info", serde_json::json!({})).await?;

    if *format == OutputFormat::Json {
        println!("{}", format_json(&info));
        return Ok(());
    }

    let mut rows = vec![
        FieldRow::new("Items", info.items),
        FieldRow::new("Factors", info.factors),
        FieldRow::new("Global mean", format!("{:.4}", info.global_mean)),
        FieldRow::new("Regularization", info.reg_coeff),
        FieldRow::new(
            "Blend weight",
            format!(
                "{} -> {} over {} ratings",
                info.blend_low, info.blend_high, info.blend_pivot
            ),
        ),
        FieldRow::new("Absent content", &info.absent_content_policy),
    ];
    if let Some(p) = &info.provenance {
        rows.push(FieldRow::new("Artifact", &p.path));
        rows.push(FieldRow::new("Version", p.version.as_deref().unwrap_or("--")));
        rows.push(FieldRow::new("SHA-256", &p.digest));
        rows.push(FieldRow::new("Loaded at", p.loaded_at.to_rfc3339()));
    }
    println!("{}", format_table(&rows));

    Ok(())
}
