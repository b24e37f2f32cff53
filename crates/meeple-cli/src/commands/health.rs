// crates/meeple-cli/src/commands/health.rs
//
// `meeple health`: display daemon status and uptime.

use meeple_rpc::handlers::node::GetHealthResponse;

use crate::output::{format_json, OutputFormat};
use crate::rpc_client;

/// Run the health command.
pub async fn run(endpoint: &str, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let health: GetHealthResponse =
        rpc_client::call(endpoint, "node/health", serde_json::json!({})).await?;

    if *format == OutputFormat::Json {
        println!("{}", format_json(&health));
        return Ok(());
    }

    println!("Meeple daemon v{}", health.version);
    println!();
    println!("Node Status");
    println!("-----------");
    println!("  RPC endpoint:    {}", endpoint);
    println!("  Status:          {}", health.status);
    println!("  Uptime:          {}s", health.uptime_seconds);
    println!("  Catalog items:   {}", health.catalog_items);
    println!(
        "  Content service: {}",
        if health.content_service { "configured" } else { "none" }
    );
    if let Some(details) = &health.details {
        println!();
        println!("{}", details);
    }

    Ok(())
}
