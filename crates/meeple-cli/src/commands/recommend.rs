// crates/meeple-cli/src/commands/recommend.rs
//
// `meeple recommend --rating ID:SCORE ...`: ask the daemon for
// recommendations.

use clap::Args;
use tabled::Tabled;

use meeple_core::ItemId;
use meeple_rpc::handlers::recommend::{RecommendRequest, RecommendResponse};

use crate::output::{format_json, format_table, OutputFormat};
use crate::rpc_client;

/// Recommendation request command.
#[derive(Debug, Args)]
pub struct RecommendCmd {
    /// A rating as ITEM_ID:SCORE. Repeat for each rated game.
    #[arg(long = "rating", value_parser = parse_rating)]
    pub ratings: Vec<(ItemId, f64)>,

    /// Preference flags for the content service, e.g. "1,0,1,1".
    #[arg(long)]
    pub preferences: Option<String>,

    /// Number of recommendations (daemon default when omitted).
    #[arg(long)]
    pub top_n: Option<u32>,

    /// Name echoed back by the daemon.
    #[arg(long)]
    pub username: Option<String>,
}

/// A row in the recommendations table.
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Item")]
    item_id: ItemId,
    #[tabled(rename = "Score")]
    score: String,
}

/// Parse `ITEM_ID:SCORE`.
fn parse_rating(s: &str) -> Result<(ItemId, f64), String> {
    let (id, score) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ITEM_ID:SCORE, got '{}'", s))?;
    let id: ItemId = id
        .trim()
        .parse()
        .map_err(|e| format!("bad item id '{}': {}", id, e))?;
    let score: f64 = score
        .trim()
        .parse()
        .map_err(|e| format!("bad score '{}': {}", score, e))?;
    if !score.is_finite() {
        return Err(format!("score for item {} is not finite", id));
    }
    Ok((id, score))
}

/// Parse a comma-separated list of 1/0 or true/false flags.
fn parse_preferences(s: &str) -> Result<Vec<bool>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|flag| !flag.is_empty())
        .map(|flag| match flag {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(format!("bad preference flag '{}'", other)),
        })
        .collect()
}

/// Run the recommend command.
pub async fn run(
    endpoint: &str,
    cmd: &RecommendCmd,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let preferences = cmd
        .preferences
        .as_deref()
        .map(parse_preferences)
        .transpose()?;
    let request = RecommendRequest {
        username: cmd.username.clone(),
        ratings: cmd.ratings.clone(),
        preferences,
        content_scores: None,
        top_n: cmd.top_n,
    };
    let response: RecommendResponse =
        rpc_client::call(endpoint, "recommend", serde_json::to_value(&request)?).await?;

    if *format == OutputFormat::Json {
        println!("{}", format_json(&response));
        return Ok(());
    }

    println!(
        "Recommendations for {}  |  CF weight: {:.2}  |  Fold-in: {:?} ({} ratings used)",
        response.username, response.blend_weight, response.fold_in, response.ratings_used
    );
    println!();

    if response.recommendations.is_empty() {
        println!("No recommendations: every catalog item is already rated.");
        return Ok(());
    }

    let rows: Vec<RecommendationRow> = response
        .recommendations
        .iter()
        .enumerate()
        .map(|(i, (item_id, score))| RecommendationRow {
            rank: i + 1,
            item_id: *item_id,
            score: format!("{:.4}", score),
        })
        .collect();
    println!("{}", format_table(&rows));

    Ok(())
}
