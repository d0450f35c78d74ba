//! Utility to score a saved analysis payload without calling the backend.
//!
//! Accepts either a full `{ "data": { "summary": ..., "leads": [...] } }`
//! response or a bare array of leads.

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

use lead_scoring_client::models::{AnalysisSummary, Lead, QueryAnalysisData};
use lead_scoring_client::render;

#[derive(Parser, Debug)]
#[command(name = "score-leads")]
#[command(about = "Print confidence scores for a saved analysis payload")]
struct Args {
    /// JSON file with the analysis response or a lead array
    input: PathBuf,

    /// Print the batch view as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Leads(Vec<Lead>),
    Envelope { data: QueryAnalysisData },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let payload: Payload = serde_json::from_str(&raw).with_context(|| {
        format!(
            "{} is neither an analysis response nor a lead array",
            args.input.display()
        )
    })?;

    let (leads, summary) = match payload {
        Payload::Leads(leads) => (leads, AnalysisSummary::default()),
        Payload::Envelope { data } => (data.leads, data.summary),
    };

    let view = render::batch_view(&leads, &summary);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", view);
    }

    Ok(())
}
