use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_scoring_client::config::Config;
use lead_scoring_client::controller::{Outcome, RequestController};
use lead_scoring_client::errors::AppError;
use lead_scoring_client::models::ExcelUpload;
use lead_scoring_client::ui::PanelId;
use lead_scoring_client::workflow_state::Slot;

/// Command-line client for the lead-scoring backend
#[derive(Parser, Debug)]
#[command(name = "lead-scoring-client")]
#[command(about = "Preview, score and export Salesforce leads")]
#[command(version)]
struct Cli {
    /// Backend URL (overrides LEAD_SCORING_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory for exported spreadsheets (overrides LEAD_SCORING_DOWNLOAD_DIR)
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Request timeout in seconds (overrides LEAD_SCORING_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// SOQL WHERE clause; empty lets the backend pick its default
    #[arg(short, long, default_value = "")]
    query: String,

    /// Number of leads to preview (1-1000)
    #[arg(short, long, default_value = "100")]
    limit: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Preview how many leads a query matches
    Preview(QueryArgs),
    /// Preview, then score the first leads of a query
    Analyze {
        #[command(flatten)]
        query: QueryArgs,

        /// Maximum number of leads to analyze (1-500)
        #[arg(short, long, default_value = "10")]
        max: String,

        /// Export the analysis to a spreadsheet
        #[arg(long)]
        export: bool,
    },
    /// Score a single lead by Salesforce id
    Lead {
        /// 15 or 18 character Lead ID
        lead_id: String,

        /// Export the assessment to a spreadsheet
        #[arg(long)]
        export: bool,
    },
    /// Parse, validate and score the Lead IDs of a spreadsheet
    Excel {
        /// Path to the .xlsx file
        file: PathBuf,

        /// Sheet to read (defaults to the first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Column holding the Lead IDs
        #[arg(long)]
        column: String,

        /// Export the results, annotated onto the original file
        #[arg(long)]
        export: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_scoring_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.base_url {
        config = config.with_base_url(url)?;
    }
    if let Some(dir) = cli.download_dir {
        config.download_dir = dir;
    }
    if let Some(secs) = cli.timeout {
        if secs == 0 {
            anyhow::bail!("--timeout must be a positive number of seconds");
        }
        config.request_timeout_secs = secs;
    }

    let mut controller = RequestController::from_config(&config)?;
    tracing::info!("✓ Client ready for {}", controller.client().base_url());

    match cli.command {
        Command::Preview(query) => {
            controller.set_soql_query(query.query);
            controller.set_preview_limit(query.limit);
            let result = controller.preview_query().await;
            report(&controller, PanelId::Query, result)?;
        }
        Command::Analyze { query, max, export } => {
            controller.set_soql_query(query.query);
            controller.set_preview_limit(query.limit);
            controller.set_max_analyze(max);

            let result = controller.preview_query().await;
            report(&controller, PanelId::Query, result)?;
            let result = controller.analyze_query().await;
            report(&controller, PanelId::Query, result)?;

            if export {
                export_slot(&mut controller, Slot::QueryAnalysis).await?;
            }
        }
        Command::Lead { lead_id, export } => {
            controller.set_lead_id(lead_id);
            let result = controller.lookup_lead().await;
            report(&controller, PanelId::Confidence, result)?;

            if export {
                export_slot(&mut controller, Slot::SingleLead).await?;
            }
        }
        Command::Excel {
            file,
            sheet,
            column,
            export,
        } => {
            let upload = ExcelUpload::from_path(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            controller.select_excel_file(Some(upload));

            let result = controller.parse_excel().await;
            report(&controller, PanelId::Excel, result)?;

            if let Some(sheet) = sheet {
                controller.select_sheet(sheet);
            }
            controller.select_lead_id_column(column);

            let result = controller.validate_lead_ids().await;
            report(&controller, PanelId::Excel, result)?;
            let result = controller.analyze_excel().await;
            report(&controller, PanelId::Excel, result)?;

            if export {
                export_slot(&mut controller, Slot::ExcelAnalysis).await?;
            }
        }
    }

    Ok(())
}

/// Prints the panel a step wrote to, then propagates the step's error.
fn report(
    controller: &RequestController,
    panel: PanelId,
    result: Result<Outcome, AppError>,
) -> anyhow::Result<()> {
    if let Some(panel) = controller.panel(panel) {
        println!("{}\n", panel);
    }
    match result {
        Ok(Outcome::Applied) => Ok(()),
        Ok(Outcome::Discarded) => anyhow::bail!("Response was superseded before it arrived"),
        Err(err) => Err(err.into()),
    }
}

async fn export_slot(controller: &mut RequestController, slot: Slot) -> anyhow::Result<()> {
    match controller.export(slot).await {
        Ok(saved) => {
            println!(
                "📊 Exported {} ({} bytes, sha256 {})",
                saved.path.display(),
                saved.size,
                saved.sha256
            );
            Ok(())
        }
        Err(err) => {
            if let Some(notice) = controller.notice() {
                eprintln!("{}", notice);
            }
            Err(err.into())
        }
    }
}
