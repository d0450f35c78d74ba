//! Export of stored results to spreadsheets.
//!
//! An export only reads [`WorkflowState`]; it never clears or replaces a
//! result, whether it succeeds or fails.

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::client::{encode_field, ExcelExportForm, ScoringApiClient};
use crate::config::Config;
use crate::download::{save_download, SavedExport};
use crate::errors::AppError;
use crate::models::{QueryAnalysisData, SingleLeadResponse};
use crate::workflow_state::{Slot, WorkflowState};

/// A validated export, ready to send.
#[derive(Debug, Clone)]
pub enum ExportRequest {
    QueryAnalysis(QueryAnalysisData),
    SingleLead(SingleLeadResponse),
    Excel(ExcelExportForm),
}

impl ExportRequest {
    pub fn slot(&self) -> Slot {
        match self {
            ExportRequest::QueryAnalysis(_) => Slot::QueryAnalysis,
            ExportRequest::SingleLead(_) => Slot::SingleLead,
            ExportRequest::Excel(_) => Slot::ExcelAnalysis,
        }
    }

    /// File name used when the server does not announce one.
    pub fn default_file_name(&self) -> String {
        match self {
            ExportRequest::QueryAnalysis(_) => "lead_query_analysis.xlsx".to_string(),
            ExportRequest::SingleLead(result) => format!(
                "lead_confidence_{}.xlsx",
                result
                    .lead_data
                    .id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or("unknown")
            ),
            ExportRequest::Excel(_) => "excel_analysis.xlsx".to_string(),
        }
    }
}

fn missing_result_message(slot: Slot) -> &'static str {
    match slot {
        Slot::QueryPreview => "The query preview cannot be exported. Please run the analysis first.",
        Slot::QueryAnalysis => "Please run the analysis first before exporting.",
        Slot::SingleLead => "Please run the confidence analysis first before exporting.",
        Slot::ExcelAnalysis => "Please run the Excel analysis first before exporting.",
    }
}

#[derive(Debug, Clone)]
pub struct ExportTrigger {
    download_dir: PathBuf,
}

impl ExportTrigger {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.download_dir.clone())
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Checks that `slot` holds an exportable result and snapshots it.
    ///
    /// Fails with [`AppError::Validation`] when there is nothing to export.
    pub fn prepare(&self, state: &WorkflowState, slot: Slot) -> Result<ExportRequest, AppError> {
        let missing = || AppError::Validation(missing_result_message(slot).to_string());

        match slot {
            Slot::QueryPreview => Err(missing()),
            Slot::QueryAnalysis => state
                .query_analysis()
                .map(|analysis| ExportRequest::QueryAnalysis(analysis.data.clone()))
                .ok_or_else(missing),
            Slot::SingleLead => state
                .single_lead()
                .map(|result| ExportRequest::SingleLead(result.clone()))
                .ok_or_else(missing),
            Slot::ExcelAnalysis => {
                let analysis = state.excel_analysis().ok_or_else(missing)?;
                let session = state.excel();
                let file = session.file.clone().ok_or_else(missing)?;

                let invalid_ids: Option<&Vec<Value>> = analysis
                    .validation_summary
                    .as_ref()
                    .and_then(|summary| summary.invalid_lead_ids_list.as_ref())
                    .or_else(|| {
                        session
                            .validation
                            .as_ref()
                            .map(|validation| &validation.invalid_lead_ids_list)
                    });

                Ok(ExportRequest::Excel(ExcelExportForm {
                    file,
                    selection: session.selection.clone(),
                    analysis_results: encode_field(&analysis.data)?,
                    invalid_lead_ids: invalid_ids.map(encode_field).transpose()?,
                }))
            }
        }
    }

    /// Sends a prepared export and saves the returned file.
    pub async fn send(
        &self,
        client: &ScoringApiClient,
        request: &ExportRequest,
    ) -> Result<SavedExport, AppError> {
        tracing::info!("Exporting {} results", request.slot().label());

        let download = match request {
            ExportRequest::QueryAnalysis(data) => client.export_query_analysis(data).await?,
            ExportRequest::SingleLead(result) => client.export_single_lead(result).await?,
            ExportRequest::Excel(form) => client.export_excel_analysis(form).await?,
        };

        save_download(&self.download_dir, &download, &request.default_file_name()).await
    }

    /// Prepares and sends in one step.
    pub async fn export(
        &self,
        client: &ScoringApiClient,
        state: &WorkflowState,
        slot: Slot,
    ) -> Result<SavedExport, AppError> {
        let request = self.prepare(state, slot)?;
        self.send(client, &request).await
    }
}
