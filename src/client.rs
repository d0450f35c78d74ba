use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::download::{filename_from_content_disposition, Download};
use crate::errors::AppError;
use crate::models::{
    AnalyzeQueryRequest, ExcelAnalysisResponse, ExcelParseResponse, ExcelSelection, ExcelUpload,
    LeadIdValidationResponse, PreviewQueryRequest, PreviewResponse, QueryAnalysisData,
    QueryAnalysisResponse, SingleLeadResponse,
};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Multipart fields of `POST /excel/export-analysis-with-file`.
#[derive(Debug, Clone)]
pub struct ExcelExportForm {
    pub file: ExcelUpload,
    pub selection: ExcelSelection,
    /// Analysis `data` object, JSON encoded.
    pub analysis_results: String,
    /// Invalid Lead IDs, JSON encoded. Omitted when unknown.
    pub invalid_lead_ids: Option<String>,
}

/// Client for the lead-scoring backend.
///
/// Every call carries an `X-Request-Id` header that also tags its tracing span.
/// Error statuses become [`AppError::Remote`] with the body kept verbatim.
#[derive(Clone)]
pub struct ScoringApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ScoringApiClient {
    /// Creates a new `ScoringApiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root URL of the backend, e.g. `http://localhost:5000`.
    /// * `timeout` - Per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            AppError::Validation(format!("Invalid backend URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "Backend URL '{}' cannot be used as a base",
                base_url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds an endpoint URL from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Validation(format!("Invalid backend URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `POST /leads/preview-query`
    pub async fn preview_query(
        &self,
        request: &PreviewQueryRequest,
    ) -> Result<PreviewResponse, AppError> {
        let url = self.endpoint(&["leads", "preview-query"])?;
        self.send_json(self.client.post(url).json(request), "preview query")
            .await
    }

    /// `POST /leads/analyze-query`
    pub async fn analyze_query(
        &self,
        request: &AnalyzeQueryRequest,
    ) -> Result<QueryAnalysisResponse, AppError> {
        let url = self.endpoint(&["leads", "analyze-query"])?;
        self.send_json(self.client.post(url).json(request), "analyze query")
            .await
    }

    /// `GET /lead/{id}/confidence`
    pub async fn lead_confidence(&self, lead_id: &str) -> Result<SingleLeadResponse, AppError> {
        let url = self.endpoint(&["lead", lead_id, "confidence"])?;
        self.send_json(self.client.get(url), "lead confidence").await
    }

    /// `POST /excel/parse`
    pub async fn parse_excel(&self, file: &ExcelUpload) -> Result<ExcelParseResponse, AppError> {
        let url = self.endpoint(&["excel", "parse"])?;
        let form = Form::new().part("file", file_part(file)?);
        self.send_json(self.client.post(url).multipart(form), "parse excel")
            .await
    }

    /// `POST /excel/validate-lead-ids`
    pub async fn validate_lead_ids(
        &self,
        file: &ExcelUpload,
        selection: &ExcelSelection,
    ) -> Result<LeadIdValidationResponse, AppError> {
        let url = self.endpoint(&["excel", "validate-lead-ids"])?;
        let form = selection_form(file, selection)?;
        self.send_json(self.client.post(url).multipart(form), "validate lead ids")
            .await
    }

    /// `POST /excel/analyze`
    pub async fn analyze_excel(
        &self,
        file: &ExcelUpload,
        selection: &ExcelSelection,
        max_analyze: u32,
        include_ai_assessment: bool,
    ) -> Result<ExcelAnalysisResponse, AppError> {
        let url = self.endpoint(&["excel", "analyze"])?;
        let form = selection_form(file, selection)?
            .text("max_analyze", max_analyze.to_string())
            .text("include_ai_assessment", include_ai_assessment.to_string());
        self.send_json(self.client.post(url).multipart(form), "analyze excel")
            .await
    }

    /// `POST /leads/export-analysis-data`
    pub async fn export_query_analysis(
        &self,
        analysis: &QueryAnalysisData,
    ) -> Result<Download, AppError> {
        let url = self.endpoint(&["leads", "export-analysis-data"])?;
        let body = json!({ "analysis_data": analysis });
        self.send_download(self.client.post(url).json(&body), "export query analysis")
            .await
    }

    /// `POST /leads/export-single-lead-data`
    ///
    /// `lead_data` is the whole single-lead response, assessment included.
    pub async fn export_single_lead(
        &self,
        result: &SingleLeadResponse,
    ) -> Result<Download, AppError> {
        let url = self.endpoint(&["leads", "export-single-lead-data"])?;
        let body = json!({ "lead_data": result });
        self.send_download(self.client.post(url).json(&body), "export single lead")
            .await
    }

    /// `POST /excel/export-analysis-with-file`
    pub async fn export_excel_analysis(
        &self,
        export: &ExcelExportForm,
    ) -> Result<Download, AppError> {
        let url = self.endpoint(&["excel", "export-analysis-with-file"])?;
        let mut form = selection_form(&export.file, &export.selection)?
            .text("analysis_results", export.analysis_results.clone());
        if let Some(ref invalid) = export.invalid_lead_ids {
            form = form.text("invalid_lead_ids", invalid.clone());
        }
        self.send_download(self.client.post(url).multipart(form), "export excel analysis")
            .await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        operation: &'static str,
    ) -> Result<T, AppError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("backend_call", operation, %request_id);
        async move {
            let response = self.execute(builder, operation, request_id).await?;
            let data = response.json::<T>().await.map_err(|e| {
                AppError::MalformedResponse(format!("Failed to parse {} response: {}", operation, e))
            })?;
            tracing::info!("✓ {} succeeded", operation);
            Ok(data)
        }
        .instrument(span)
        .await
    }

    async fn send_download(
        &self,
        builder: RequestBuilder,
        operation: &'static str,
    ) -> Result<Download, AppError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("backend_call", operation, %request_id);
        async move {
            let response = self.execute(builder, operation, request_id).await?;
            let filename = response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok())
                .and_then(filename_from_content_disposition);
            let bytes = response.bytes().await.map_err(|e| {
                AppError::Transport(format!("Failed to read {} payload: {}", operation, e))
            })?;
            tracing::info!("✓ {} returned {} bytes", operation, bytes.len());
            Ok(Download {
                filename,
                bytes: bytes.to_vec(),
            })
        }
        .instrument(span)
        .await
    }

    /// Sends the request and turns error statuses into [`AppError::Remote`].
    async fn execute(
        &self,
        builder: RequestBuilder,
        operation: &str,
        request_id: Uuid,
    ) -> Result<Response, AppError> {
        tracing::info!("Sending {} request", operation);

        let response = builder
            .header("X-Request-Id", request_id.to_string())
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("{} request failed: {}", operation, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!("Backend returned {} for {}: {}", status, operation, error_text);
            let body = serde_json::from_str::<Value>(&error_text)
                .unwrap_or_else(|_| Value::String(error_text));
            return Err(AppError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

fn file_part(file: &ExcelUpload) -> Result<Part, AppError> {
    Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(XLSX_MIME)
        .map_err(|e| AppError::Transport(format!("Failed to build upload part: {}", e)))
}

fn selection_form(file: &ExcelUpload, selection: &ExcelSelection) -> Result<Form, AppError> {
    Ok(Form::new()
        .part("file", file_part(file)?)
        .text("sheet_name", selection.sheet_name.clone())
        .text("lead_id_column", selection.lead_id_column.clone()))
}

/// JSON-encodes a multipart field value.
pub fn encode_field<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value)
        .map_err(|e| AppError::MalformedResponse(format!("Failed to encode export field: {}", e)))
}
