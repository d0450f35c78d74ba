use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Fields the client does not model. Kept so exports echo them back unchanged.
pub type JsonMap = Map<String, Value>;

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============ Lead & Assessment ============

/// A lead record as returned by the backend.
///
/// Only the identifier, the completeness scores and the nested assessment and
/// scoring details are typed. Everything else (names, firmographics, flags)
/// stays in `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Salesforce record id.
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Acquisition completeness (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_completeness_score: Option<f64>,
    /// Enrichment completeness (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_completeness_score: Option<f64>,
    /// AI assessment attached to batch results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_assessment: Option<Assessment>,
    /// Per-field breakdown of the completeness scores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joseph_scoring_details: Option<ScoringDetails>,
    #[serde(flatten)]
    pub fields: JsonMap,
}

impl Lead {
    /// Display text of a pass-through field, `None` when absent, null or blank.
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(value_text)
    }

    /// Reads a quality flag such as `not_in_TAM`.
    pub fn flag(&self, field: &str) -> bool {
        match self.fields.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Some(Value::String(s)) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "1"
            ),
            _ => false,
        }
    }
}

/// AI confidence assessment of a lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Coherence score (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation_bullets: Vec<String>,
    /// Field name to corrected value.
    #[serde(default, deserialize_with = "null_as_default")]
    pub corrections: JsonMap,
    /// Field name to inferred value.
    #[serde(default, deserialize_with = "null_as_default")]
    pub inferences: JsonMap,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_completeness: Option<CompletenessDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_completeness: Option<CompletenessDetail>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletenessDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<CompletenessBreakdown>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletenessBreakdown {
    /// Score key (e.g. `first_name_score`) to percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_scores: Option<JsonMap>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Display text for a JSON scalar.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

// ============ API Request Models ============

/// Body of `POST /leads/preview-query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewQueryRequest {
    pub soql_query: String,
    pub preview_limit: u32,
}

/// Body of `POST /leads/analyze-query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeQueryRequest {
    pub soql_query: String,
    pub max_analyze: u32,
    pub include_ai_assessment: bool,
}

/// The uploaded spreadsheet. Every Excel step re-sends these exact bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcelUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExcelUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Reads a spreadsheet from disk.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.xlsx".to_string());
        Ok(Self { file_name, bytes })
    }
}

/// Sheet and Lead ID column chosen after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcelSelection {
    pub sheet_name: String,
    pub lead_id_column: String,
}

impl ExcelSelection {
    pub fn is_complete(&self) -> bool {
        !self.sheet_name.trim().is_empty() && !self.lead_id_column.trim().is_empty()
    }
}

// ============ API Response Models ============

/// `{ "data": ... }` wrapper used by most endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewData {
    /// Number of leads matching the query.
    pub total_found: u64,
    #[serde(flatten)]
    pub extra: JsonMap,
}

pub type PreviewResponse = ApiEnvelope<PreviewData>;

/// Server-side summary of a batch analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Average AI coherence score, computed by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leads_analyzed: Option<u64>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysisData {
    #[serde(default)]
    pub summary: AnalysisSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub leads: Vec<Lead>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_info: Option<Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

pub type QueryAnalysisResponse = ApiEnvelope<QueryAnalysisData>;

/// Response of `GET /lead/{id}/confidence`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SingleLeadResponse {
    pub lead_data: Lead,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_assessment: Option<Assessment>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcelParseData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sheet_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: Vec<String>,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(flatten)]
    pub extra: JsonMap,
}

pub type ExcelParseResponse = ApiEnvelope<ExcelParseData>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationFlags {
    #[serde(default)]
    pub partial_validation: bool,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Result of `POST /excel/validate-lead-ids`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadIdValidation {
    #[serde(default)]
    pub total_lead_ids: u64,
    #[serde(default)]
    pub valid_lead_ids: u64,
    #[serde(default)]
    pub invalid_lead_ids: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub invalid_lead_ids_list: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_summary: Option<ValidationFlags>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

pub type LeadIdValidationResponse = ApiEnvelope<LeadIdValidation>;

/// How a Lead ID validation gates the analysis step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// No invalid ids were reported.
    AllValid,
    /// Some ids are invalid but the backend will analyze the valid ones.
    Partial,
    /// Invalid ids and no partial validation: nothing to analyze.
    Rejected,
}

impl ValidationOutcome {
    pub fn allows_analysis(self) -> bool {
        !matches!(self, ValidationOutcome::Rejected)
    }
}

impl LeadIdValidation {
    pub fn outcome(&self) -> ValidationOutcome {
        if self.invalid_lead_ids_list.is_empty() {
            ValidationOutcome::AllValid
        } else if self
            .validation_summary
            .as_ref()
            .map(|s| s.partial_validation)
            .unwrap_or(false)
        {
            ValidationOutcome::Partial
        } else {
            ValidationOutcome::Rejected
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcelAnalysisData {
    #[serde(default)]
    pub summary: AnalysisSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub leads: Vec<Lead>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Validation counts the backend attaches to an Excel analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcelValidationSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_lead_ids: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_lead_ids: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_lead_ids_list: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Response of `POST /excel/analyze`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcelAnalysisResponse {
    pub data: ExcelAnalysisData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_summary: Option<ExcelValidationSummary>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lead_keeps_unknown_fields_for_export() {
        let raw = json!({
            "Id": "00Q5e00000AbCdEfGH",
            "FirstName": "Ada",
            "acquisition_completeness_score": 0,
            "Custom_Field__c": {"nested": true}
        });
        let lead: Lead = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(lead.id.as_deref(), Some("00Q5e00000AbCdEfGH"));
        assert_eq!(lead.acquisition_completeness_score, Some(0.0));
        assert_eq!(lead.enrichment_completeness_score, None);
        assert_eq!(lead.text("FirstName").as_deref(), Some("Ada"));

        let echoed = serde_json::to_value(&lead).unwrap();
        assert_eq!(echoed["Custom_Field__c"], json!({"nested": true}));
        assert_eq!(echoed["FirstName"], json!("Ada"));
    }

    #[test]
    fn test_blank_and_null_fields_have_no_text() {
        let lead: Lead = serde_json::from_value(json!({
            "Phone": null,
            "Title": "  ",
            "ZI_Employees__c": 250
        }))
        .unwrap();
        assert_eq!(lead.text("Phone"), None);
        assert_eq!(lead.text("Title"), None);
        assert_eq!(lead.text("Missing"), None);
        assert_eq!(lead.text("ZI_Employees__c").as_deref(), Some("250"));
    }

    #[test]
    fn test_quality_flags() {
        let lead: Lead = serde_json::from_value(json!({
            "not_in_TAM": true,
            "suspicious_enrichment": "False"
        }))
        .unwrap();
        assert!(lead.flag("not_in_TAM"));
        assert!(!lead.flag("suspicious_enrichment"));
        assert!(!lead.flag("absent_flag"));
    }

    #[test]
    fn test_assessment_tolerates_null_collections() {
        let assessment: Assessment = serde_json::from_value(json!({
            "confidence_score": 72,
            "explanation_bullets": null,
            "corrections": null
        }))
        .unwrap();
        assert_eq!(assessment.confidence_score, Some(72.0));
        assert!(assessment.explanation_bullets.is_empty());
        assert!(assessment.corrections.is_empty());
        assert!(assessment.inferences.is_empty());
    }

    #[test]
    fn test_preview_requires_total_found() {
        let ok: Result<PreviewResponse, _> =
            serde_json::from_value(json!({"data": {"total_found": 12, "leads": []}}));
        assert_eq!(ok.unwrap().data.total_found, 12);

        let missing: Result<PreviewResponse, _> = serde_json::from_value(json!({"data": {}}));
        assert!(missing.is_err());
    }

    #[test]
    fn test_validation_outcome() {
        let all_valid: LeadIdValidation = serde_json::from_value(json!({
            "total_lead_ids": 3, "valid_lead_ids": 3, "invalid_lead_ids": 0,
            "invalid_lead_ids_list": []
        }))
        .unwrap();
        assert_eq!(all_valid.outcome(), ValidationOutcome::AllValid);

        let partial: LeadIdValidation = serde_json::from_value(json!({
            "total_lead_ids": 3, "valid_lead_ids": 2, "invalid_lead_ids": 1,
            "invalid_lead_ids_list": ["bad-id"],
            "validation_summary": {"partial_validation": true}
        }))
        .unwrap();
        assert_eq!(partial.outcome(), ValidationOutcome::Partial);
        assert!(partial.outcome().allows_analysis());

        let rejected: LeadIdValidation = serde_json::from_value(json!({
            "total_lead_ids": 1, "valid_lead_ids": 0, "invalid_lead_ids": 1,
            "invalid_lead_ids_list": ["bad-id"]
        }))
        .unwrap();
        assert_eq!(rejected.outcome(), ValidationOutcome::Rejected);
        assert!(!rejected.outcome().allows_analysis());
    }

    #[test]
    fn test_excel_selection_completeness() {
        let mut selection = ExcelSelection::default();
        assert!(!selection.is_complete());
        selection.sheet_name = "Leads".to_string();
        assert!(!selection.is_complete());
        selection.lead_id_column = "Lead Id".to_string();
        assert!(selection.is_complete());
    }
}
