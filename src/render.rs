//! Pure view models for backend results.
//!
//! Nothing here touches workflow state or the network: each function maps a
//! response to a view, and every view implements `Display` as the plain-text
//! rendering used by the command-line front end.

use serde::Serialize;
use std::fmt;

use crate::models::{
    value_text, AnalysisSummary, Assessment, CompletenessDetail, ExcelAnalysisResponse,
    ExcelParseData, Lead, LeadIdValidation, PreviewResponse, QueryAnalysisResponse,
    SingleLeadResponse, ValidationOutcome,
};
use crate::scoring::{self, BatchSummary};
use crate::ui::PanelBody;
use crate::workflow_state::WorkflowResult;

pub const NOT_AVAILABLE: &str = "N/A";

/// Lead fields shown in the "Lead Data" block, in display order.
const LEAD_DATA_FIELDS: [(&str, &str); 15] = [
    ("FirstName", "First Name"),
    ("LastName", "Last Name"),
    ("Phone", "Phone"),
    ("Country", "Country"),
    ("Title", "Title"),
    ("Industry", "Industry"),
    ("Email", "Email"),
    ("First_Channel__c", "First Channel"),
    ("SegmentName", "Segment"),
    ("LS_Company_Size_Range__c", "Company Size Range"),
    ("Website", "Website"),
    ("Company", "Company"),
    ("ZI_Company_Name__c", "ZI Company"),
    ("ZI_Employees__c", "ZI Employees"),
    ("ZI_Website__c", "ZI Website"),
];

const QUALITY_FLAGS: [(&str, &str); 2] = [
    ("not_in_TAM", "Not in TAM"),
    ("suspicious_enrichment", "Suspicious Enrichment"),
];

const ACQUISITION_FIELD_LABELS: [(&str, &str); 9] = [
    ("first_name_score", "First Name"),
    ("last_name_score", "Last Name"),
    ("email_domain_score", "Email Domain"),
    ("phone_score", "Phone"),
    ("state_province_score", "State"),
    ("country_score", "Country"),
    ("sector_score", "Industry"),
    ("company_score", "Company"),
    ("website_domain_score", "Website"),
];

const ENRICHMENT_FIELD_LABELS: [(&str, &str); 6] = [
    ("account_name_zi_cdp_score", "ZI Account Name"),
    ("zi_company_name_score", "ZI Company Name"),
    ("zi_website_domain_score", "ZI Website"),
    ("zi_company_state_score", "ZI State"),
    ("zi_company_country_score", "ZI Country"),
    ("zi_employees_score", "ZI Employees"),
];

/// Formats a score, dropping a trailing `.0`.
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(value) => format!("{}", value),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn format_int(value: Option<i64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn with_percent(text: String) -> String {
    if text == NOT_AVAILABLE {
        text
    } else {
        format!("{}%", text)
    }
}

// ============ Lead view ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadView {
    pub lead_id: String,
    /// `(label, value)` pairs, `N/A` when the lead lacks the field.
    pub data_rows: Vec<(String, String)>,
    pub flags: Vec<(String, bool)>,
    pub acquisition_score: Option<f64>,
    pub acquisition_explanation: String,
    pub enrichment_score: Option<f64>,
    pub enrichment_explanation: String,
    pub ai_score: Option<f64>,
    pub explanation_bullets: Vec<String>,
    pub corrections: Vec<(String, String)>,
    pub inferences: Vec<(String, String)>,
    pub final_score: Option<i64>,
}

/// Builds the view of one lead with its (optional) assessment.
pub fn lead_view(lead: &Lead, assessment: Option<&Assessment>) -> LeadView {
    let mut data_rows: Vec<(String, String)> = LEAD_DATA_FIELDS
        .iter()
        .map(|(field, label)| {
            (
                label.to_string(),
                lead.text(field)
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            )
        })
        .collect();
    data_rows.push((
        "Email Domain".to_string(),
        lead.text("email_domain")
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    ));

    let pairs = |map: &crate::models::JsonMap| -> Vec<(String, String)> {
        map.iter()
            .map(|(field, value)| {
                (
                    field.clone(),
                    value_text(value).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                )
            })
            .collect()
    };

    LeadView {
        lead_id: lead
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        data_rows,
        flags: QUALITY_FLAGS
            .iter()
            .map(|(field, label)| (label.to_string(), lead.flag(field)))
            .collect(),
        acquisition_score: lead.acquisition_completeness_score,
        acquisition_explanation: acquisition_explanation(lead),
        enrichment_score: lead.enrichment_completeness_score,
        enrichment_explanation: enrichment_explanation(lead),
        ai_score: assessment.and_then(|a| a.confidence_score),
        explanation_bullets: assessment
            .map(|a| a.explanation_bullets.clone())
            .unwrap_or_default(),
        corrections: assessment.map(|a| pairs(&a.corrections)).unwrap_or_default(),
        inferences: assessment.map(|a| pairs(&a.inferences)).unwrap_or_default(),
        final_score: scoring::final_score(lead, assessment),
    }
}

/// Per-field acquisition scores as `Label: N%`, joined by commas.
pub fn acquisition_explanation(lead: &Lead) -> String {
    let detail = lead
        .joseph_scoring_details
        .as_ref()
        .and_then(|d| d.acquisition_completeness.as_ref());
    field_score_explanation(detail, &ACQUISITION_FIELD_LABELS)
}

/// Per-field enrichment scores as `Label: N%`, joined by commas.
pub fn enrichment_explanation(lead: &Lead) -> String {
    let detail = lead
        .joseph_scoring_details
        .as_ref()
        .and_then(|d| d.enrichment_completeness.as_ref());
    field_score_explanation(detail, &ENRICHMENT_FIELD_LABELS)
}

fn field_score_explanation(detail: Option<&CompletenessDetail>, labels: &[(&str, &str)]) -> String {
    let Some(field_scores) = detail
        .and_then(|d| d.details.as_ref())
        .and_then(|d| d.field_scores.as_ref())
    else {
        return "Individual field scores not available".to_string();
    };

    let entries: Vec<String> = field_scores
        .iter()
        .filter_map(|(key, score)| {
            labels
                .iter()
                .find(|(known, _)| known == key)
                .map(|(_, label)| {
                    format!(
                        "{}: {}%",
                        label,
                        value_text(score).unwrap_or_else(|| NOT_AVAILABLE.to_string())
                    )
                })
        })
        .collect();

    if entries.is_empty() {
        "No field scores available".to_string()
    } else {
        entries.join(", ")
    }
}

impl fmt::Display for LeadView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Lead Analysis: {} ===", self.lead_id)?;
        writeln!(f, "Lead Data")?;
        for (label, value) in &self.data_rows {
            writeln!(f, "  {}: {}", label, value)?;
        }
        writeln!(f, "Quality Flags")?;
        for (label, set) in &self.flags {
            writeln!(f, "  {}: {}", label, if *set { "Yes" } else { "No" })?;
        }
        writeln!(f, "Assessment Scores")?;
        writeln!(
            f,
            "  Acquisition Completeness: {}",
            with_percent(format_score(self.acquisition_score))
        )?;
        writeln!(f, "    {}", self.acquisition_explanation)?;
        writeln!(
            f,
            "  Enrichment Completeness: {}",
            with_percent(format_score(self.enrichment_score))
        )?;
        writeln!(f, "    {}", self.enrichment_explanation)?;
        writeln!(f, "  AI Coherence Score: {}", format_score(self.ai_score))?;
        if !self.explanation_bullets.is_empty() {
            writeln!(f, "    AI Explanation:")?;
            for bullet in &self.explanation_bullets {
                writeln!(f, "      • {}", bullet)?;
            }
        }
        if !self.corrections.is_empty() {
            writeln!(f, "    Corrections:")?;
            for (field, value) in &self.corrections {
                writeln!(f, "      {}: {}", field, value)?;
            }
        }
        if !self.inferences.is_empty() {
            writeln!(f, "    Inferences:")?;
            for (field, value) in &self.inferences {
                writeln!(f, "      {}: {}", field, value)?;
            }
        }
        write!(
            f,
            "  Final Confidence Score: {} (Weighted: 15% + 15% + 70%)",
            with_percent(format_int(self.final_score))
        )
    }
}

// ============ Batch view ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub avg_acquisition: Option<i64>,
    pub avg_enrichment: Option<i64>,
    /// Supplied by the backend, shown as-is.
    pub avg_confidence: Option<f64>,
    pub avg_final: Option<i64>,
}

impl SummaryView {
    pub fn new(scores: BatchSummary, server: &AnalysisSummary) -> Self {
        Self {
            avg_acquisition: scores.avg_acquisition,
            avg_enrichment: scores.avg_enrichment,
            avg_confidence: server.avg_confidence_score,
            avg_final: scores.avg_final,
        }
    }
}

/// Lead ID counts shown for Excel batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeadIdCounts {
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchView {
    pub processed: usize,
    pub summary: SummaryView,
    pub lead_id_counts: Option<LeadIdCounts>,
    pub leads: Vec<LeadView>,
}

/// Builds a batch view; each lead is scored with its own nested assessment.
pub fn batch_view(leads: &[Lead], server_summary: &AnalysisSummary) -> BatchView {
    BatchView {
        processed: leads.len(),
        summary: SummaryView::new(scoring::batch_summary(leads), server_summary),
        lead_id_counts: None,
        leads: leads
            .iter()
            .map(|lead| lead_view(lead, lead.confidence_assessment.as_ref()))
            .collect(),
    }
}

pub fn query_analysis_view(response: &QueryAnalysisResponse) -> BatchView {
    batch_view(&response.data.leads, &response.data.summary)
}

/// Excel batches also report how many Lead IDs the sheet held.
pub fn excel_analysis_view(response: &ExcelAnalysisResponse) -> BatchView {
    let validation = response.validation_summary.as_ref();
    let total = validation
        .and_then(|v| v.total_lead_ids)
        .or(response.data.summary.leads_analyzed)
        .unwrap_or(response.data.leads.len() as u64);
    let invalid = validation.and_then(|v| v.invalid_lead_ids).unwrap_or(0);

    let mut view = batch_view(&response.data.leads, &response.data.summary);
    view.lead_id_counts = Some(LeadIdCounts {
        total,
        valid: total.saturating_sub(invalid),
        invalid,
    });
    view
}

impl fmt::Display for BatchView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "✅ Batch Analysis Complete!")?;
        writeln!(f, "Processed {} leads successfully", self.processed)?;
        if let Some(counts) = self.lead_id_counts {
            writeln!(
                f,
                "Lead IDs: {} total, {} valid, {} invalid",
                counts.total, counts.valid, counts.invalid
            )?;
        }
        writeln!(f)?;
        writeln!(f, "📊 Summary Statistics")?;
        writeln!(
            f,
            "  Average Acquisition Score: {}",
            format_int(self.summary.avg_acquisition)
        )?;
        writeln!(
            f,
            "  Average Enrichment Score: {}",
            format_int(self.summary.avg_enrichment)
        )?;
        writeln!(
            f,
            "  Average AI Coherence Score: {}",
            format_score(self.summary.avg_confidence)
        )?;
        write!(
            f,
            "  Average Final Confidence Score: {} (Weighted: 15% + 15% + 70%)",
            format_int(self.summary.avg_final)
        )?;
        let total = self.leads.len();
        for (index, lead) in self.leads.iter().enumerate() {
            writeln!(f)?;
            writeln!(f)?;
            writeln!(f, "[{}/{}]", index + 1, total)?;
            write!(f, "{}", lead)?;
        }
        Ok(())
    }
}

// ============ Single lead ============

pub fn single_lead_view(response: &SingleLeadResponse) -> LeadView {
    lead_view(
        &response.lead_data,
        response.confidence_assessment.as_ref(),
    )
}

// ============ Excel validation ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationView {
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
    pub invalid_ids: Vec<String>,
    #[serde(skip)]
    pub outcome: ValidationOutcome,
}

pub fn validation_view(validation: &LeadIdValidation) -> ValidationView {
    ValidationView {
        total: validation.total_lead_ids,
        valid: validation.valid_lead_ids,
        invalid: validation.invalid_lead_ids,
        invalid_ids: validation
            .invalid_lead_ids_list
            .iter()
            .map(|id| value_text(id).unwrap_or_else(|| NOT_AVAILABLE.to_string()))
            .collect(),
        outcome: validation.outcome(),
    }
}

impl fmt::Display for ValidationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "✅ Validation Complete!")?;
        writeln!(f)?;
        writeln!(f, "📋 Validation Summary:")?;
        writeln!(f, "- Total Lead IDs found: {}", self.total)?;
        writeln!(f, "- Valid Lead IDs: {}", self.valid)?;
        write!(f, "- Invalid Lead IDs: {}", self.invalid)?;

        if !self.invalid_ids.is_empty() {
            writeln!(f)?;
            writeln!(f)?;
            writeln!(f, "❌ Invalid Lead IDs found:")?;
            for id in &self.invalid_ids {
                writeln!(f, "  • {}", id)?;
            }
        }

        match self.outcome {
            ValidationOutcome::AllValid => write!(
                f,
                "\n\n✅ All Lead IDs are valid! You can now proceed to analyze."
            ),
            ValidationOutcome::Partial => write!(
                f,
                "\n⚠️ Partial validation detected. Analysis will proceed with {} valid Lead IDs only.\n📋 Invalid Lead IDs ({}) will be marked in red in the export.",
                self.valid, self.invalid
            ),
            ValidationOutcome::Rejected => write!(
                f,
                "\n❌ No valid Lead IDs found. Please check your data and try again."
            ),
        }
    }
}

// ============ Plain messages ============

/// Preview panel text: the full response followed by the next-step hint.
pub fn preview_text(response: &PreviewResponse) -> String {
    let pretty = serde_json::to_string_pretty(response)
        .unwrap_or_else(|_| format!("total_found: {}", response.data.total_found));
    format!(
        "✅ Preview Results:\n\n{}\n\n✅ Query successful! You can now proceed to analyze the leads.",
        pretty
    )
}

pub fn parse_text(data: &ExcelParseData) -> String {
    format!(
        "✅ File parsed successfully! Found {} rows in {} sheet(s).\n\nSelect the sheet and Lead ID column, then validate the Lead IDs.",
        data.total_rows,
        data.sheet_names.len()
    )
}

/// View of a stored result, whatever its slot.
pub fn result_view(result: &WorkflowResult) -> PanelBody {
    match result {
        WorkflowResult::QueryPreview(preview) => PanelBody::Text(preview_text(preview)),
        WorkflowResult::QueryAnalysis(analysis) => PanelBody::Batch(query_analysis_view(analysis)),
        WorkflowResult::SingleLead(lead) => PanelBody::Lead(single_lead_view(lead)),
        WorkflowResult::ExcelAnalysis(analysis) => PanelBody::Batch(excel_analysis_view(analysis)),
    }
}
