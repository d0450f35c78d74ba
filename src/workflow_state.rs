//! Last good result of each workflow, plus the Excel session.
//!
//! Every slot carries a generation counter. Starting a request or changing an
//! input the slot depends on bumps it, so a response that comes back after
//! the inputs moved on can be recognised and dropped instead of overwriting
//! newer state.

use crate::models::{
    ExcelAnalysisResponse, ExcelParseData, ExcelSelection, ExcelUpload, LeadIdValidation,
    PreviewResponse, QueryAnalysisResponse, SingleLeadResponse, ValidationOutcome,
};

/// One of the four independent result channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    QueryPreview,
    QueryAnalysis,
    SingleLead,
    ExcelAnalysis,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::QueryPreview => 0,
            Slot::QueryAnalysis => 1,
            Slot::SingleLead => 2,
            Slot::ExcelAnalysis => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Slot::QueryPreview => "query preview",
            Slot::QueryAnalysis => "query analysis",
            Slot::SingleLead => "single lead",
            Slot::ExcelAnalysis => "Excel",
        }
    }
}

/// A stored result, tagged with the slot it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowResult {
    QueryPreview(PreviewResponse),
    QueryAnalysis(QueryAnalysisResponse),
    SingleLead(SingleLeadResponse),
    ExcelAnalysis(ExcelAnalysisResponse),
}

impl WorkflowResult {
    pub fn slot(&self) -> Slot {
        match self {
            WorkflowResult::QueryPreview(_) => Slot::QueryPreview,
            WorkflowResult::QueryAnalysis(_) => Slot::QueryAnalysis,
            WorkflowResult::SingleLead(_) => Slot::SingleLead,
            WorkflowResult::ExcelAnalysis(_) => Slot::ExcelAnalysis,
        }
    }
}

/// Token identifying the request a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    slot: Slot,
    value: u64,
}

impl Generation {
    pub fn slot(&self) -> Slot {
        self.slot
    }
}

#[derive(Debug, Default)]
struct SlotEntry {
    result: Option<WorkflowResult>,
    generation: u64,
}

/// State shared by every Excel step.
#[derive(Debug, Clone, Default)]
pub struct ExcelSession {
    /// The selected spreadsheet, re-sent by parse, validate, analyze and export.
    pub file: Option<ExcelUpload>,
    /// Sheet names and headers from the parse step.
    pub metadata: Option<ExcelParseData>,
    pub selection: ExcelSelection,
    /// Last Lead ID validation for the current selection.
    pub validation: Option<LeadIdValidation>,
}

impl ExcelSession {
    /// Whether the validate step has cleared the way for analysis.
    pub fn analysis_allowed(&self) -> bool {
        self.validation
            .as_ref()
            .map(|v| v.outcome().allows_analysis())
            .unwrap_or(false)
    }

    pub fn validation_outcome(&self) -> Option<ValidationOutcome> {
        self.validation.as_ref().map(LeadIdValidation::outcome)
    }
}

#[derive(Debug, Default)]
pub struct WorkflowState {
    entries: [SlotEntry; 4],
    excel: ExcelSession,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a result in its slot, replacing whatever was there.
    pub fn set(&mut self, result: WorkflowResult) {
        let slot = result.slot();
        self.entries[slot.index()].result = Some(result);
    }

    pub fn clear(&mut self, slot: Slot) {
        self.entries[slot.index()].result = None;
    }

    pub fn get(&self, slot: Slot) -> Option<&WorkflowResult> {
        self.entries[slot.index()].result.as_ref()
    }

    pub fn is_set(&self, slot: Slot) -> bool {
        self.get(slot).is_some()
    }

    /// Starts a request for `slot`: clears its result and returns the token the
    /// response must present to be applied.
    pub fn begin(&mut self, slot: Slot) -> Generation {
        self.invalidate(slot);
        Generation {
            slot,
            value: self.entries[slot.index()].generation,
        }
    }

    /// Clears `slot` and makes every outstanding token for it stale.
    pub fn invalidate(&mut self, slot: Slot) {
        let entry = &mut self.entries[slot.index()];
        entry.result = None;
        entry.generation += 1;
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.entries[generation.slot.index()].generation == generation.value
    }

    /// Stores `result` only if `generation` is still current.
    pub fn apply(&mut self, generation: Generation, result: WorkflowResult) -> bool {
        if generation.slot != result.slot() || !self.is_current(generation) {
            return false;
        }
        self.set(result);
        true
    }

    pub fn query_preview(&self) -> Option<&PreviewResponse> {
        match self.get(Slot::QueryPreview) {
            Some(WorkflowResult::QueryPreview(preview)) => Some(preview),
            _ => None,
        }
    }

    pub fn query_analysis(&self) -> Option<&QueryAnalysisResponse> {
        match self.get(Slot::QueryAnalysis) {
            Some(WorkflowResult::QueryAnalysis(analysis)) => Some(analysis),
            _ => None,
        }
    }

    pub fn single_lead(&self) -> Option<&SingleLeadResponse> {
        match self.get(Slot::SingleLead) {
            Some(WorkflowResult::SingleLead(lead)) => Some(lead),
            _ => None,
        }
    }

    pub fn excel_analysis(&self) -> Option<&ExcelAnalysisResponse> {
        match self.get(Slot::ExcelAnalysis) {
            Some(WorkflowResult::ExcelAnalysis(analysis)) => Some(analysis),
            _ => None,
        }
    }

    pub fn excel(&self) -> &ExcelSession {
        &self.excel
    }

    /// Replaces the selected spreadsheet and resets everything derived from it.
    pub fn select_excel_file(&mut self, file: Option<ExcelUpload>) {
        self.excel = ExcelSession {
            file,
            ..Default::default()
        };
        self.invalidate(Slot::ExcelAnalysis);
    }

    /// Changes the sheet / Lead ID column. Validation and analysis no longer apply.
    pub fn select_excel_target(&mut self, selection: ExcelSelection) {
        self.excel.selection = selection;
        self.excel.validation = None;
        self.invalidate(Slot::ExcelAnalysis);
    }

    /// Stores parse metadata and preselects the first sheet.
    pub fn set_excel_metadata(&mut self, metadata: ExcelParseData) {
        self.excel.selection = ExcelSelection {
            sheet_name: metadata.sheet_names.first().cloned().unwrap_or_default(),
            lead_id_column: String::new(),
        };
        self.excel.metadata = Some(metadata);
        self.excel.validation = None;
    }

    pub fn clear_excel_metadata(&mut self) {
        self.excel.metadata = None;
        self.excel.validation = None;
    }

    pub fn set_excel_validation(&mut self, validation: LeadIdValidation) {
        self.excel.validation = Some(validation);
    }

    pub fn clear_excel_validation(&mut self) {
        self.excel.validation = None;
    }
}
