//! Request orchestration for the four workflows.
//!
//! Every action is split in two: `begin_*` validates locally, marks the
//! control busy and hands out a [`Ticket`]; `finish_*` takes the ticket and
//! the backend result and either applies it or, when the inputs moved on in
//! the meantime, discards it. The async methods of the same name do both
//! around a single backend call. Drivers that want several slots in flight
//! at once call `begin_*`, await [`RequestController::client`] themselves and
//! feed the results back in any order.

use crate::client::ScoringApiClient;
use crate::config::Config;
use crate::download::SavedExport;
use crate::errors::AppError;
use crate::export::{ExportRequest, ExportTrigger};
use crate::models::{
    AnalyzeQueryRequest, ExcelAnalysisResponse, ExcelParseResponse, ExcelSelection, ExcelUpload,
    LeadIdValidationResponse, PreviewQueryRequest, PreviewResponse, QueryAnalysisResponse,
    SingleLeadResponse, ValidationOutcome,
};
use crate::render;
use crate::ui::{Affordances, Control, Panel, PanelBody, PanelId, Panels, Tone};
use crate::workflow_state::{Generation, Slot, WorkflowResult, WorkflowState};

pub const PREVIEW_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 1..=1000;
pub const MAX_ANALYZE_RANGE: std::ops::RangeInclusive<u32> = 1..=500;
pub const LEAD_ID_LENGTH: std::ops::RangeInclusive<usize> = 15..=18;

/// Raw text of the form inputs, parsed when an action starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInputs {
    pub soql_query: String,
    pub preview_limit: String,
    pub max_analyze: String,
    pub lead_id: String,
}

impl Default for FormInputs {
    fn default() -> Self {
        Self {
            soql_query: String::new(),
            preview_limit: "100".to_string(),
            max_analyze: "10".to_string(),
            lead_id: String::new(),
        }
    }
}

/// Parses an integer input and checks it against `range`.
fn parse_bounded(input: &str, range: &std::ops::RangeInclusive<u32>) -> Option<u32> {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|value| range.contains(value))
}

/// Proof that a request was started, carried back to `finish_*`.
#[derive(Debug, Clone)]
pub struct Ticket<R> {
    control: Control,
    generation: Generation,
    request: R,
}

impl<R> Ticket<R> {
    pub fn control(&self) -> Control {
        self.control
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn request(&self) -> &R {
        &self.request
    }
}

/// What `finish_*` did with a successful or failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The inputs changed while the request was in flight.
    Discarded,
}

/// Payload of the validate and analyze Excel steps.
#[derive(Debug, Clone)]
pub struct ExcelStep {
    pub file: ExcelUpload,
    pub selection: ExcelSelection,
    pub max_analyze: u32,
}

#[derive(Debug, Clone)]
pub struct ExportTicket {
    control: Control,
    request: ExportRequest,
}

impl ExportTicket {
    pub fn request(&self) -> &ExportRequest {
        &self.request
    }
}

pub struct RequestController {
    client: ScoringApiClient,
    exporter: ExportTrigger,
    state: WorkflowState,
    ui: Affordances,
    panels: Panels,
    inputs: FormInputs,
    excel_max_analyze: u32,
    /// Last export alert, if any.
    notice: Option<String>,
}

impl RequestController {
    pub fn new(client: ScoringApiClient, exporter: ExportTrigger, excel_max_analyze: u32) -> Self {
        let mut controller = Self {
            client,
            exporter,
            state: WorkflowState::new(),
            ui: Affordances::default(),
            panels: Panels::default(),
            inputs: FormInputs::default(),
            excel_max_analyze,
            notice: None,
        };
        controller.sync_affordances();
        controller
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Self::new(
            ScoringApiClient::from_config(config)?,
            ExportTrigger::from_config(config),
            config.excel_max_analyze,
        ))
    }

    pub fn client(&self) -> &ScoringApiClient {
        &self.client
    }

    pub fn exporter(&self) -> &ExportTrigger {
        &self.exporter
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn affordances(&self) -> &Affordances {
        &self.ui
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        self.ui.is_enabled(control)
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get(id)
    }

    pub fn inputs(&self) -> &FormInputs {
        &self.inputs
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    // ============ Inputs ============

    pub fn set_soql_query(&mut self, query: impl Into<String>) {
        self.inputs.soql_query = query.into();
        self.state.invalidate(Slot::QueryPreview);
        self.state.invalidate(Slot::QueryAnalysis);
        self.sync_affordances();
    }

    pub fn set_preview_limit(&mut self, limit: impl Into<String>) {
        self.inputs.preview_limit = limit.into();
        self.state.invalidate(Slot::QueryPreview);
        self.sync_affordances();
    }

    pub fn set_max_analyze(&mut self, max: impl Into<String>) {
        self.inputs.max_analyze = max.into();
        self.state.invalidate(Slot::QueryAnalysis);
        self.sync_affordances();
    }

    pub fn set_lead_id(&mut self, lead_id: impl Into<String>) {
        self.inputs.lead_id = lead_id.into();
        self.state.invalidate(Slot::SingleLead);
        self.sync_affordances();
    }

    /// Selects (or deselects) the spreadsheet, resetting the Excel workflow.
    pub fn select_excel_file(&mut self, file: Option<ExcelUpload>) {
        self.state.select_excel_file(file);
        self.sync_affordances();
    }

    pub fn select_sheet(&mut self, sheet_name: impl Into<String>) {
        let selection = ExcelSelection {
            sheet_name: sheet_name.into(),
            ..self.state.excel().selection.clone()
        };
        self.state.select_excel_target(selection);
        self.sync_affordances();
    }

    pub fn select_lead_id_column(&mut self, column: impl Into<String>) {
        let selection = ExcelSelection {
            lead_id_column: column.into(),
            ..self.state.excel().selection.clone()
        };
        self.state.select_excel_target(selection);
        self.sync_affordances();
    }

    // ============ Query preview ============

    pub fn begin_preview_query(&mut self) -> Result<Ticket<PreviewQueryRequest>, AppError> {
        let control = Control::PreviewQuery;
        self.ensure_idle(control)?;

        let preview_limit = parse_bounded(&self.inputs.preview_limit, &PREVIEW_LIMIT_RANGE)
            .ok_or_else(|| {
                self.reject(control, "Preview limit must be a number between 1 and 1000.")
            })?;

        let request = PreviewQueryRequest {
            soql_query: self.inputs.soql_query.trim().to_string(),
            preview_limit,
        };
        // A new preview supersedes any analysis built on the old one.
        self.state.invalidate(Slot::QueryAnalysis);
        Ok(self.start(control, "Previewing query results...", request))
    }

    pub fn finish_preview_query(
        &mut self,
        ticket: Ticket<PreviewQueryRequest>,
        result: Result<PreviewResponse, AppError>,
    ) -> Result<Outcome, AppError> {
        self.finish(ticket.control, ticket.generation, result, |state, preview| {
            store(state, WorkflowResult::QueryPreview(preview))
        })
    }

    pub async fn preview_query(&mut self) -> Result<Outcome, AppError> {
        let ticket = self.begin_preview_query()?;
        let result = self.client.preview_query(ticket.request()).await;
        self.finish_preview_query(ticket, result)
    }

    // ============ Query analysis ============

    pub fn begin_analyze_query(&mut self) -> Result<Ticket<AnalyzeQueryRequest>, AppError> {
        let control = Control::AnalyzeQuery;
        self.ensure_idle(control)?;

        let total_found = self
            .state
            .query_preview()
            .map(|preview| preview.data.total_found)
            .ok_or_else(|| {
                self.reject(
                    control,
                    "Please run the preview first to see which leads will be analyzed.",
                )
            })?;
        let max_analyze = parse_bounded(&self.inputs.max_analyze, &MAX_ANALYZE_RANGE)
            .ok_or_else(|| {
                self.reject(control, "Max leads to analyze must be a number between 1 and 500.")
            })?;

        let request = AnalyzeQueryRequest {
            soql_query: self.inputs.soql_query.trim().to_string(),
            max_analyze,
            include_ai_assessment: true,
        };
        let loading = format!(
            "Analyzing first {} leads from {} total leads found (with AI confidence scoring)...",
            max_analyze, total_found
        );
        Ok(self.start(control, &loading, request))
    }

    pub fn finish_analyze_query(
        &mut self,
        ticket: Ticket<AnalyzeQueryRequest>,
        result: Result<QueryAnalysisResponse, AppError>,
    ) -> Result<Outcome, AppError> {
        self.finish(ticket.control, ticket.generation, result, |state, analysis| {
            store(state, WorkflowResult::QueryAnalysis(analysis))
        })
    }

    pub async fn analyze_query(&mut self) -> Result<Outcome, AppError> {
        let ticket = self.begin_analyze_query()?;
        let result = self.client.analyze_query(ticket.request()).await;
        self.finish_analyze_query(ticket, result)
    }

    // ============ Single lead ============

    pub fn begin_lookup_lead(&mut self) -> Result<Ticket<String>, AppError> {
        let control = Control::LookupLead;
        self.ensure_idle(control)?;

        let lead_id = self.inputs.lead_id.trim().to_string();
        if lead_id.is_empty() {
            return Err(self.reject(control, "Please enter a Salesforce Lead ID."));
        }
        if !LEAD_ID_LENGTH.contains(&lead_id.chars().count()) {
            return Err(self.reject(control, "Lead ID must be 15-18 characters long."));
        }

        Ok(self.start(
            control,
            "Getting lead data and generating confidence assessment...",
            lead_id,
        ))
    }

    pub fn finish_lookup_lead(
        &mut self,
        ticket: Ticket<String>,
        result: Result<SingleLeadResponse, AppError>,
    ) -> Result<Outcome, AppError> {
        self.finish(ticket.control, ticket.generation, result, |state, lead| {
            store(state, WorkflowResult::SingleLead(lead))
        })
    }

    pub async fn lookup_lead(&mut self) -> Result<Outcome, AppError> {
        let ticket = self.begin_lookup_lead()?;
        let result = self.client.lead_confidence(ticket.request()).await;
        self.finish_lookup_lead(ticket, result)
    }

    // ============ Excel ============

    pub fn begin_parse_excel(&mut self) -> Result<Ticket<ExcelUpload>, AppError> {
        let control = Control::ParseExcel;
        self.ensure_idle(control)?;

        let file = self
            .state
            .excel()
            .file
            .clone()
            .ok_or_else(|| self.reject(control, "Please select an Excel file first."))?;

        self.state.clear_excel_metadata();
        Ok(self.start(control, "Parsing Excel file...", file))
    }

    pub fn finish_parse_excel(
        &mut self,
        ticket: Ticket<ExcelUpload>,
        result: Result<ExcelParseResponse, AppError>,
    ) -> Result<Outcome, AppError> {
        self.finish(ticket.control, ticket.generation, result, |state, parsed| {
            let panel = Panel::text(Tone::Success, render::parse_text(&parsed.data));
            state.set_excel_metadata(parsed.data);
            panel
        })
    }

    pub async fn parse_excel(&mut self) -> Result<Outcome, AppError> {
        let ticket = self.begin_parse_excel()?;
        let result = self.client.parse_excel(ticket.request()).await;
        self.finish_parse_excel(ticket, result)
    }

    pub fn begin_validate_lead_ids(&mut self) -> Result<Ticket<ExcelStep>, AppError> {
        let control = Control::ValidateLeadIds;
        self.ensure_idle(control)?;

        let (file, selection, _) = self.excel_inputs();
        let Some(file) = file else {
            return Err(self.reject(control, "Please parse the Excel file first."));
        };
        if !selection.is_complete() {
            return Err(self.reject(control, "Please select both sheet and Lead ID column."));
        }

        self.state.clear_excel_validation();
        let step = ExcelStep {
            file,
            selection,
            max_analyze: self.excel_max_analyze,
        };
        Ok(self.start(control, "Validating Lead IDs with Salesforce...", step))
    }

    pub fn finish_validate_lead_ids(
        &mut self,
        ticket: Ticket<ExcelStep>,
        result: Result<LeadIdValidationResponse, AppError>,
    ) -> Result<Outcome, AppError> {
        self.finish(ticket.control, ticket.generation, result, |state, validation| {
            let view = render::validation_view(&validation.data);
            let tone = match view.outcome {
                ValidationOutcome::AllValid => Tone::Success,
                ValidationOutcome::Partial => Tone::Warning,
                ValidationOutcome::Rejected => Tone::Error,
            };
            state.set_excel_validation(validation.data);
            Panel::new(tone, PanelBody::Validation(view))
        })
    }

    pub async fn validate_lead_ids(&mut self) -> Result<Outcome, AppError> {
        let ticket = self.begin_validate_lead_ids()?;
        let step = ticket.request();
        let result = self
            .client
            .validate_lead_ids(&step.file, &step.selection)
            .await;
        self.finish_validate_lead_ids(ticket, result)
    }

    pub fn begin_analyze_excel(&mut self) -> Result<Ticket<ExcelStep>, AppError> {
        let control = Control::AnalyzeExcel;
        self.ensure_idle(control)?;

        let (file, selection, analysis_allowed) = self.excel_inputs();
        let Some(file) = file else {
            return Err(self.reject(control, "Please parse and validate the Excel file first."));
        };
        if !selection.is_complete() {
            return Err(self.reject(control, "Please select both sheet and Lead ID column."));
        }
        if !analysis_allowed {
            return Err(self.reject(control, "Please parse and validate the Excel file first."));
        }

        let step = ExcelStep {
            file,
            selection,
            max_analyze: self.excel_max_analyze,
        };
        Ok(self.start(
            control,
            "Analyzing all leads from Excel file with AI confidence scoring...",
            step,
        ))
    }

    pub fn finish_analyze_excel(
        &mut self,
        ticket: Ticket<ExcelStep>,
        result: Result<ExcelAnalysisResponse, AppError>,
    ) -> Result<Outcome, AppError> {
        self.finish(ticket.control, ticket.generation, result, |state, analysis| {
            store(state, WorkflowResult::ExcelAnalysis(analysis))
        })
    }

    pub async fn analyze_excel(&mut self) -> Result<Outcome, AppError> {
        let ticket = self.begin_analyze_excel()?;
        let step = ticket.request();
        let result = self
            .client
            .analyze_excel(&step.file, &step.selection, step.max_analyze, true)
            .await;
        self.finish_analyze_excel(ticket, result)
    }

    // ============ Export ============

    /// Starts an export of `slot`.
    ///
    /// Nothing is sent when the slot holds no result; the alert is kept in
    /// [`RequestController::notice`].
    pub fn begin_export(&mut self, slot: Slot) -> Result<ExportTicket, AppError> {
        self.notice = None;
        if let Some(control) = Control::export_for(slot) {
            self.ensure_idle(control)?;
        }

        let request = match self.exporter.prepare(&self.state, slot) {
            Ok(request) => request,
            Err(err) => {
                self.notice = Some(err.export_notice());
                return Err(err);
            }
        };
        let control = Control::export_for(request.slot())
            .ok_or_else(|| AppError::Validation(format!("{} cannot be exported", slot.label())))?;

        self.ui.mark_busy(control);
        Ok(ExportTicket { control, request })
    }

    pub fn finish_export(
        &mut self,
        ticket: ExportTicket,
        result: Result<SavedExport, AppError>,
    ) -> Result<SavedExport, AppError> {
        self.ui.release(ticket.control);
        self.sync_affordances();
        if let Err(ref err) = result {
            tracing::error!("Export of {} failed: {}", ticket.request.slot().label(), err);
            self.notice = Some(err.export_notice());
        }
        result
    }

    pub async fn export(&mut self, slot: Slot) -> Result<SavedExport, AppError> {
        let ticket = self.begin_export(slot)?;
        let result = self.exporter.send(&self.client, ticket.request()).await;
        self.finish_export(ticket, result)
    }

    // ============ Internals ============

    /// The parsed file (only once parsing succeeded), the current selection
    /// and whether validation allows analysis.
    fn excel_inputs(&self) -> (Option<ExcelUpload>, ExcelSelection, bool) {
        let session = self.state.excel();
        let file = session
            .metadata
            .as_ref()
            .and(session.file.clone());
        (file, session.selection.clone(), session.analysis_allowed())
    }

    fn max_analyze_input(&self) -> Option<u32> {
        self.inputs.max_analyze.trim().parse::<u32>().ok()
    }

    fn sync_affordances(&mut self) {
        let max_analyze = self.max_analyze_input();
        self.ui.sync(&self.state, max_analyze);
    }

    /// One request per slot at a time. Exports only block themselves.
    fn ensure_idle(&self, control: Control) -> Result<(), AppError> {
        let busy = if Control::export_for(control.slot()) == Some(control) {
            self.ui.is_busy(control)
        } else {
            self.ui.slot_busy(control.slot())
        };
        if busy {
            Err(AppError::Busy(control.slot()))
        } else {
            Ok(())
        }
    }

    /// Shows a local validation message. Workflow state is left alone.
    fn reject(&mut self, control: Control, message: &str) -> AppError {
        tracing::debug!("Rejected {:?}: {}", control, message);
        self.panels
            .show(control.panel(), Panel::text(Tone::Error, message));
        AppError::Validation(message.to_string())
    }

    fn start<R>(&mut self, control: Control, loading: &str, request: R) -> Ticket<R> {
        let generation = self.state.begin(control.slot());
        self.ui.mark_busy(control);
        self.panels
            .show(control.panel(), Panel::text(Tone::Loading, loading));
        self.sync_affordances();
        Ticket {
            control,
            generation,
            request,
        }
    }

    fn finish<T>(
        &mut self,
        control: Control,
        generation: Generation,
        result: Result<T, AppError>,
        apply: impl FnOnce(&mut WorkflowState, T) -> Panel,
    ) -> Result<Outcome, AppError> {
        self.ui.release(control);

        if !self.state.is_current(generation) {
            tracing::warn!(
                "Discarding stale {} response, inputs changed while it was in flight",
                control.slot().label()
            );
            self.settle_panel(control.panel());
            self.sync_affordances();
            return Ok(Outcome::Discarded);
        }

        let outcome = match result {
            Ok(response) => {
                let panel = apply(&mut self.state, response);
                self.panels.show(control.panel(), panel);
                tracing::info!("✓ {:?} completed", control);
                Ok(Outcome::Applied)
            }
            Err(err) => {
                tracing::error!("{:?} failed: {}", control, err);
                self.state.clear(control.slot());
                match control {
                    Control::ParseExcel => self.state.clear_excel_metadata(),
                    Control::ValidateLeadIds => self.state.clear_excel_validation(),
                    _ => {}
                }
                self.panels
                    .show(control.panel(), Panel::text(Tone::Error, failure_text(control, &err)));
                Err(err)
            }
        };
        self.sync_affordances();
        outcome
    }

    /// Drops a loading message nobody is going to replace.
    fn settle_panel(&mut self, id: PanelId) {
        let loading = matches!(self.panels.get(id), Some(panel) if panel.tone == Tone::Loading);
        let in_flight = Control::ALL
            .iter()
            .any(|c| c.panel() == id && self.ui.is_busy(*c));
        if loading && !in_flight {
            self.panels.clear(id);
        }
    }
}

/// Stores a successful result and returns the panel showing it.
fn store(state: &mut WorkflowState, result: WorkflowResult) -> Panel {
    let panel = Panel::new(Tone::Success, render::result_view(&result));
    state.set(result);
    panel
}

fn failure_text(control: Control, err: &AppError) -> String {
    match (control, err) {
        (Control::ValidateLeadIds, AppError::Remote { .. }) => {
            format!("❌ Validation failed!\n\n{}", err.display_body())
        }
        _ => err.display_body(),
    }
}
