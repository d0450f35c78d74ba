//! Control affordances and result panels.
//!
//! Controls never store their own enabled flag: [`Affordances::sync`]
//! derives it from [`WorkflowState`] after every transition, so a control can
//! only be enabled while the result it depends on is present.

use std::fmt;

use crate::render::{BatchView, LeadView, ValidationView};
use crate::workflow_state::{Slot, WorkflowState};

/// A user-triggerable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    PreviewQuery,
    AnalyzeQuery,
    ExportQuery,
    LookupLead,
    ExportLead,
    ParseExcel,
    ValidateLeadIds,
    AnalyzeExcel,
    ExportExcel,
}

impl Control {
    pub const ALL: [Control; 9] = [
        Control::PreviewQuery,
        Control::AnalyzeQuery,
        Control::ExportQuery,
        Control::LookupLead,
        Control::ExportLead,
        Control::ParseExcel,
        Control::ValidateLeadIds,
        Control::AnalyzeExcel,
        Control::ExportExcel,
    ];

    fn index(self) -> usize {
        match self {
            Control::PreviewQuery => 0,
            Control::AnalyzeQuery => 1,
            Control::ExportQuery => 2,
            Control::LookupLead => 3,
            Control::ExportLead => 4,
            Control::ParseExcel => 5,
            Control::ValidateLeadIds => 6,
            Control::AnalyzeExcel => 7,
            Control::ExportExcel => 8,
        }
    }

    pub fn idle_label(self) -> &'static str {
        match self {
            Control::PreviewQuery => "1. Preview Query",
            Control::AnalyzeQuery | Control::LookupLead => "Get Confidence Assessment",
            Control::ExportQuery | Control::ExportLead => "📊 Export to Excel",
            Control::ParseExcel => "1. Parse File",
            Control::ValidateLeadIds => "2. Validate Lead IDs",
            Control::AnalyzeExcel => "3. Analyze All Leads",
            Control::ExportExcel => "📊 Export Results",
        }
    }

    pub fn busy_label(self) -> &'static str {
        match self {
            Control::PreviewQuery => "Previewing...",
            Control::AnalyzeQuery | Control::LookupLead | Control::AnalyzeExcel => "Analyzing...",
            Control::ValidateLeadIds => "Validating...",
            Control::ParseExcel => "Parsing...",
            Control::ExportQuery | Control::ExportLead | Control::ExportExcel => "Exporting...",
        }
    }

    /// The result slot this control reads or writes.
    pub fn slot(self) -> Slot {
        match self {
            Control::PreviewQuery => Slot::QueryPreview,
            Control::AnalyzeQuery | Control::ExportQuery => Slot::QueryAnalysis,
            Control::LookupLead | Control::ExportLead => Slot::SingleLead,
            Control::ParseExcel
            | Control::ValidateLeadIds
            | Control::AnalyzeExcel
            | Control::ExportExcel => Slot::ExcelAnalysis,
        }
    }

    pub fn panel(self) -> PanelId {
        match self.slot() {
            Slot::QueryPreview | Slot::QueryAnalysis => PanelId::Query,
            Slot::SingleLead => PanelId::Confidence,
            Slot::ExcelAnalysis => PanelId::Excel,
        }
    }

    /// The export control of `slot`, if the slot can be exported.
    pub fn export_for(slot: Slot) -> Option<Control> {
        match slot {
            Slot::QueryPreview => None,
            Slot::QueryAnalysis => Some(Control::ExportQuery),
            Slot::SingleLead => Some(Control::ExportLead),
            Slot::ExcelAnalysis => Some(Control::ExportExcel),
        }
    }
}

/// Label for the query analyze control.
///
/// Shows how many leads will be analyzed once a preview is known: the smaller
/// of the preview count and the max-analyze input, or the preview count alone
/// when max-analyze does not parse.
pub fn analyze_label(total_found: Option<u64>, max_analyze: Option<u32>) -> String {
    match total_found {
        Some(total) => {
            let count = max_analyze
                .map(|max| total.min(u64::from(max)))
                .unwrap_or(total);
            format!("Get Confidence Assessment ({} leads)", count)
        }
        None => Control::AnalyzeQuery.idle_label().to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordance {
    pub enabled: bool,
    pub busy: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordances {
    controls: [Affordance; 9],
}

impl Default for Affordances {
    fn default() -> Self {
        let mut affordances = Self {
            controls: Control::ALL.map(|control| Affordance {
                enabled: false,
                busy: false,
                label: control.idle_label().to_string(),
            }),
        };
        affordances.sync(&WorkflowState::default(), None);
        affordances
    }
}

impl Affordances {
    pub fn get(&self, control: Control) -> &Affordance {
        &self.controls[control.index()]
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        self.get(control).enabled
    }

    pub fn is_busy(&self, control: Control) -> bool {
        self.get(control).busy
    }

    pub fn label(&self, control: Control) -> &str {
        &self.get(control).label
    }

    /// True while any control that writes `slot` is in flight.
    pub fn slot_busy(&self, slot: Slot) -> bool {
        Control::ALL
            .iter()
            .any(|c| c.slot() == slot && self.is_busy(*c) && Control::export_for(slot) != Some(*c))
    }

    /// Disables `control` and swaps in its busy label.
    pub fn mark_busy(&mut self, control: Control) {
        let affordance = &mut self.controls[control.index()];
        affordance.busy = true;
        affordance.enabled = false;
        affordance.label = control.busy_label().to_string();
    }

    /// Returns `control` to its idle label. Call [`Affordances::sync`] after.
    pub fn release(&mut self, control: Control) {
        let affordance = &mut self.controls[control.index()];
        affordance.busy = false;
        affordance.label = control.idle_label().to_string();
    }

    /// Recomputes every enabled flag from `state`.
    ///
    /// `max_analyze` is the parsed max-analyze input, used for the query
    /// analyze label.
    pub fn sync(&mut self, state: &WorkflowState, max_analyze: Option<u32>) {
        let excel = state.excel();
        let total_found = state.query_preview().map(|p| p.data.total_found);
        // Parse, validate and analyze share one in-flight gate.
        let excel_idle = !self.slot_busy(Slot::ExcelAnalysis);
        for control in Control::ALL {
            let precondition = match control {
                Control::PreviewQuery | Control::LookupLead => true,
                Control::AnalyzeQuery => state.is_set(Slot::QueryPreview),
                Control::ExportQuery => state.is_set(Slot::QueryAnalysis),
                Control::ExportLead => state.is_set(Slot::SingleLead),
                Control::ParseExcel => excel_idle && excel.file.is_some(),
                Control::ValidateLeadIds => excel_idle && excel.metadata.is_some(),
                Control::AnalyzeExcel => excel_idle && excel.analysis_allowed(),
                Control::ExportExcel => state.is_set(Slot::ExcelAnalysis),
            };
            let affordance = &mut self.controls[control.index()];
            affordance.enabled = precondition && !affordance.busy;
            if !affordance.busy && control == Control::AnalyzeQuery {
                affordance.label = analyze_label(total_found, max_analyze);
            }
        }
    }
}

// ============ Panels ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelId {
    Query,
    Confidence,
    Excel,
}

impl PanelId {
    fn index(self) -> usize {
        match self {
            PanelId::Query => 0,
            PanelId::Confidence => 1,
            PanelId::Excel => 2,
        }
    }
}

/// Visual treatment of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Loading,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    Text(String),
    Lead(LeadView),
    Batch(BatchView),
    Validation(ValidationView),
}

impl fmt::Display for PanelBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelBody::Text(text) => write!(f, "{}", text),
            PanelBody::Lead(view) => write!(f, "{}", view),
            PanelBody::Batch(view) => write!(f, "{}", view),
            PanelBody::Validation(view) => write!(f, "{}", view),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub tone: Tone,
    pub body: PanelBody,
}

impl Panel {
    pub fn new(tone: Tone, body: PanelBody) -> Self {
        Self { tone, body }
    }

    pub fn text(tone: Tone, text: impl Into<String>) -> Self {
        Self::new(tone, PanelBody::Text(text.into()))
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}

/// The three result panels. Each shows the last thing written to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panels {
    panels: [Option<Panel>; 3],
}

impl Panels {
    pub fn show(&mut self, id: PanelId, panel: Panel) {
        self.panels[id.index()] = Some(panel);
    }

    pub fn clear(&mut self, id: PanelId) {
        self.panels[id.index()] = None;
    }

    pub fn get(&self, id: PanelId) -> Option<&Panel> {
        self.panels[id.index()].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_affordances() {
        let ui = Affordances::default();
        assert!(ui.is_enabled(Control::PreviewQuery));
        assert!(ui.is_enabled(Control::LookupLead));
        assert!(!ui.is_enabled(Control::AnalyzeQuery));
        assert!(!ui.is_enabled(Control::ExportQuery));
        assert!(!ui.is_enabled(Control::ParseExcel));
        assert_eq!(ui.label(Control::ParseExcel), "1. Parse File");
    }

    #[test]
    fn test_busy_then_release_restores_label() {
        let mut ui = Affordances::default();
        ui.mark_busy(Control::PreviewQuery);
        assert!(ui.is_busy(Control::PreviewQuery));
        assert!(!ui.is_enabled(Control::PreviewQuery));
        assert_eq!(ui.label(Control::PreviewQuery), "Previewing...");
        assert!(ui.slot_busy(Slot::QueryPreview));

        ui.release(Control::PreviewQuery);
        ui.sync(&WorkflowState::default(), None);
        assert!(ui.is_enabled(Control::PreviewQuery));
        assert_eq!(ui.label(Control::PreviewQuery), "1. Preview Query");
    }

    #[test]
    fn test_export_in_flight_does_not_mark_slot_busy() {
        let mut ui = Affordances::default();
        ui.mark_busy(Control::ExportQuery);
        assert!(!ui.slot_busy(Slot::QueryAnalysis));
    }

    #[test]
    fn test_analyze_label() {
        assert_eq!(analyze_label(None, Some(10)), "Get Confidence Assessment");
        assert_eq!(
            analyze_label(Some(42), Some(10)),
            "Get Confidence Assessment (10 leads)"
        );
        assert_eq!(
            analyze_label(Some(3), Some(10)),
            "Get Confidence Assessment (3 leads)"
        );
        assert_eq!(
            analyze_label(Some(42), None),
            "Get Confidence Assessment (42 leads)"
        );
    }
}
