/// Integration tests with a mocked scoring backend
/// Drives every workflow through the controller without a real server
use lead_scoring_client::client::ScoringApiClient;
use lead_scoring_client::controller::{Outcome, RequestController};
use lead_scoring_client::errors::AppError;
use lead_scoring_client::export::ExportTrigger;
use lead_scoring_client::models::ExcelUpload;
use lead_scoring_client::render::LeadIdCounts;
use lead_scoring_client::ui::{Control, PanelBody, PanelId, Tone};
use lead_scoring_client::workflow_state::Slot;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{any, body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create a controller pointing at the mock server
fn create_controller(base_url: &str, download_dir: &Path) -> RequestController {
    let client = ScoringApiClient::new(base_url, Duration::from_secs(5)).unwrap();
    RequestController::new(client, ExportTrigger::new(download_dir), 10_000)
}

fn analysis_payload() -> serde_json::Value {
    json!({
        "data": {
            "summary": {"avg_confidence_score": 95, "leads_analyzed": 2},
            "leads": [
                {
                    "Id": "00Q5e00000AbCdEfGH",
                    "FirstName": "Ada",
                    "acquisition_completeness_score": 80,
                    "enrichment_completeness_score": 60,
                    "confidence_assessment": {"confidence_score": 90}
                },
                {
                    "Id": "00Q5e00000ZyXwVuTS",
                    "acquisition_completeness_score": 100,
                    "enrichment_completeness_score": 100,
                    "confidence_assessment": {"confidence_score": 100}
                }
            ],
            "query_info": {"soql": "Status = 'Open'"}
        }
    })
}

async fn mount_preview(server: &MockServer, total_found: u64) {
    Mock::given(method("POST"))
        .and(path("/leads/preview-query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"total_found": total_found, "leads": []}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_preview_enables_analyze_and_input_change_clears_it() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/leads/preview-query"))
        .and(body_json(json!({"soql_query": "Status = 'Open'", "preview_limit": 50})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"total_found": 42}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = create_controller(&server.uri(), dir.path());
    controller.set_soql_query("  Status = 'Open'  ");
    controller.set_preview_limit("50");
    controller.set_max_analyze("10");
    assert!(!controller.is_enabled(Control::AnalyzeQuery));

    let outcome = controller.preview_query().await.unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert!(controller.state().is_set(Slot::QueryPreview));
    assert!(controller.is_enabled(Control::AnalyzeQuery));
    assert_eq!(
        controller.affordances().label(Control::AnalyzeQuery),
        "Get Confidence Assessment (10 leads)"
    );
    assert_eq!(
        controller.affordances().label(Control::PreviewQuery),
        "1. Preview Query"
    );
    let panel = controller.panel(PanelId::Query).unwrap();
    assert_eq!(panel.tone, Tone::Success);
    assert!(panel
        .to_string()
        .ends_with("✅ Query successful! You can now proceed to analyze the leads."));

    controller.set_soql_query("Status = 'Closed'");

    assert!(!controller.state().is_set(Slot::QueryPreview));
    assert!(!controller.is_enabled(Control::AnalyzeQuery));
    assert_eq!(
        controller.affordances().label(Control::AnalyzeQuery),
        "Get Confidence Assessment"
    );
}

#[tokio::test]
async fn test_analyze_query_success_enables_export() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_preview(&server, 2).await;

    Mock::given(method("POST"))
        .and(path("/leads/analyze-query"))
        .and(body_json(json!({
            "soql_query": "",
            "max_analyze": 5,
            "include_ai_assessment": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = create_controller(&server.uri(), dir.path());
    controller.set_max_analyze("5");
    controller.preview_query().await.unwrap();
    controller.analyze_query().await.unwrap();

    assert!(controller.is_enabled(Control::ExportQuery));
    match &controller.panel(PanelId::Query).unwrap().body {
        PanelBody::Batch(view) => {
            assert_eq!(view.processed, 2);
            assert_eq!(view.summary.avg_final, Some(92));
            assert_eq!(view.summary.avg_acquisition, Some(90));
            assert_eq!(view.summary.avg_enrichment, Some(80));
            assert_eq!(view.summary.avg_confidence, Some(95.0));
            assert_eq!(view.leads[0].final_score, Some(84));
        }
        other => panic!("unexpected panel: {:?}", other),
    }

    // Changing max-analyze invalidates the analysis but keeps the preview.
    controller.set_max_analyze("1");
    assert!(!controller.is_enabled(Control::ExportQuery));
    assert!(controller.is_enabled(Control::AnalyzeQuery));
    assert_eq!(
        controller.affordances().label(Control::AnalyzeQuery),
        "Get Confidence Assessment (1 leads)"
    );
}

#[tokio::test]
async fn test_analyze_failure_leaves_export_disabled() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_preview(&server, 12).await;

    Mock::given(method("POST"))
        .and(path("/leads/analyze-query"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "Salesforce query failed",
            "message": "INVALID_FIELD"
        })))
        .mount(&server)
        .await;

    let mut controller = create_controller(&server.uri(), dir.path());
    controller.preview_query().await.unwrap();
    let err = controller.analyze_query().await.unwrap_err();

    assert!(matches!(err, AppError::Remote { status: 500, .. }));
    assert!(!controller.state().is_set(Slot::QueryAnalysis));
    assert!(!controller.is_enabled(Control::ExportQuery));
    assert!(controller.is_enabled(Control::AnalyzeQuery));
    assert_eq!(
        controller.affordances().label(Control::AnalyzeQuery),
        "Get Confidence Assessment (10 leads)"
    );

    let panel = controller.panel(PanelId::Query).unwrap();
    assert_eq!(panel.tone, Tone::Error);
    assert_eq!(
        panel.to_string(),
        "{\n  \"error\": \"Salesforce query failed\",\n  \"message\": \"INVALID_FIELD\"\n}"
    );
}

#[tokio::test]
async fn test_local_validation_makes_no_request() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut controller = create_controller(&server.uri(), dir.path());

    controller.set_preview_limit("1001");
    let err = controller.preview_query().await.unwrap_err();
    assert_eq!(
        err.display_body(),
        "Preview limit must be a number between 1 and 1000."
    );

    controller.set_lead_id("   ");
    let err = controller.lookup_lead().await.unwrap_err();
    assert_eq!(err.display_body(), "Please enter a Salesforce Lead ID.");

    controller.set_lead_id("00Q5e00000AbCdEfGHIJ");
    let err = controller.lookup_lead().await.unwrap_err();
    assert_eq!(err.display_body(), "Lead ID must be 15-18 characters long.");

    let err = controller.export(Slot::QueryAnalysis).await.unwrap_err();
    assert!(err.is_local());
    assert_eq!(
        controller.notice(),
        Some("Please run the analysis first before exporting.")
    );
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_preview(&server, 7).await;

    let mut controller = create_controller(&server.uri(), dir.path());
    let ticket = controller.begin_preview_query().unwrap();
    assert_eq!(
        controller.affordances().label(Control::PreviewQuery),
        "Previewing..."
    );

    // The query changes while the preview is in flight.
    controller.set_soql_query("Status = 'Closed'");

    let result = controller.client().preview_query(ticket.request()).await;
    assert!(result.is_ok());
    let outcome = controller.finish_preview_query(ticket, result).unwrap();

    assert_eq!(outcome, Outcome::Discarded);
    assert!(!controller.state().is_set(Slot::QueryPreview));
    assert!(!controller.is_enabled(Control::AnalyzeQuery));
    assert!(controller.is_enabled(Control::PreviewQuery));
    assert!(controller.panel(PanelId::Query).is_none());
}

#[tokio::test]
async fn test_stale_excel_steps_are_discarded() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/excel/parse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"sheet_names": ["Leads", "Archive"], "headers": ["Lead Id"], "total_rows": 2}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/excel/validate-lead-ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"total_lead_ids": 2, "valid_lead_ids": 2, "invalid_lead_ids": 0}
        })))
        .mount(&server)
        .await;

    let mut controller = create_controller(&server.uri(), dir.path());
    controller.select_excel_file(Some(ExcelUpload::new("old.xlsx", vec![1])));

    // Another file is picked while the first one is being parsed.
    let parse = controller.begin_parse_excel().unwrap();
    controller.select_excel_file(Some(ExcelUpload::new("new.xlsx", vec![2])));
    let result = controller.client().parse_excel(parse.request()).await;
    assert!(result.is_ok());
    assert_eq!(
        controller.finish_parse_excel(parse, result).unwrap(),
        Outcome::Discarded
    );
    assert!(controller.state().excel().metadata.is_none());
    assert!(!controller.is_enabled(Control::ValidateLeadIds));
    assert!(controller.is_enabled(Control::ParseExcel));

    controller.parse_excel().await.unwrap();
    controller.select_lead_id_column("Lead Id");

    // The sheet changes while validation is in flight.
    let validate = controller.begin_validate_lead_ids().unwrap();
    controller.select_sheet("Archive");
    let step = validate.request();
    let result = controller
        .client()
        .validate_lead_ids(&step.file, &step.selection)
        .await;
    assert!(result.is_ok());
    assert_eq!(
        controller.finish_validate_lead_ids(validate, result).unwrap(),
        Outcome::Discarded
    );
    assert!(controller.state().excel().validation.is_none());
    assert!(!controller.is_enabled(Control::AnalyzeExcel));
    assert!(controller.is_enabled(Control::ValidateLeadIds));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_interleaved_slots_apply_independently() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_preview(&server, 3).await;

    Mock::given(method("GET"))
        .and(path("/lead/00Q5e00000AbCdEfGH/confidence"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lead_data": {
                "Id": "00Q5e00000AbCdEfGH",
                "acquisition_completeness_score": 80,
                "enrichment_completeness_score": 60
            },
            "confidence_assessment": {"confidence_score": 90}
        })))
        .mount(&server)
        .await;

    let mut controller = create_controller(&server.uri(), dir.path());
    controller.set_lead_id("00Q5e00000AbCdEfGH");

    let preview = controller.begin_preview_query().unwrap();
    let lookup = controller.begin_lookup_lead().unwrap();

    let client = controller.client().clone();
    let (preview_result, lookup_result) = tokio::join!(
        client.preview_query(preview.request()),
        client.lead_confidence(lookup.request())
    );

    assert_eq!(
        controller.finish_lookup_lead(lookup, lookup_result).unwrap(),
        Outcome::Applied
    );
    assert_eq!(
        controller.finish_preview_query(preview, preview_result).unwrap(),
        Outcome::Applied
    );

    assert!(controller.state().is_set(Slot::QueryPreview));
    assert!(controller.is_enabled(Control::ExportLead));
    match &controller.panel(PanelId::Confidence).unwrap().body {
        PanelBody::Lead(view) => assert_eq!(view.final_score, Some(84)),
        other => panic!("unexpected panel: {:?}", other),
    }
}

#[tokio::test]
async fn test_transport_error_is_rendered() {
    let dir = tempfile::tempdir().unwrap();
    // A pooled server keeps listening after drop; a bare one shuts down.
    let server = MockServer::builder().start().await;
    let uri = server.uri();
    drop(server);

    let mut controller = create_controller(&uri, dir.path());
    let err = controller.preview_query().await.unwrap_err();

    assert!(matches!(err, AppError::Transport(_)));
    assert!(!controller.is_enabled(Control::AnalyzeQuery));
    let panel = controller.panel(PanelId::Query).unwrap();
    assert_eq!(panel.tone, Tone::Error);
    assert!(panel.to_string().starts_with("Error: "));
}

#[tokio::test]
async fn test_excel_workflow_with_partial_validation() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/excel/parse"))
        .and(body_string_contains("filename=\"leads.xlsx\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "sheet_names": ["Leads", "Archive"],
                "headers": ["Lead Id", "Company"],
                "total_rows": 3
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/excel/validate-lead-ids"))
        .and(body_string_contains("Lead Id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "total_lead_ids": 3,
                "valid_lead_ids": 2,
                "invalid_lead_ids": 1,
                "invalid_lead_ids_list": ["00QNOTAREALID"],
                "validation_summary": {"partial_validation": true}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/excel/analyze"))
        .and(body_string_contains("name=\"max_analyze\""))
        .and(body_string_contains("10000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": analysis_payload()["data"].clone(),
            "validation_summary": {
                "total_lead_ids": 3,
                "invalid_lead_ids": 1,
                "invalid_lead_ids_list": ["00QNOTAREALID"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = create_controller(&server.uri(), dir.path());
    controller.select_excel_file(Some(ExcelUpload::new("leads.xlsx", b"PK\x03\x04".to_vec())));
    assert!(controller.is_enabled(Control::ParseExcel));
    assert!(!controller.is_enabled(Control::ValidateLeadIds));

    controller.parse_excel().await.unwrap();
    assert_eq!(controller.state().excel().selection.sheet_name, "Leads");
    assert!(controller.is_enabled(Control::ValidateLeadIds));
    assert_eq!(
        controller.panel(PanelId::Excel).unwrap().to_string().lines().next(),
        Some("✅ File parsed successfully! Found 3 rows in 2 sheet(s).")
    );

    let err = controller.validate_lead_ids().await.unwrap_err();
    assert_eq!(
        err.display_body(),
        "Please select both sheet and Lead ID column."
    );

    controller.select_lead_id_column("Lead Id");
    controller.validate_lead_ids().await.unwrap();
    let panel = controller.panel(PanelId::Excel).unwrap();
    assert_eq!(panel.tone, Tone::Warning);
    assert!(panel.to_string().contains("• 00QNOTAREALID"));
    assert!(controller.is_enabled(Control::AnalyzeExcel));

    controller.analyze_excel().await.unwrap();
    assert!(controller.is_enabled(Control::ExportExcel));
    match &controller.panel(PanelId::Excel).unwrap().body {
        PanelBody::Batch(view) => {
            assert_eq!(
                view.lead_id_counts,
                Some(LeadIdCounts {
                    total: 3,
                    valid: 2,
                    invalid: 1
                })
            );
            assert_eq!(view.summary.avg_final, Some(92));
        }
        other => panic!("unexpected panel: {:?}", other),
    }

    // A new column selection invalidates validation and analysis.
    controller.select_lead_id_column("Company");
    assert!(!controller.is_enabled(Control::AnalyzeExcel));
    assert!(!controller.is_enabled(Control::ExportExcel));
    assert!(controller.state().excel().validation.is_none());
}

#[tokio::test]
async fn test_rejected_validation_blocks_analysis() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/excel/parse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"sheet_names": ["Sheet1"], "headers": ["Id"], "total_rows": 1}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/excel/validate-lead-ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "total_lead_ids": 1,
                "valid_lead_ids": 0,
                "invalid_lead_ids": 1,
                "invalid_lead_ids_list": ["bogus"]
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/excel/analyze"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut controller = create_controller(&server.uri(), dir.path());
    controller.select_excel_file(Some(ExcelUpload::new("ids.xlsx", vec![1, 2, 3])));
    controller.parse_excel().await.unwrap();
    controller.select_lead_id_column("Id");
    controller.validate_lead_ids().await.unwrap();

    let panel = controller.panel(PanelId::Excel).unwrap();
    assert_eq!(panel.tone, Tone::Error);
    assert!(panel
        .to_string()
        .ends_with("❌ No valid Lead IDs found. Please check your data and try again."));
    assert!(!controller.is_enabled(Control::AnalyzeExcel));

    let err = controller.analyze_excel().await.unwrap_err();
    assert_eq!(
        err.display_body(),
        "Please parse and validate the Excel file first."
    );
}

#[tokio::test]
async fn test_validation_failure_is_prefixed() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/excel/parse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"sheet_names": ["Sheet1"], "headers": ["Id"], "total_rows": 1}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/excel/validate-lead-ids"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Column not found"})),
        )
        .mount(&server)
        .await;

    let mut controller = create_controller(&server.uri(), dir.path());
    controller.select_excel_file(Some(ExcelUpload::new("ids.xlsx", vec![1])));
    controller.parse_excel().await.unwrap();
    controller.select_lead_id_column("Id");
    assert!(controller.validate_lead_ids().await.is_err());

    assert_eq!(
        controller.panel(PanelId::Excel).unwrap().to_string(),
        "❌ Validation failed!\n\n{\n  \"error\": \"Column not found\"\n}"
    );
    assert!(!controller.is_enabled(Control::AnalyzeExcel));
    assert!(controller.is_enabled(Control::ValidateLeadIds));
}
