//! Lead Scoring Client Library
//!
//! Drives the lead-scoring backend through its four workflows (query preview,
//! query analysis, single-lead lookup and Excel batch analysis), keeps the last
//! good result of each, computes the weighted confidence scores and exports
//! stored results to spreadsheets.
//!
//! # Modules
//!
//! - `core`: Scoring, workflow state and shared models/errors.
//! - `integrations`: Backend client and export downloads.
//! - `client`: HTTP client for the backend endpoints.
//! - `config`: Configuration management.
//! - `controller`: Request state machine for every workflow.
//! - `download`: Saving exported files.
//! - `errors`: Error handling types.
//! - `export`: Export of stored results.
//! - `models`: Backend payload models.
//! - `render`: Text views of results.
//! - `scoring`: Final and batch confidence scores.
//! - `ui`: Control affordances and result panels.
//! - `workflow_state`: Per-slot results and the Excel session.

pub mod core;
pub mod integrations;

pub mod client;
pub mod config;
pub mod controller;
pub mod download;
pub mod errors;
pub mod export;
pub mod models;
pub mod render;
pub mod scoring;
pub mod ui;
pub mod workflow_state;
