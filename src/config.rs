use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_EXCEL_MAX_ANALYZE: u32 = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the lead-scoring backend.
    pub base_url: String,
    /// Per-request timeout. Batch analysis with AI assessment is slow.
    pub request_timeout_secs: u64,
    /// Directory exported spreadsheets are written to.
    pub download_dir: PathBuf,
    /// `max_analyze` sent with Excel analysis (the whole sheet by default).
    pub excel_max_analyze: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            download_dir: PathBuf::from("."),
            excel_max_analyze: DEFAULT_EXCEL_MAX_ANALYZE,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            base_url: validate_base_url(
                std::env::var("LEAD_SCORING_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            )?,
            request_timeout_secs: std::env::var("LEAD_SCORING_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
                .parse()
                .ok()
                .filter(|secs: &u64| *secs > 0)
                .ok_or_else(|| {
                    anyhow::anyhow!("LEAD_SCORING_TIMEOUT_SECS must be a positive number")
                })?,
            download_dir: std::env::var("LEAD_SCORING_DOWNLOAD_DIR")
                .or_else(|_| Ok::<_, anyhow::Error>(".".to_string()))
                .and_then(|dir| {
                    if dir.trim().is_empty() {
                        anyhow::bail!("LEAD_SCORING_DOWNLOAD_DIR cannot be empty");
                    }
                    Ok(PathBuf::from(dir))
                })?,
            excel_max_analyze: std::env::var("LEAD_SCORING_EXCEL_MAX_ANALYZE")
                .unwrap_or_else(|_| DEFAULT_EXCEL_MAX_ANALYZE.to_string())
                .parse()
                .ok()
                .filter(|max: &u32| *max > 0)
                .ok_or_else(|| {
                    anyhow::anyhow!("LEAD_SCORING_EXCEL_MAX_ANALYZE must be a positive number")
                })?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Backend URL: {}", config.base_url);
        tracing::debug!("Request timeout: {}s", config.request_timeout_secs);
        tracing::debug!("Download directory: {}", config.download_dir.display());

        Ok(config)
    }

    /// Replaces the backend URL after validating it.
    pub fn with_base_url(mut self, url: String) -> anyhow::Result<Self> {
        self.base_url = validate_base_url(url)?;
        Ok(self)
    }
}

/// Backend URLs must be absolute http(s) URLs.
pub fn validate_base_url(url: String) -> anyhow::Result<String> {
    if url.trim().is_empty() {
        anyhow::bail!("LEAD_SCORING_BASE_URL cannot be empty");
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("LEAD_SCORING_BASE_URL must start with http:// or https://");
    }
    Ok(url)
}
