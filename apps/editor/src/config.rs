use anyhow::{Context, Result};

const DEFAULT_PDF_SERVICE_URL: &str = "http://localhost:8080/api/v1/resumes/generate-pdf";
const DEFAULT_PDF_SERVICE_ID: &str = "resume-editor";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub pdf_service: PdfServiceConfig,
}

/// Where render requests are forwarded and how they are signed.
#[derive(Debug, Clone)]
pub struct PdfServiceConfig {
    pub url: String,
    pub service_id: String,
    /// Checked per request, so the server can start without it.
    pub hmac_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_or("PORT", "3000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            pdf_service: PdfServiceConfig {
                url: env_or("PDF_SERVICE_URL", DEFAULT_PDF_SERVICE_URL),
                service_id: env_or("PDF_SERVICE_ID", DEFAULT_PDF_SERVICE_ID),
                hmac_secret: optional_env("PDF_SERVICE_HMAC_SECRET"),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
