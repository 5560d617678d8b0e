use crate::config::Config;
use crate::pdf_proxy::PdfProxy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pdf_proxy: PdfProxy,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            pdf_proxy: PdfProxy::new(config.pdf_service.clone()),
        }
    }
}
