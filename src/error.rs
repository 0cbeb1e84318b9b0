use crate::parser::ParseError;

/// Why a scrape run was abandoned. Every variant is fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("failed to fetch menu page: {0}")]
    Network(#[from] reqwest::Error),
    #[error("menu page {url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("menu page layout changed: {0}")]
    Parse(#[from] ParseError),
}
