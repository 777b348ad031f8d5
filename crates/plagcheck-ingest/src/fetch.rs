//! Remote document download.

use std::time::Duration;

use crate::{DocumentFormat, IngestError};

/// A downloaded document body and the format it resolved to.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

pub(crate) fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("plagcheck/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Download `url`. The format comes from the `Content-Type` header, then
/// from the URL suffix, else plain text.
pub async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<Fetched, IngestError> {
    let resp = client.get(url).send().await?.error_for_status()?;

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let format = content_type
        .as_deref()
        .and_then(DocumentFormat::from_content_type)
        .or_else(|| DocumentFormat::from_url(url))
        .unwrap_or(DocumentFormat::Text);

    let bytes = resp.bytes().await?.to_vec();
    tracing::debug!(
        url,
        content_type = content_type.as_deref().unwrap_or("-"),
        ?format,
        bytes = bytes.len(),
        "fetched remote document"
    );
    Ok(Fetched { bytes, format })
}
