//! Update endpoint client.

use std::time::Duration;

use url::Url;

use crate::config::{
    CHECKSUM_PARAM, CONNECT_TIMEOUT, LICENSE_KEY_PARAM, MAX_DOWNLOAD_SIZE, NO_UPDATE_SENTINEL,
};
use crate::error_handling::UpdateError;

/// Builds the HTTP client used for update checks.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, UpdateError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()?;
    Ok(client)
}

/// Builds the update request URL.
///
/// An absent checksum is sent as an empty `md5` parameter, which the endpoint
/// answers with a full database.
pub(crate) fn build_update_url(
    base: &str,
    license_key: &str,
    checksum: Option<&str>,
) -> Result<Url, UpdateError> {
    Url::parse_with_params(
        base,
        &[
            (LICENSE_KEY_PARAM, license_key),
            (CHECKSUM_PARAM, checksum.unwrap_or("")),
        ],
    )
    .map_err(|source| UpdateError::InvalidUrl {
        url: base.to_string(),
        source,
    })
}

/// Renders a URL for logs with the license key masked.
pub(crate) fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == LICENSE_KEY_PARAM {
                (k.into_owned(), "***".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// Returns true if `body` is exactly the "already up to date" answer.
pub fn is_no_update(body: &[u8]) -> bool {
    body == NO_UPDATE_SENTINEL
}

/// Downloads the update response body with size limit enforcement.
pub(crate) async fn fetch_update(client: &reqwest::Client, url: Url) -> Result<Vec<u8>, UpdateError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "No error details".to_string());
        return Err(UpdateError::FetchFailed(format!(
            "update endpoint returned {}: {}",
            status,
            error_body.trim()
        )));
    }

    // Check content-length header if available
    if let Some(content_length) = response.content_length() {
        if content_length > MAX_DOWNLOAD_SIZE as u64 {
            return Err(UpdateError::FetchFailed(format!(
                "update too large: {} bytes (max: {} bytes)",
                content_length, MAX_DOWNLOAD_SIZE
            )));
        }
    }

    let body = response.bytes().await?.to_vec();

    // Double-check size after download (in case content-length was missing or wrong)
    if body.len() > MAX_DOWNLOAD_SIZE {
        return Err(UpdateError::FetchFailed(format!(
            "update too large: {} bytes (max: {} bytes)",
            body.len(),
            MAX_DOWNLOAD_SIZE
        )));
    }

    Ok(body)
}
