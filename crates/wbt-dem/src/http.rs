//! Blocking HTTP helpers shared by the DEM sources.

use crate::{DemError, Result};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub(crate) fn client() -> Result<reqwest::blocking::Client> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Fetch a response body, turning non-success status codes into errors.
pub(crate) fn fetch_bytes(
    request: reqwest::blocking::RequestBuilder,
    label: &str,
) -> Result<Vec<u8>> {
    let response = request.send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(DemError::DownloadFailed {
            url: label.to_string(),
            reason: format!("HTTP {status}"),
        });
    }
    let bytes = response.bytes()?;
    debug!("Downloaded {} bytes from {}", bytes.len(), label);
    Ok(bytes.to_vec())
}

/// Check the payload looks like a (Big)TIFF before handing it to the decoder.
///
/// Map services answer errors with JSON or HTML and a 200 status.
pub(crate) fn ensure_tiff(bytes: &[u8], label: &str) -> Result<()> {
    let magic = bytes.get(..4).unwrap_or_default();
    let is_tiff = matches!(
        magic,
        [b'I', b'I', 42, 0] | [b'M', b'M', 0, 42] | [b'I', b'I', 43, 0] | [b'M', b'M', 0, 43]
    );
    if is_tiff {
        return Ok(());
    }
    let preview: String = String::from_utf8_lossy(&bytes[..bytes.len().min(200)]).into_owned();
    Err(DemError::DownloadFailed {
        url: label.to_string(),
        reason: format!("response is not a GeoTIFF: {preview}"),
    })
}
