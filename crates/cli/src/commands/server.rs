//! Cache administration against a running server.
//!
//! # Usage
//!
//! ```bash
//! catalog-cli clear-cache --server http://localhost:3000
//! catalog-cli resync --server http://localhost:3000
//! ```

use reqwest::Method;
use thiserror::Error;
use url::Url;

/// Errors calling the admin endpoints.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Drop every cache entry on the server.
///
/// # Errors
///
/// Returns `AdminError` if the request fails or the server rejects it.
pub async fn clear_cache(server: &Url) -> Result<(), AdminError> {
    let body = call(Method::GET, server, "cache/clear-cache").await?;
    tracing::info!(response = %body, "Cache cleared");
    Ok(())
}

/// Force a full snapshot rebuild on the server.
///
/// # Errors
///
/// Returns `AdminError` if the request fails or the rebuild fails upstream.
pub async fn resync(server: &Url) -> Result<(), AdminError> {
    let body = call(Method::POST, server, "cache/resync").await?;
    tracing::info!(
        products = body.get("products").and_then(serde_json::Value::as_u64),
        total = body.get("total").and_then(serde_json::Value::as_u64),
        "Resync complete"
    );
    Ok(())
}

async fn call(method: Method, server: &Url, path: &str) -> Result<serde_json::Value, AdminError> {
    let url = endpoint(server, path)?;
    tracing::debug!(%method, %url, "Calling admin endpoint");

    let response = reqwest::Client::new().request(method, url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AdminError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    Ok(response.json().await?)
}

/// Join an admin path onto the server base URL.
fn endpoint(server: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = server.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_with_and_without_trailing_slash() {
        let bare = Url::parse("http://localhost:3000").unwrap();
        assert_eq!(
            endpoint(&bare, "cache/resync").unwrap().as_str(),
            "http://localhost:3000/cache/resync"
        );

        let prefixed = Url::parse("https://api.shop.test/catalog").unwrap();
        assert_eq!(
            endpoint(&prefixed, "cache/clear-cache").unwrap().as_str(),
            "https://api.shop.test/catalog/cache/clear-cache"
        );
    }
}
