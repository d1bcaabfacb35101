use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;

use crate::error::HttpError;

/// Builds the shared client for one provider. `bearer` adds an
/// `Authorization` header to every request.
pub fn build_client(timeout: Duration, bearer: Option<&str>) -> Result<Client, HttpError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = bearer {
        let auth = format!("Bearer {}", key.trim());
        let value = HeaderValue::from_str(&auth).map_err(HttpError::InvalidApiKey)?;
        headers.insert(AUTHORIZATION, value);
    }
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|source| HttpError::Request {
            method: "BUILD",
            url: String::new(),
            source,
        })
}

pub fn post_json<T: DeserializeOwned, B: Serialize>(
    client: &Client,
    url: &str,
    body: &B,
) -> Result<T, HttpError> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .map_err(|source| HttpError::Request {
            method: "POST",
            url: url.to_string(),
            source,
        })?;
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    if !status.is_success() {
        return Err(HttpError::Status {
            method: "POST",
            url: url.to_string(),
            status,
            body: text,
        });
    }
    from_str::<T>(&text).map_err(|e| HttpError::Decode {
        method: "POST",
        url: url.to_string(),
        message: e.to_string(),
        body: text,
    })
}
