//! Telegram Bot API adapters.
//!
//! This module provides:
//! - `TelegramArchive`: `ArchiveChannel` backed by a private channel
//!   (`sendDocument`, `deleteMessage`)
//! - `TelegramFiles`: `FileSource` via `getFile` plus file download
//! - `TelegramNotifier`: `Notifier` via `sendMessage`
//! - `webhook`: the inbound axum router
//!
//! `TelegramClient::set_webhook` registers the router's endpoint.

mod archive;
mod files;
mod notifier;
pub mod webhook;

pub use archive::TelegramArchive;
pub use files::TelegramFiles;
pub use notifier::TelegramNotifier;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;

const API_ROOT: &str = "https://api.telegram.org";

#[derive(Debug)]
pub enum TelegramError {
    Http(reqwest::Error),
    /// The API answered `ok: false`
    Api(String),
    /// A successful answer lacked a field we rely on
    MissingField(&'static str),
}

impl fmt::Display for TelegramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelegramError::Http(e) => write!(f, "Telegram HTTP error: {}", e),
            TelegramError::Api(description) => write!(f, "Telegram API error: {}", description),
            TelegramError::MissingField(field) => {
                write!(f, "Telegram response missing {}", field)
            }
        }
    }
}

impl std::error::Error for TelegramError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelegramError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        TelegramError::Http(err)
    }
}

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TelegramError> {
        if !self.ok {
            return Err(TelegramError::Api(
                self.description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        self.result.ok_or(TelegramError::MissingField("result"))
    }
}

/// Thin Bot API client. Every request carries the client-wide timeout.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_base: String,
    file_base: String,
}

impl TelegramClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self, TelegramError> {
        Self::with_root(API_ROOT, token, timeout)
    }

    /// Points the client at another Bot API server (e.g. a local one).
    pub fn with_root(root: &str, token: &str, timeout: Duration) -> Result<Self, TelegramError> {
        let root = root.trim_end_matches('/');
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: format!("{}/bot{}", root, token),
            file_base: format!("{}/file/bot{}", root, token),
        })
    }

    /// Registers `{public_url}/webhook` as the update endpoint.
    pub async fn set_webhook(&self, public_url: &str) -> Result<(), TelegramError> {
        let endpoint = webhook_endpoint(public_url);
        let accepted: bool = self
            .call(self.post("setWebhook").json(&json!({ "url": endpoint })))
            .await?;
        if !accepted {
            return Err(TelegramError::Api(format!("setWebhook refused {}", endpoint)));
        }
        Ok(())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/{}", self.file_base, file_path.trim_start_matches('/'))
    }

    fn post(&self, method: &str) -> RequestBuilder {
        self.http.post(self.method_url(method))
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TelegramError> {
        // Error answers carry a JSON body too, so the status is not checked.
        let response: ApiResponse<T> = request.send().await?.json().await?;
        response.into_result()
    }
}

/// Route served by `webhook::router` under the public base URL.
fn webhook_endpoint(public_url: &str) -> String {
    format!("{}/webhook", public_url.trim_end_matches('/'))
}
