//! Catbox image hosting.

use crate::ports::hosting::HostingPort;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::error::Error;
use std::time::Duration;

/// Anonymous Catbox uploads. The response body is the public URL.
#[derive(Clone)]
pub struct CatboxHosting {
    http: Client,
    upload_url: String,
}

impl CatboxHosting {
    pub fn new(upload_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            upload_url: upload_url.into(),
        })
    }
}

/// Extracts the URL from an upload response body.
fn parse_upload_response(body: &str) -> Result<String, String> {
    let url = body.trim();
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(url.to_string())
    } else {
        Err(format!("unexpected upload response: {:?}", url))
    }
}

#[async_trait]
impl HostingPort for CatboxHosting {
    async fn upload(
        &self,
        image: Vec<u8>,
        filename: String,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let file = Part::bytes(image).file_name(filename).mime_str("image/jpeg")?;
        let form = Form::new()
            .text("reqtype", "fileupload")
            .part("fileToUpload", file);

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(format!("upload failed with status {}: {}", status, body.trim()).into());
        }
        Ok(parse_upload_response(&body)?)
    }
}
