// Thin HTTP client for the detection service API

use anyhow::{bail, Context};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

const API_KEY_HEADER: &str = "X-API-Key";

pub struct ApiClient {
    client: Client,
    server: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(server: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            server: server.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    pub async fn health(&self) -> anyhow::Result<Value> {
        let response = self
            .client
            .get(self.url("/api/health"))
            .send()
            .await
            .with_context(|| format!("Cannot connect to server at {}", self.server))?;
        read_json(response).await
    }

    pub async fn detect(&self, image: &Path, min_conf: Option<f64>) -> anyhow::Result<Value> {
        let bytes = tokio::fs::read(image)
            .await
            .with_context(|| format!("Cannot read image {}", image.display()))?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let mut request = self.client.post(self.url("/api/detect")).multipart(form);
        if let Some(min_conf) = min_conf {
            request = request.query(&[("min_conf", min_conf)]);
        }

        let response = self
            .with_key(request)
            .send()
            .await
            .with_context(|| format!("Cannot connect to server at {}", self.server))?;
        read_json(response).await
    }

    pub async fn notify(&self, to: &str, text: &str) -> anyhow::Result<Value> {
        let request = self
            .client
            .post(self.url("/api/notify/whatsapp"))
            .json(&json!({ "to": to, "text": text }));
        let response = self
            .with_key(request)
            .send()
            .await
            .with_context(|| format!("Cannot connect to server at {}", self.server))?;
        read_json(response).await
    }
}

/// Decode a JSON body, turning error statuses into errors carrying `detail`.
async fn read_json(response: Response) -> anyhow::Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        let detail = body
            .get("detail")
            .and_then(Value::as_str)
            .unwrap_or("no detail");
        bail!("Server returned {}: {}", status, detail);
    }
    Ok(body)
}
