//! HTTP gateway to the JARVICE job API

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, error};

use crate::domain::{ApiBody, ApiRequest, Credentials, HttpMethod};
use crate::infrastructure::error::ApiError;
use crate::infrastructure::traits::JobApi;

/// Blocking HTTP implementation of [`JobApi`].
pub struct HttpJobApi {
    client: Client,
    creds: Credentials,
}

impl HttpJobApi {
    pub fn new(creds: Credentials, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jarvice/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport {
                url: creds.apiurl.clone(),
                message: format!("build HTTP client: {e}"),
            })?;
        Ok(Self { client, creds })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.creds.apiurl.trim_end_matches('/'), endpoint)
    }

    fn read_body(endpoint: &str, response: Response) -> Result<ApiBody, ApiError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response.text().map_err(|e| ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: format!("read body: {e}"),
        })?;

        if status.as_u16() >= 300 {
            error!(endpoint, code = status.as_u16(), "failure to retrieve API data");
            let code = status.as_u16();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ApiError::Authentication { code, body: text }
                }
                _ => ApiError::Status {
                    endpoint: endpoint.to_string(),
                    code,
                    body: text,
                },
            });
        }

        if content_type.starts_with("application/json") {
            serde_json::from_str(&text)
                .map(ApiBody::Json)
                .map_err(|e| ApiError::InvalidResponse {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                })
        } else if content_type.starts_with("text/plain") {
            Ok(ApiBody::Text(text))
        } else {
            Err(ApiError::ContentType {
                endpoint: endpoint.to_string(),
                content_type,
            })
        }
    }
}

impl JobApi for HttpJobApi {
    fn call(&self, request: &ApiRequest) -> Result<ApiBody, ApiError> {
        let endpoint = request.endpoint();
        let url = self.url(endpoint);
        debug!(method = ?request.method(), %url, "api call");

        let builder = match request.method() {
            HttpMethod::Get => self.client.get(&url).query(&request.query(&self.creds)),
            HttpMethod::Post => {
                let builder = self.client.post(&url);
                match request.body(&self.creds) {
                    Some(body) => builder.json(&body),
                    None => builder,
                }
            }
        };

        let response = builder.send().map_err(|e| ApiError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Self::read_body(endpoint, response)
    }
}
