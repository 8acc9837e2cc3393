use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};

use crate::detect::Domain;
use crate::settings::ApiSettings;

use super::types::{DetectionResponse, HealthResponse, RegisterRequest, RegisterResponse};

pub const HEALTHY_STATUS: &str = "healthy";

#[derive(Debug)]
pub enum ApiError {
    /// Server answered with a non-2xx status; body captured as text.
    Status { status: u16, body: String },
    /// Request failed before a response arrived (connect, timeout).
    Network(reqwest::Error),
    /// Response arrived but was not the JSON the endpoint promises.
    Decode(reqwest::Error),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Status { status, body } => {
                write!(f, "API error: {} - {}", status, body)
            }
            ApiError::Network(err) => write!(f, "request failed: {}", err),
            ApiError::Decode(err) => write!(f, "unexpected response body: {}", err),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Status { .. } => None,
            ApiError::Network(err) | ApiError::Decode(err) => Some(err),
        }
    }
}

/// Seam between the scan loop and the network, so the loop can be driven
/// against a scripted backend in tests.
#[async_trait]
pub trait DetectionApi: Send + Sync {
    async fn detect(
        &self,
        domain: Domain,
        image: Vec<u8>,
        file_name: &str,
    ) -> Result<DetectionResponse, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
    upload_timeout: Duration,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.base_url.trim().trim_end_matches('/').to_string(),
            health_timeout: Duration::from_secs(settings.health_timeout_secs),
            upload_timeout: Duration::from_secs(settings.upload_timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bounded health probe. Never errors: timeout, non-2xx, and malformed
    /// payloads all read as "not reachable".
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let response = match self
            .http
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                debug!("health check failed: {}", err);
                return false;
            }
        };

        if !response.status().is_success() {
            debug!("health check status: {}", response.status());
            return false;
        }

        match response.json::<HealthResponse>().await {
            Ok(health) => health.status == HEALTHY_STATUS,
            Err(err) => {
                debug!("health check payload unreadable: {}", err);
                false
            }
        }
    }

    /// Upload one frame to the domain's endpoint. Exactly one `file` part;
    /// the confidence threshold rides as a query parameter, never a body
    /// field. Single POST, no retry.
    pub async fn detect(
        &self,
        domain: Domain,
        image: Vec<u8>,
        file_name: &str,
    ) -> Result<DetectionResponse, ApiError> {
        let url = format!("{}{}", self.base_url, domain.endpoint());

        let part = Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))
            .map_err(ApiError::Network)?;
        let form = Form::new().part("file", part);

        let mut request = self
            .http
            .post(&url)
            .multipart(form)
            .timeout(self.upload_timeout);
        if let Some(confidence) = domain.confidence() {
            request = request.query(&[("confidence", confidence)]);
        }

        let response = request.send().await.map_err(ApiError::Network)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(match domain {
            Domain::Color => {
                DetectionResponse::Color(response.json().await.map_err(ApiError::Decode)?)
            }
            Domain::Currency => {
                DetectionResponse::Currency(response.json().await.map_err(ApiError::Decode)?)
            }
            Domain::Object => {
                DetectionResponse::Object(response.json().await.map_err(ApiError::Decode)?)
            }
            Domain::Navigation => {
                DetectionResponse::Navigation(response.json().await.map_err(ApiError::Decode)?)
            }
            Domain::Clothing => {
                DetectionResponse::Clothing(response.json().await.map_err(ApiError::Decode)?)
            }
        })
    }

    pub async fn register_person(
        &self,
        request: &RegisterRequest,
    ) -> Result<RegisterResponse, ApiError> {
        let url = format!("{}/api/person/register", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(ApiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(ApiError::Decode)
    }
}

#[async_trait]
impl DetectionApi for ApiClient {
    async fn detect(
        &self,
        domain: Domain,
        image: Vec<u8>,
        file_name: &str,
    ) -> Result<DetectionResponse, ApiError> {
        ApiClient::detect(self, domain, image, file_name).await
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        // Frames come off a camera; assume JPEG when the extension says nothing.
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_inferred_from_extension() {
        assert_eq!(mime_for("frame.JPG"), "image/jpeg");
        assert_eq!(mime_for("shot.png"), "image/png");
        assert_eq!(mime_for("mystery.raw"), "image/jpeg");
        assert_eq!(mime_for("noext"), "image/jpeg");
    }

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new(&ApiSettings {
            base_url: " http://192.168.1.10:8000/ ".into(),
            ..ApiSettings::default()
        });
        assert_eq!(client.base_url(), "http://192.168.1.10:8000");
    }
}
