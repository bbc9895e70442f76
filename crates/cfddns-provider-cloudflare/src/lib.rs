// # Cloudflare DNS Provider
//
// Authenticated request/response wrapper for the Cloudflare API v4, exposed
// to the engine through the `DnsProvider` trait.
//
// ## Behaviour
//
// - One HTTP request per trait call
// - Bearer token when configured, otherwise the `X-Auth-Email`/`X-Auth-Key` pair
// - Non-success status: method, URL and response body are logged and an
//   explicit error is returned (`NotFound` for 404, `Api` otherwise)
// - No retries, no backoff, no caching: the scheduler's next cycle is the retry
// - HTTP timeout of 30 seconds
//
// ## Security
//
// - Credentials never appear in logs or `Debug` output
//
// ## API Reference
//
// - Zone details: GET `/zones/:zone_id`
// - List records: GET `/zones/:zone_id/dns_records?per_page=100&type=A`
// - Create record: POST `/zones/:zone_id/dns_records`
// - Update record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::config::{Credentials, ZoneConfig};
use cfddns_core::record::{RecordBody, RecordType, RemoteRecord};
use cfddns_core::traits::DnsProvider;
use cfddns_core::{Error, Result};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, warn};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for record listings; one page is assumed to be enough
pub const RECORDS_PER_PAGE: u32 = 100;

const PROVIDER_NAME: &str = "cloudflare";

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ZoneDetails {
    name: String,
}

/// Cloudflare API client
///
/// Stateless: credentials are passed per call, so one client serves every
/// configured zone.
#[derive(Clone)]
pub struct CloudflareClient {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareClient {
    /// Create a client for the public Cloudflare API
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::from_client(client, CLOUDFLARE_API_BASE))
    }

    /// Create a client over a prepared `reqwest::Client` and base URL
    pub fn from_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Full URL of an endpoint relative to the API base
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Issue one request and return the envelope's `result`
    ///
    /// # Returns
    ///
    /// - `Ok(T)`: success status and a parsable result
    /// - `Err(Error::NotFound)`: 404
    /// - `Err(Error::Api)`: any other non-success status
    /// - `Err(Error::Http)`: no response at all
    pub async fn call<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        credentials: &Credentials,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(method, endpoint, credentials, body)
            .await?
            .ok_or_else(|| Error::provider(PROVIDER_NAME, "Response carries no result"))
    }

    async fn send<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        credentials: &Credentials,
        body: Option<&B>,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(endpoint);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .headers(auth_headers(credentials)?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Error sending '{}' request to '{}': {}", method, url, e);
            Error::http(format!("{} {}: {}", method, url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            warn!("Error sending '{}' request to '{}': {} {}", method, url, status, body);

            return Err(match status {
                StatusCode::NOT_FOUND => Error::not_found(format!("{} {}: {}", method, url, body)),
                _ => Error::Api {
                    method: method.to_string(),
                    url,
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            Error::provider(PROVIDER_NAME, format!("Failed to parse response: {}", e))
        })?;

        if envelope.success == Some(false) {
            let errors: Vec<String> = envelope
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect();
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("{} {} unsuccessful: {}", method, url, errors.join(", ")),
            ));
        }

        Ok(envelope.result)
    }
}

/// Headers authenticating a request with `credentials`
pub fn auth_headers(credentials: &Credentials) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    match credentials {
        Credentials::Token(token) => {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
        }
        Credentials::ApiKey { email, key } => {
            headers.insert(HeaderName::from_static("x-auth-email"), header_value(email)?);
            headers.insert(HeaderName::from_static("x-auth-key"), header_value(key)?);
        }
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| Error::config("Credentials contain characters not allowed in HTTP headers"))?;
    value.set_sensitive(true);
    Ok(value)
}

fn records_endpoint(zone_id: &str) -> String {
    format!("zones/{}/dns_records", zone_id)
}

#[async_trait]
impl DnsProvider for CloudflareClient {
    async fn zone_name(&self, zone: &ZoneConfig) -> Result<String> {
        let details: ZoneDetails = self
            .call(
                Method::GET,
                &format!("zones/{}", zone.zone_id),
                &zone.credentials()?,
                None::<&()>,
            )
            .await?;
        Ok(details.name)
    }

    async fn list_records(
        &self,
        zone: &ZoneConfig,
        record_type: RecordType,
    ) -> Result<Vec<RemoteRecord>> {
        let endpoint = format!(
            "{}?per_page={}&type={}",
            records_endpoint(&zone.zone_id),
            RECORDS_PER_PAGE,
            record_type
        );
        self.call(Method::GET, &endpoint, &zone.credentials()?, None::<&()>)
            .await
    }

    async fn create_record(&self, zone: &ZoneConfig, record: &RecordBody) -> Result<RemoteRecord> {
        self.call(
            Method::POST,
            &records_endpoint(&zone.zone_id),
            &zone.credentials()?,
            Some(record),
        )
        .await
    }

    async fn update_record(
        &self,
        zone: &ZoneConfig,
        record_id: &str,
        record: &RecordBody,
    ) -> Result<RemoteRecord> {
        self.call(
            Method::PUT,
            &format!("{}/{}", records_endpoint(&zone.zone_id), record_id),
            &zone.credentials()?,
            Some(record),
        )
        .await
    }

    async fn delete_record(&self, zone: &ZoneConfig, record_id: &str) -> Result<()> {
        self.send::<serde_json::Value, ()>(
            Method::DELETE,
            &format!("{}/{}", records_endpoint(&zone.zone_id), record_id),
            &zone.credentials()?,
            None,
        )
        .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
