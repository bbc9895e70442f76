// # Supervisor Address Detector
//
// Detects the host's current addresses by asking the local supervisor's
// network-info endpoint.
//
// ## Behaviour
//
// - One GET per detection, no caching between cycles
// - Only the first interface is consulted
// - Only the first address of each family is used; a `/prefix` suffix is stripped
// - A family that is missing or unparsable is reported as not detected,
//   the endpoint itself being unreachable is a detector error

use async_trait::async_trait;
use cfddns_core::traits::{AddressDetector, DetectedAddresses};
use cfddns_core::{Error, Result};
use serde_json::Value;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Default network-info endpoint
pub const DEFAULT_NETWORK_INFO_URL: &str = "http://supervisor/network/info";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Address detector backed by the supervisor network-info endpoint
#[derive(Clone)]
pub struct SupervisorDetector {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for SupervisorDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorDetector")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SupervisorDetector {
    /// Create a detector for `url`, authenticating with `token` when present
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::detector(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::from_client(client, url, token))
    }

    pub fn from_client(
        client: reqwest::Client,
        url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.filter(|t| !t.is_empty()),
            client,
        }
    }

    async fn fetch(&self) -> Result<Value> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::detector(format!("GET {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::detector(format!(
                "GET {} failed with status {}",
                self.url, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::detector(format!("Invalid network info from {}: {}", self.url, e)))
    }
}

#[async_trait]
impl AddressDetector for SupervisorDetector {
    async fn detect(&self) -> Result<DetectedAddresses> {
        let info = self.fetch().await?;
        let detected = parse_network_info(&info);
        debug!(
            "Detected addresses: ipv4={:?} ipv6={:?}",
            detected.ipv4, detected.ipv6
        );
        Ok(detected)
    }
}

/// Extract the first interface's addresses from a network-info document
///
/// Accepts both the enveloped form `{"data": {"interfaces": [...]}}` and a
/// bare `{"interfaces": [...]}`.
pub fn parse_network_info(info: &Value) -> DetectedAddresses {
    let interfaces = info
        .get("data")
        .unwrap_or(info)
        .get("interfaces")
        .and_then(Value::as_array);

    let Some(interface) = interfaces.and_then(|list| list.first()) else {
        warn!("Network info lists no interfaces");
        return DetectedAddresses::default();
    };

    DetectedAddresses::new(
        first_address::<Ipv4Addr>(interface, "ipv4"),
        first_address::<Ipv6Addr>(interface, "ipv6"),
    )
}

fn first_address<T: FromStr>(interface: &Value, family: &str) -> Option<T> {
    let raw = interface
        .get(family)?
        .get("address")?
        .as_array()?
        .first()?
        .as_str()?;

    let address = strip_prefix_len(raw);
    match address.parse() {
        Ok(ip) => Some(ip),
        Err(_) => {
            debug!("Ignoring unparsable {} address '{}'", family, raw);
            None
        }
    }
}

/// `"192.0.2.10/24"` → `"192.0.2.10"`
fn strip_prefix_len(address: &str) -> &str {
    address.split('/').next().unwrap_or(address).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_first_address_of_first_interface() {
        let info = json!({
            "result": "ok",
            "data": {
                "interfaces": [
                    {
                        "interface": "eth0",
                        "ipv4": {"address": ["192.0.2.10/24", "192.0.2.11/24"]},
                        "ipv6": {"address": ["2001:db8::10/64"]}
                    },
                    {
                        "interface": "wlan0",
                        "ipv4": {"address": ["198.51.100.1/24"]}
                    }
                ]
            }
        });

        let detected = parse_network_info(&info);

        assert_eq!(detected.ipv4, Some("192.0.2.10".parse().unwrap()));
        assert_eq!(detected.ipv6, Some("2001:db8::10".parse().unwrap()));
    }

    #[test]
    fn empty_address_list_is_undetected() {
        let info = json!({
            "data": {"interfaces": [{
                "ipv4": {"address": ["203.0.113.9"]},
                "ipv6": {"address": []}
            }]}
        });

        let detected = parse_network_info(&info);

        assert_eq!(detected.ipv4, Some("203.0.113.9".parse().unwrap()));
        assert_eq!(detected.ipv6, None);
    }

    #[test]
    fn missing_interfaces_is_undetected() {
        assert_eq!(parse_network_info(&json!({"data": {}})), DetectedAddresses::default());
        assert_eq!(
            parse_network_info(&json!({"data": {"interfaces": []}})),
            DetectedAddresses::default()
        );
    }

    #[test]
    fn bare_document_without_envelope() {
        let info = json!({"interfaces": [{"ipv6": {"address": ["2001:db8::1/128"]}}]});

        let detected = parse_network_info(&info);

        assert_eq!(detected.ipv4, None);
        assert_eq!(detected.ipv6, Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn wrong_family_or_garbage_is_ignored() {
        let info = json!({
            "data": {"interfaces": [{
                "ipv4": {"address": ["2001:db8::1/64"]},
                "ipv6": {"address": ["not-an-address"]}
            }]}
        });

        assert_eq!(parse_network_info(&info), DetectedAddresses::default());
    }

    #[test]
    fn debug_redacts_token() {
        let detector =
            SupervisorDetector::new(DEFAULT_NETWORK_INFO_URL, Some("secret".into())).unwrap();
        let debug = format!("{:?}", detector);

        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_detector_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let url = format!("http://{}/network/info", addr);
        let detector = SupervisorDetector::from_client(client, url, None);

        let err = detector.detect().await.unwrap_err();
        assert!(matches!(err, Error::Detector(_)));
    }
}
