use std::time::Duration;

use tracing::{debug, warn};

use crate::targets;

/// Candidate schemes tried in order; printers serving a self-signed cert
/// are the common case, so https is tried first but a failed TLS handshake
/// falls back to http rather than being treated as "no web UI".
const SCHEMES: [&str; 2] = ["https", "http"];

pub fn candidate_urls(host: &str, open_ports: &[u16]) -> Vec<String> {
    let mut urls = Vec::new();
    let has_443 = open_ports.contains(&443);
    let has_80 = open_ports.contains(&80);

    if has_443 {
        urls.push(format!("https://{host}/"));
    }
    if has_80 {
        urls.push(format!("http://{host}/"));
    }
    if urls.is_empty() {
        for scheme in SCHEMES {
            urls.push(format!("{scheme}://{host}/"));
        }
    }
    urls
}

/// Probes candidate URLs in order and returns the first one that answers,
/// trusting any certificate since printer web UIs are almost always
/// self-signed and there is no CA relationship to validate against.
pub async fn probe_web_ui(host: &str, open_ports: &[u16], timeout: Duration) -> Option<String> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(timeout)
        .build()
        .ok()?;

    for url in candidate_urls(host, open_ports) {
        debug!(target: targets::DISCOVERY, url = %url, "probing web UI");
        match client.head(&url).send().await {
            Ok(response) if response.status().is_success() || response.status().is_redirection() => {
                return Some(url);
            }
            Ok(response) => {
                debug!(target: targets::DISCOVERY, url = %url, status = %response.status(), "web UI probe non-success");
            }
            Err(error) => {
                warn!(target: targets::DISCOVERY, url = %url, error = %error, "web UI probe failed");
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_https_when_443_is_open() {
        let urls = candidate_urls("10.0.0.5", &[80, 443]);
        assert_eq!(urls[0], "https://10.0.0.5/");
    }

    #[test]
    fn falls_back_to_both_schemes_when_ports_unknown() {
        let urls = candidate_urls("10.0.0.5", &[]);
        assert_eq!(urls, vec!["https://10.0.0.5/", "http://10.0.0.5/"]);
    }
}
