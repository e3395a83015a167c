use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Method;
use tracing::warn;

use printfleet_core::targets;
use printfleet_core::Error;

use super::messages::AgentMessage;

/// Executes a proxied HTTP request against a device's web UI and packages
/// the response for the control channel. Trusts any certificate for the
/// same reason `webui::probe_web_ui` does: device web UIs are almost always
/// self-signed and there is no useful CA relationship to validate.
pub async fn execute_proxy_request(
    request_id: String,
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body_base64: Option<String>,
) -> AgentMessage {
    match try_execute(&method, &url, &headers, body_base64.as_deref()).await {
        Ok((status, response_headers, body)) => AgentMessage::ProxyResponse {
            request_id,
            status,
            headers: response_headers,
            body_base64: BASE64.encode(body),
        },
        Err(error) => {
            warn!(
                target: targets::PROXY,
                request_id,
                detail = %error.technical_detail(),
                "proxy request failed"
            );
            AgentMessage::ProxyResponse {
                request_id,
                status: 502,
                headers: Vec::new(),
                body_base64: BASE64.encode(error.user_summary()),
            }
        }
    }
}

async fn try_execute(
    method: &str,
    url: &str,
    headers: &[(String, String)],
    body_base64: Option<&str>,
) -> Result<(u16, Vec<(String, String)>, Vec<u8>), Error> {
    let method = Method::from_bytes(method.as_bytes()).map_err(|error| Error::ProxyPreparation {
        request_id: url.to_string(),
        details: format!("invalid HTTP method {method}: {error}"),
    })?;

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|error| Error::ProxyPreparation {
            request_id: url.to_string(),
            details: error.to_string(),
        })?;

    let mut builder = client.request(method, url);
    for (key, value) in headers {
        builder = builder.header(key, value);
    }
    if let Some(body_base64) = body_base64 {
        let body = BASE64.decode(body_base64).map_err(|error| Error::ProxyPreparation {
            request_id: url.to_string(),
            details: format!("invalid base64 body: {error}"),
        })?;
        builder = builder.body(body);
    }

    let response = builder.send().await.map_err(|error| Error::ProxyPreparation {
        request_id: url.to_string(),
        details: error.to_string(),
    })?;

    let status = response.status().as_u16();
    let response_headers = response
        .headers()
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or("").to_string()))
        .collect();
    let body = response.bytes().await.map_err(|error| Error::ProxyPreparation {
        request_id: url.to_string(),
        details: error.to_string(),
    })?;

    Ok((status, response_headers, body.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_method_is_reported_as_a_502_proxy_response() {
        let message = execute_proxy_request(
            "req-1".to_string(),
            "NOT A METHOD".to_string(),
            "http://127.0.0.1:1/".to_string(),
            vec![],
            None,
        )
        .await;

        match message {
            AgentMessage::ProxyResponse { request_id, status, .. } => {
                assert_eq!(request_id, "req-1");
                assert_eq!(status, 502);
            }
            other => panic!("expected a 502 proxy response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_base64_body_is_reported_as_a_502_proxy_response() {
        let message = execute_proxy_request(
            "req-2".to_string(),
            "POST".to_string(),
            "http://127.0.0.1:1/".to_string(),
            vec![],
            Some("not-base64!!".to_string()),
        )
        .await;

        match message {
            AgentMessage::ProxyResponse { status, body_base64, .. } => {
                assert_eq!(status, 502);
                let body = BASE64.decode(body_base64).unwrap();
                assert!(!body.is_empty());
            }
            other => panic!("expected a 502 proxy response, got {other:?}"),
        }
    }
}
