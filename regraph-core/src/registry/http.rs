use super::{ComponentLookup, ComponentPayload, Lookup};
use crate::{RegraphConfig, RegraphError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Instant;

/// Component lookup backed by the marketplace HTTP API.
#[derive(Clone, Debug)]
pub struct HttpRegistry {
    client: Client,
    base: String,
    api_key: Option<String>,
}

/// Shared client for registry lookups and artifact fetches.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("regraph/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| RegraphError::HttpClient { source })
}

impl HttpRegistry {
    pub fn new(config: &RegraphConfig, client: Client) -> Self {
        HttpRegistry {
            client,
            base: config.registry_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn component_url(&self, author: &str, slug: &str) -> String {
        format!(
            "{}/api/r/{}/{}",
            self.base,
            urlencoding::encode(author),
            urlencoding::encode(slug)
        )
    }
}

impl ComponentLookup for HttpRegistry {
    async fn lookup(&self, author: &str, slug: &str) -> Result<Lookup> {
        let url = self.component_url(author, slug);
        let origin = format!("{author}/{slug}");

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(key) = self.api_key.as_ref() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key));
        }

        tracing::debug!(component = %origin, %url, "registry request");
        let started = Instant::now();

        let response = request
            .send()
            .await
            .map_err(|source| RegraphError::ServiceUnavailable {
                url: url.clone(),
                reason: source.to_string(),
            })?;

        let status = response.status();
        tracing::debug!(
            component = %origin,
            status = status.as_u16(),
            elapsed = started.elapsed().as_secs_f64(),
            "registry response"
        );

        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Ok(classify_not_found(&body));
        }

        if status.is_server_error()
            || status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::TOO_MANY_REQUESTS
        {
            return Err(RegraphError::ServiceUnavailable {
                url,
                reason: format!("registry answered {}", status),
            });
        }

        if !status.is_success() {
            tracing::warn!(component = %origin, status = status.as_u16(), "unexpected registry status");
            return Ok(Lookup::ComponentNotFound);
        }

        match response.json::<ComponentPayload>().await {
            Ok(payload) => Ok(Lookup::Found(payload.into_record(&origin))),
            Err(err) => {
                tracing::warn!(component = %origin, error = %err, "undecodable registry record");
                Ok(Lookup::ComponentNotFound)
            }
        }
    }
}

fn classify_not_found(body: &str) -> Lookup {
    let reason = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string));

    match reason.as_deref() {
        Some("user_not_found") => Lookup::UserNotFound,
        _ => Lookup::ComponentNotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_encoded_component_urls() {
        let config = RegraphConfig {
            registry_url: "https://reg.example.com/".into(),
            ..RegraphConfig::default()
        };
        let registry = HttpRegistry::new(&config, Client::new());
        assert_eq!(
            registry.component_url("shadcn", "button group"),
            "https://reg.example.com/api/r/shadcn/button%20group"
        );
    }

    #[test]
    fn distinguishes_missing_users() {
        assert_eq!(
            classify_not_found(r#"{"error":"user_not_found"}"#),
            Lookup::UserNotFound
        );
        assert_eq!(
            classify_not_found(r#"{"error":"component_not_found"}"#),
            Lookup::ComponentNotFound
        );
        assert_eq!(classify_not_found("<html>"), Lookup::ComponentNotFound);
    }

    async fn lookup_with(status: u16, body: &'static str) -> Result<Lookup> {
        let config = RegraphConfig {
            registry_url: crate::test_server::serve(status, body).await,
            ..RegraphConfig::default()
        };
        HttpRegistry::new(&config, crate::test_server::client())
            .lookup("acme", "button")
            .await
    }

    #[tokio::test]
    async fn decodes_found_records() {
        let body = r#"{"codeUrl":"https://blob/button.tsx","registryDependencies":"[\"acme/icon\"]"}"#;
        let Lookup::Found(record) = lookup_with(200, body).await.unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(record.code_url.as_deref(), Some("https://blob/button.tsx"));
        assert_eq!(record.registry_dependencies, vec!["acme/icon"]);
    }

    #[tokio::test]
    async fn unavailable_statuses_are_fatal() {
        for status in [500, 503, 401, 403, 429] {
            let err = lookup_with(status, "{}").await.unwrap_err();
            assert!(
                matches!(err, RegraphError::ServiceUnavailable { .. }),
                "{status}: {err:?}"
            );
            assert!(err.is_fatal());
        }
    }

    #[tokio::test]
    async fn other_failures_mean_not_found() {
        assert_eq!(
            lookup_with(404, r#"{"error":"user_not_found"}"#).await.unwrap(),
            Lookup::UserNotFound
        );
        assert_eq!(lookup_with(404, "").await.unwrap(), Lookup::ComponentNotFound);
        assert_eq!(lookup_with(410, "{}").await.unwrap(), Lookup::ComponentNotFound);
        assert_eq!(lookup_with(400, "{}").await.unwrap(), Lookup::ComponentNotFound);
        assert_eq!(
            lookup_with(200, "<html>oops</html>").await.unwrap(),
            Lookup::ComponentNotFound
        );
    }

    #[tokio::test]
    async fn unreachable_registry_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = RegraphConfig {
            registry_url: format!("http://{addr}"),
            ..RegraphConfig::default()
        };
        let err = HttpRegistry::new(&config, crate::test_server::client())
            .lookup("acme", "button")
            .await
            .unwrap_err();
        assert!(matches!(err, RegraphError::ServiceUnavailable { .. }));
    }
}
