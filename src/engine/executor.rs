//! HTTP request execution
//!
//! The executor owns the `reqwest` client. Its cookie store is handed in by
//! the caller and shared by every scenario of a run, so a login in one
//! scenario stays valid for the next.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;

use crate::common::config::HttpConfig;
use crate::common::{Error, Result};

use super::context::{LastResponse, ScenarioContext};
use super::graphql::{self, GraphqlRequest};

const HTTP_ENDPOINT: &str = "HTTP_ENDPOINT";
const GRAPHQL_ENDPOINT: &str = "GRAPHQL_ENDPOINT";
const RESET_ENDPOINT: &str = "RESET_ENDPOINT";
const RESET_METHOD: &str = "RESET_METHOD";
const RESET_BODY: &str = "RESET_BODY";

/// Sends scenario requests and captures responses into the context
#[derive(Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Build an executor around a shared cookie store
    pub fn new(cookies: Arc<Jar>, config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_provider(cookies)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Render `path` and `raw_body`, send the request and capture the response
    ///
    /// On transport failure the previously captured response is left as is.
    pub async fn execute(
        &self,
        ctx: &mut ScenarioContext,
        method: &str,
        path: &str,
        raw_body: &str,
    ) -> Result<()> {
        let url = resolve_url(ctx, path)?;
        let body = ctx.render_required(raw_body)?;
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidMethod(method.to_string()))?;

        let mut request = self.client.request(method.clone(), url.as_str());
        for (name, value) in ctx.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("Invalid value for header '{}': {}", name, e)))?;
            tracing::trace!(key = %name, value = ?value, "adding HTTP header");
            request = request.header(name, value);
        }
        if !body.is_empty() {
            request = request.body(body.clone());
        }

        tracing::trace!(method = %method, url = %url, body = %body, "sending request");
        let response = request.send().await.map_err(|e| Error::transport(&url, e))?;

        let status = response.status();
        let mut headers = BTreeMap::new();
        for name in response.headers().keys() {
            if let Some(value) = response.headers().get(name) {
                headers.insert(
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                );
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(&url, e))?;

        let captured = LastResponse {
            status_code: status.as_u16(),
            status_text: match status.canonical_reason() {
                Some(reason) => format!("{} {}", status.as_u16(), reason),
                None => status.as_u16().to_string(),
            },
            body: body.to_vec(),
            headers,
        };
        tracing::trace!(
            status = %captured.status_text,
            body = %captured.body_text(),
            "received response"
        );
        ctx.capture(captured);
        Ok(())
    }

    /// POST the GraphQL document stored in memory under `key`
    ///
    /// An `errors` array in the answer goes to the error channel; it does not
    /// fail the call.
    pub async fn execute_graphql(&self, ctx: &mut ScenarioContext, key: &str) -> Result<()> {
        let endpoint = ctx
            .get_nonempty_str(GRAPHQL_ENDPOINT)?
            .ok_or(Error::MissingEndpoint {
                kind: "graphql",
                key: GRAPHQL_ENDPOINT,
            })?
            .to_string();
        let query = ctx
            .get(key)
            .ok_or_else(|| Error::MissingMemoryKey(key.to_string()))?
            .as_str(key)?
            .to_string();
        tracing::trace!(endpoint = %endpoint, name = key, body = %query, "executing query");

        let payload = serde_json::to_string(&GraphqlRequest {
            query: &query,
            variables: ctx.variables(),
        })?;
        ctx.set_header("Content-Type", "application/json")?;
        self.execute(ctx, "POST", &endpoint, &payload).await?;

        if let Some(errors) = graphql::extract_errors(&ctx.last_response().body) {
            ctx.set_last_errors(errors);
        }
        Ok(())
    }

    /// Prepare `ctx` for a new scenario
    ///
    /// When `RESET_ENDPOINT` is set, the reset call is made between two
    /// context resets so nothing it captures survives. Its failure only logs.
    pub async fn reset_scenario(&self, ctx: &mut ScenarioContext) {
        ctx.reset();

        let endpoint = match ctx.get_nonempty_str(RESET_ENDPOINT) {
            Ok(Some(endpoint)) => endpoint.to_string(),
            Ok(None) => {
                tracing::trace!("skipping reset - no RESET_ENDPOINT defined");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping reset");
                return;
            }
        };
        let method = ctx
            .get_nonempty_str(RESET_METHOD)
            .ok()
            .flatten()
            .unwrap_or("GET")
            .to_string();
        let body = ctx
            .get_nonempty_str(RESET_BODY)
            .ok()
            .flatten()
            .unwrap_or_default()
            .to_string();

        tracing::trace!(url = %endpoint, method = %method, "resetting backend");
        match self.execute(ctx, &method, &endpoint, &body).await {
            Ok(()) if ctx.last_response().status_code != 200 => {
                let response = ctx.last_response();
                tracing::warn!(
                    code = response.status_code,
                    status = %response.status_text,
                    body = %response.body_text(),
                    "reset call did not return 200"
                );
            }
            Ok(()) => {}
            Err(e) => tracing::warn!(error = %e, "reset call failed"),
        }

        ctx.reset();
    }
}

/// Absolute URLs are used as-is, anything else is appended to `HTTP_ENDPOINT`
fn resolve_url(ctx: &ScenarioContext, path: &str) -> Result<String> {
    let path = ctx.render_required(path)?;
    if path.starts_with("http") {
        return Ok(path);
    }
    let endpoint = ctx
        .get_nonempty_str(HTTP_ENDPOINT)?
        .ok_or(Error::MissingEndpoint {
            kind: "http",
            key: HTTP_ENDPOINT,
        })?;
    Ok(format!("{}{}", endpoint, path))
}
