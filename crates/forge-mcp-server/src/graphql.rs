//! Execute GraphQL requests against the upstream endpoint

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use rmcp::model::JsonObject;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::credential::Credential;
use crate::errors::GraphQLError;

/// The POST payload for a GraphQL request
#[derive(Debug, Serialize)]
struct Request<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a JsonObject>,
}

/// Client for the single upstream GraphQL endpoint
#[derive(Debug, Clone)]
pub struct GraphQLClient {
    http: reqwest::Client,
    endpoint: Url,
    debug: bool,
}

impl GraphQLClient {
    pub fn new(http: reqwest::Client, endpoint: Url, debug: bool) -> Self {
        Self {
            http,
            endpoint,
            debug,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send `query` with `variables` and return the raw response body.
    ///
    /// The body is returned whatever the response status: GraphQL errors are the caller's
    /// business. Only transport failures are errors.
    pub async fn execute(
        &self,
        query: &str,
        variables: &JsonObject,
        credential: Option<&Credential>,
    ) -> Result<Bytes, GraphQLError> {
        let body = serde_json::to_vec(&Request {
            query,
            variables: (!variables.is_empty()).then_some(variables),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(credential) = credential {
            let value = credential
                .header_value()
                .map_err(|_| GraphQLError::InvalidCredential)?;
            headers.insert(AUTHORIZATION, value);
        }

        if self.debug {
            debug!(
                url = %self.endpoint,
                headers = ?headers,
                authorization_sha256 = ?credential.map(Credential::fingerprint),
                body = %String::from_utf8_lossy(&body),
                "GraphQL request"
            );
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(GraphQLError::Request)?;

        let status = response.status();
        let body = response.bytes().await.map_err(GraphQLError::ReadBody)?;

        if self.debug {
            debug!(
                status = status.as_u16(),
                body = %pretty_body(&body),
                "GraphQL response"
            );
        }

        Ok(body)
    }
}

/// Pretty print a JSON body, falling back to the raw text
fn pretty_body(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}
