use crate::core::error::StudioError;
use crate::providers::FragmentStream;
use crate::providers::sse;
use futures::stream::StreamExt;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, warn};

/// Thin JSON-over-HTTP client shared by provider implementations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    query_params: Vec<(String, String)>,
}

impl HttpClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            query_params: Vec::new(),
        }
    }

    /// Append a query parameter sent with every request.
    pub fn add_query_param(&mut self, key: &str, value: String) {
        self.query_params.push((key.to_string(), value));
    }

    /// POST `payload` as JSON to `path`. Non-success statuses become
    /// [`StudioError::Api`] carrying the status and response body.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Response, StudioError> {
        self.post_with_query(path, payload, &[]).await
    }

    pub async fn post_with_query<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        query: &[(&str, &str)],
    ) -> Result<Response, StudioError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .query(&self.query_params)
            .query(query)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "Provider rejected request");
            return Err(StudioError::Api(format!("{}: {}", status, body)));
        }

        Ok(response)
    }

    /// Stream an SSE response body through `parser`, one `data:` payload at a
    /// time. Payloads the parser maps to `None` produce no fragment.
    pub fn stream_response<F>(&self, response: Response, parser: F) -> FragmentStream
    where
        F: Fn(String) -> Result<Option<String>, StudioError> + Send + Sync + 'static,
    {
        sse::data_lines(response.bytes_stream())
            .filter_map(move |item| {
                let parsed = item.and_then(&parser).transpose();
                futures::future::ready(parsed)
            })
            .boxed()
    }
}
