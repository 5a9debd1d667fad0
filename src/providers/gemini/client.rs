use crate::core::error::StudioError;
use crate::image::types::{ImagePayload, ImageRequest, OUTPUT_MIME_TYPE};
use crate::providers::FragmentStream;
use crate::providers::base_client::HttpClient;
use crate::providers::gemini::types::*;
use tracing::{debug, info, warn};

/// Parser for one `data:` payload of a Gemini SSE stream.
///
/// Returns the concatenated text of the first candidate, `None` for events
/// that carry no text (usage or finish-only events), and an error for error
/// events or blocked prompts.
pub fn gemini_stream_parser(data: String) -> Result<Option<String>, StudioError> {
    let parsed: GeminiResponse = serde_json::from_str(&data).map_err(|e| {
        StudioError::Serialization(format!(
            "Failed to parse stream data: {}. Data: '{}'",
            e, data
        ))
    })?;

    if let Some(error) = parsed.error {
        let code = error.code.map(|c| format!(" {}", c)).unwrap_or_default();
        return Err(StudioError::Api(format!(
            "Gemini stream error ({}{}): {}",
            error.status.unwrap_or_else(|| "UNKNOWN".to_string()),
            code,
            error.message
        )));
    }

    let Some(candidate) = parsed.candidates.first() else {
        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(StudioError::Api(format!("Prompt blocked: {}", reason)));
        }
        return Ok(None);
    };

    let text = candidate
        .content
        .as_ref()
        .map(GeminiContent::joined_text)
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.as_deref().filter(|r| *r != "STOP") {
            warn!(%reason, "Candidate finished without text");
        }
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    pub chat_model: String,
    pub image_model: String,
    client: HttpClient,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String, chat_model: String, image_model: String) -> Self {
        let mut client = HttpClient::new(base_url);
        client.add_query_param("key", api_key);

        Self {
            chat_model,
            image_model,
            client,
        }
    }

    pub async fn stream_generate_content(
        &self,
        contents: Vec<GeminiContent>,
        system_instruction: &str,
    ) -> Result<FragmentStream, StudioError> {
        let payload = GeminiRequest {
            contents,
            system_instruction: Some(SystemInstruction {
                parts: vec![GeminiPart::text(system_instruction)],
            }),
        };
        debug!(
            model = %self.chat_model,
            turns = payload.contents.len(),
            "Opening Gemini reply stream"
        );

        let response = self
            .client
            .post_with_query(
                &format!("v1beta/models/{}:streamGenerateContent", self.chat_model),
                &payload,
                &[("alt", "sse")],
            )
            .await?;

        Ok(self.client.stream_response(response, gemini_stream_parser))
    }

    pub async fn predict_images(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<ImagePayload>, StudioError> {
        let payload = PredictRequest {
            instances: vec![PredictInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: PredictParameters {
                sample_count: request.number_of_images.get(),
                aspect_ratio: request.aspect_ratio.to_string(),
                output_options: OutputOptions {
                    mime_type: OUTPUT_MIME_TYPE.to_string(),
                },
            },
        };
        info!(
            model = %self.image_model,
            count = payload.parameters.sample_count,
            aspect_ratio = %payload.parameters.aspect_ratio,
            "Requesting image batch"
        );

        let response = self
            .client
            .post(&format!("v1beta/models/{}:predict", self.image_model), &payload)
            .await?;

        let body = response.text().await?;
        let parsed: PredictResponse = if body.trim().is_empty() || body.trim() == "{}" {
            PredictResponse::default()
        } else {
            serde_json::from_str(&body).map_err(|e| {
                StudioError::Serialization(format!("Failed to parse Imagen response: {}", e))
            })?
        };

        let mut images = Vec::with_capacity(parsed.predictions.len());
        for prediction in parsed.predictions {
            let Some(encoded) = prediction.bytes_base64_encoded else {
                if let Some(reason) = prediction.rai_filtered_reason {
                    warn!(%reason, "Image filtered by provider");
                }
                continue;
            };
            let mime_type = prediction
                .mime_type
                .unwrap_or_else(|| OUTPUT_MIME_TYPE.to_string());
            let image = ImagePayload::from_base64(mime_type, &encoded)?;
            if image.is_empty() {
                warn!("Skipping prediction with empty image data");
                continue;
            }
            images.push(image);
        }

        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::types::{AspectRatio, ImageCount};
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(
            server.uri(),
            "test-key".to_string(),
            "chat-model".to_string(),
            "image-model".to_string(),
        )
    }

    fn sse_body(events: &[serde_json::Value]) -> String {
        events
            .iter()
            .map(|e| format!("data: {}\r\n\r\n", e))
            .collect()
    }

    fn text_event(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })
    }

    #[test]
    fn parser_joins_all_text_parts() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#;
        assert_eq!(gemini_stream_parser(data.to_string()).unwrap().as_deref(), Some("ab"));
    }

    #[test]
    fn parser_ignores_events_without_text() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":3}}"#;
        assert!(gemini_stream_parser(data.to_string()).unwrap().is_none());
    }

    #[test]
    fn parser_reports_error_events() {
        let data = r#"{"error":{"code":500,"message":"internal","status":"INTERNAL"}}"#;
        let err = gemini_stream_parser(data.to_string()).unwrap_err();
        assert!(matches!(err, StudioError::Api(ref m) if m.contains("INTERNAL 500")));
    }

    #[test]
    fn parser_reports_blocked_prompts() {
        let data = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(gemini_stream_parser(data.to_string()).is_err());
    }

    #[test]
    fn parser_rejects_malformed_json() {
        let err = gemini_stream_parser("{not json".to_string()).unwrap_err();
        assert!(matches!(err, StudioError::Serialization(_)));
    }

    #[tokio::test]
    async fn streams_fragments_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/chat-model:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[
                        text_event("Hel"),
                        text_event("lo"),
                        serde_json::json!({"candidates": [{"finishReason": "STOP"}]}),
                    ])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let stream = client_for(&server)
            .stream_generate_content(vec![GeminiContent::user("hi")], "be brief")
            .await
            .unwrap();
        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;

        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn error_status_fails_initiation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .stream_generate_content(vec![GeminiContent::user("hi")], "sys")
            .await;

        assert!(matches!(result, Err(StudioError::Api(ref m)) if m.contains("403")));
    }

    #[tokio::test]
    async fn mid_stream_error_is_yielded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sse_body(&[
                text_event("partial"),
                serde_json::json!({"error": {"message": "overloaded", "status": "UNAVAILABLE"}}),
            ])))
            .mount(&server)
            .await;

        let stream = client_for(&server)
            .stream_generate_content(vec![GeminiContent::user("hi")], "sys")
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "partial");
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn predicts_images_in_provider_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/image-model:predict"))
            .and(body_partial_json(serde_json::json!({
                "instances": [{"prompt": "a red cube"}],
                "parameters": {
                    "sampleCount": 2,
                    "aspectRatio": "16:9",
                    "outputOptions": {"mimeType": "image/jpeg"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [
                    {"bytesBase64Encoded": "AQ==", "mimeType": "image/jpeg"},
                    {"raiFilteredReason": "filtered"},
                    {"bytesBase64Encoded": "", "mimeType": "image/jpeg"},
                    {"bytesBase64Encoded": "Ag=="}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ImageRequest {
            prompt: "a red cube".to_string(),
            number_of_images: ImageCount::new(2).unwrap(),
            aspect_ratio: AspectRatio::Wide,
        };
        let images = client_for(&server).predict_images(&request).await.unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].bytes(), &[1]);
        assert_eq!(images[1].bytes(), &[2]);
        assert_eq!(images[1].mime_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn empty_prediction_body_means_no_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let request = ImageRequest {
            prompt: "nothing".to_string(),
            number_of_images: ImageCount::default(),
            aspect_ratio: AspectRatio::Square,
        };
        let images = client_for(&server).predict_images(&request).await.unwrap();

        assert!(images.is_empty());
    }
}
