use super::transport::{send_resilient, HttpRequest, Transport};
use super::EnvConfig;
use crate::document::LeafSeed;
use crate::error::{RemoteError, RemoteResult};
use crate::retry::{CancelToken, Clock, ResilientCaller};
use serde_json::{json, Value};

const EXPERT_PERSONA: &str = "You are an expert at writing prompts for LLMs.";

/// One `generateContent` call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct GenerationRequest {
    pub system_instruction: String,
    pub user_prompt: String,
    /// When set, the model is asked for JSON matching this schema.
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    pub fn payload(&self) -> Value {
        let mut payload = json!({
            "contents": [{ "parts": [{ "text": self.user_prompt }] }],
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
        });
        if let Some(schema) = &self.response_schema {
            payload["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }
        payload
    }
}

/// `candidates[0].content.parts[0].text`; `None` when absent or empty.
pub(crate) fn extract_text(response: &Value) -> Option<String> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn context_block(main_title: &str, pillar_title: &str) -> String {
    format!("Context:\nTitle: \"{main_title}\"\nPillar: \"{pillar_title}\"\n")
}

/// Drafts a section when `current` is blank, rewrites it otherwise.
pub(crate) fn rewrite_request(
    main_title: &str,
    pillar_title: &str,
    section_title: &str,
    current: &str,
) -> GenerationRequest {
    let mut system = EXPERT_PERSONA.to_string();
    let mut prompt = format!(
        "{}Section: \"{section_title}\"\n\n",
        context_block(main_title, pillar_title)
    );

    if current.trim().is_empty() {
        system.push_str(" Write relevant, concise content.");
        prompt.push_str("Instruction: write a first draft. Return only the content.");
    } else {
        system.push_str(" Rewrite the text so it is clearer and better structured.");
        prompt.push_str(&format!(
            "Text to rewrite:\n\"{current}\"\n\nReturn only the rewritten text."
        ));
    }

    GenerationRequest {
        system_instruction: system,
        user_prompt: prompt,
        response_schema: None,
    }
}

pub(crate) fn suggest_sections_request(
    main_title: &str,
    pillar_title: &str,
    existing: &[String],
) -> GenerationRequest {
    let existing = if existing.is_empty() {
        "(none)".to_string()
    } else {
        existing.join(", ")
    };
    GenerationRequest {
        system_instruction: format!(
            "{EXPERT_PERSONA} Propose sections that complete one pillar of a structured prompt."
        ),
        user_prompt: format!(
            "{}Existing sections: {existing}\n\nInstruction: propose 3 new sections, each with a short title and a first draft.",
            context_block(main_title, pillar_title)
        ),
        response_schema: Some(json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "content": { "type": "STRING" }
                },
                "required": ["title", "content"]
            }
        })),
    }
}

/// Parses the JSON array returned for [`suggest_sections_request`].
/// Entries without a title are skipped.
pub(crate) fn parse_section_suggestions(text: &str) -> RemoteResult<Vec<LeafSeed>> {
    let value: Value = serde_json::from_str(text.trim()).map_err(RemoteError::parse)?;
    let items = value
        .as_array()
        .ok_or_else(|| RemoteError::parse("expected a JSON array of sections"))?;

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let get_s = |k: &str| item.get(k).and_then(|v| v.as_str()).map(|s| s.to_string());
        let title = get_s("title").unwrap_or_default();
        if !title.trim().is_empty() {
            out.push(LeafSeed::new(title, get_s("content").unwrap_or_default()));
        }
    }
    Ok(out)
}

pub(crate) struct GenerativeClient<T, C> {
    transport: T,
    caller: ResilientCaller<C>,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl<T: Transport, C: Clock> GenerativeClient<T, C> {
    pub fn new(
        transport: T,
        caller: ResilientCaller<C>,
        config: &EnvConfig,
        api_key: Option<String>,
    ) -> Self {
        Self {
            transport,
            caller,
            base_url: config.gemini_api_url.clone(),
            model: config.gemini_model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            urlencoding::encode(key)
        )
    }

    /// Runs one generation. `Ok(None)` means the model answered without text.
    pub async fn generate(
        &self,
        cancel: &CancelToken,
        request: &GenerationRequest,
    ) -> RemoteResult<Option<String>> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            RemoteError::Configuration("set your Gemini API key in Settings".to_string())
        })?;

        let http = HttpRequest::post(self.endpoint(key)).json(&request.payload());
        let res = send_resilient(&self.transport, &self.caller, cancel, http).await?;
        let body: Value = res.json()?;
        Ok(extract_text(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::testing::ScriptedTransport;
    use crate::retry::testing::ManualClock;
    use crate::retry::{RequestTracker, RetryPolicy};
    use futures::executor::block_on;

    fn client(transport: ScriptedTransport, key: Option<&str>) -> GenerativeClient<ScriptedTransport, ManualClock> {
        GenerativeClient::new(
            transport,
            ResilientCaller::new(ManualClock::default(), RetryPolicy::default()),
            &EnvConfig::default(),
            key.map(|k| k.to_string()),
        )
    }

    const ANSWER: &str = r#"{"candidates":[{"content":{"parts":[{"text":"Be concise."}]}}]}"#;

    #[test]
    fn test_payload_shape() {
        let req = rewrite_request("Gem", "Context", "Role", "");
        let payload = req.payload();
        assert_eq!(
            payload.pointer("/systemInstruction/parts/0/text").and_then(|v| v.as_str()),
            Some(req.system_instruction.as_str())
        );
        assert!(payload.get("generationConfig").is_none());

        let req = suggest_sections_request("Gem", "Context", &[]);
        let payload = req.payload();
        assert_eq!(
            payload.pointer("/generationConfig/responseMimeType"),
            Some(&json!("application/json"))
        );
        assert_eq!(
            payload.pointer("/generationConfig/responseSchema/type"),
            Some(&json!("ARRAY"))
        );
    }

    #[test]
    fn test_rewrite_request_draft_vs_rewrite() {
        let draft = rewrite_request("Gem", "Context", "Role", "   ");
        assert!(draft.user_prompt.contains("first draft"));
        assert!(draft.user_prompt.contains("Section: \"Role\""));

        let rewrite = rewrite_request("Gem", "Context", "Role", "old text");
        assert!(rewrite.user_prompt.contains("\"old text\""));
        assert!(rewrite.system_instruction.contains("Rewrite"));
    }

    #[test]
    fn test_extract_text() {
        let v: Value = serde_json::from_str(ANSWER).unwrap();
        assert_eq!(extract_text(&v), Some("Be concise.".to_string()));
        assert_eq!(extract_text(&json!({"candidates": []})), None);
    }

    #[test]
    fn test_parse_section_suggestions() {
        let seeds = parse_section_suggestions(
            r#"[{"title":"Tone","content":"Friendly"},{"title":"  "},{"content":"orphan"},{"title":"Audience"}]"#,
        )
        .unwrap();
        assert_eq!(
            seeds,
            vec![LeafSeed::new("Tone", "Friendly"), LeafSeed::new("Audience", "")]
        );
        assert!(parse_section_suggestions("{}").is_err());
    }

    #[test]
    fn test_generate_without_key_is_configuration_error() {
        let transport = ScriptedTransport::new();
        let c = client(transport, Some("  "));
        assert!(!c.has_api_key());
        let err = block_on(c.generate(&CancelToken::never(), &rewrite_request("a", "b", "c", "")))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Configuration(_)));
    }

    #[test]
    fn test_generate_posts_to_model_endpoint() {
        let transport = ScriptedTransport::new().respond(429, "").respond(200, ANSWER);
        let c = client(transport, Some("k&y"));

        let text = block_on(c.generate(&CancelToken::never(), &rewrite_request("a", "b", "c", "")))
            .unwrap();
        assert_eq!(text.as_deref(), Some("Be concise."));

        let requests = c.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-09-2025:generateContent?key=k%26y"
        );
    }

    #[test]
    fn test_generate_superseded_request_is_cancelled() {
        let tracker = RequestTracker::new();
        let token = tracker.begin();
        tracker.begin();
        let c = client(ScriptedTransport::new().respond(200, ANSWER), Some("key"));
        let err = block_on(c.generate(&token, &rewrite_request("a", "b", "c", ""))).unwrap_err();
        assert_eq!(err, RemoteError::Cancelled);
    }
}
