//! Gemini text generation via REST API (no SDK dependency)

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const MODEL: &str = "gemini-2.5-flash-lite";

/// Call `generateContent` with a system instruction and a user prompt,
/// returning the first candidate's text.
pub async fn generate_text(
    client: &reqwest::Client,
    api_key: &str,
    system_instruction: &str,
    prompt: &str,
) -> Result<String, BoxError> {
    let body = serde_json::json!({
        "systemInstruction": {
            "parts": [{ "text": system_instruction }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }]
    });

    let resp: serde_json::Value = client
        .post(format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{MODEL}:generateContent"
        ))
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await?
        .json()
        .await?;

    resp["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| format!("Gemini generateContent failed: {resp}").into())
}

/// Strip a Markdown code fence wrapper if the model returned one.
/// Models often wrap JSON answers in ```json ... ``` despite instructions.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the optional language tag on the opening fence line
    match inner.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence_json() {
        let fenced = "```json\n{\"title\":\"x\"}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"title\":\"x\"}");
    }

    #[test]
    fn test_strip_code_fence_no_language() {
        let fenced = "```\n{\"title\":\"x\"}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"title\":\"x\"}");
    }

    #[test]
    fn test_strip_code_fence_passthrough() {
        assert_eq!(strip_code_fence("  plain text  "), "plain text");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
    }
}
