use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Rewrite a journal entry as warmer, fuller prose via the Claude API.
/// An empty model reply falls back to the caller's original text.
pub async fn polish_content(config: &Config, content: &str) -> AppResult<String> {
    if config.claude_api_key.is_empty() {
        return Err(AppError::Internal(anyhow::anyhow!(
            "CLAUDE_API_KEY is not configured"
        )));
    }

    let prompt = format!(
        "You polish short journal entries. Rewrite the entry below as warm, flowing prose \
         roughly one and a half times its current length. Keep every event and feeling from \
         the original, do not invent new details, and reply with the polished entry only.\n\n{}",
        content
    );

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", &config.claude_api_key)
        .header("anthropic-version", "2023-06-01")
        .header("content-type", "application/json")
        .json(&serde_json::json!({
            "model": config.claude_model,
            "max_tokens": 1024,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        }))
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Polish request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!(
            "Polish service error {}: {}",
            status, body
        )));
    }

    let payload: serde_json::Value = response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Invalid polish response: {}", e)))?;

    let polished = payload["content"][0]["text"].as_str().unwrap_or("").trim();

    if polished.is_empty() {
        tracing::warn!("Polish came back empty; returning the original content");
        return Ok(content.to_string());
    }

    Ok(polished.to_string())
}
