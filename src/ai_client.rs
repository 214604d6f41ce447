use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::model::NodeKind;
use crate::template::substitute;

#[cfg(not(test))]
const AI_CALL_TIMEOUT: Duration = Duration::from_secs(60);
// Kept short under test so a deliberately slow mock endpoint can exercise the
// timeout path without a real-time wait; production behavior is unaffected.
#[cfg(test)]
const AI_CALL_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Serialize)]
struct AiRequest<'a> {
    prompt: &'a str,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    system_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Perform a `gptQuery` node's AI call and return the value to store into
/// `saveResponseTo`. Never returns `Err`: every failure mode is mapped into
/// a sentinel string per §4.6's table, and the engine proceeds via the
/// node's `_internal_error_` edge (if present) exactly as it would on
/// success.
pub async fn call(
    client: &reqwest::Client,
    ai_query_api_url: Option<&str>,
    kind: &NodeKind,
    variables: &HashMap<String, String>,
) -> String {
    let NodeKind::GptQuery {
        prompt,
        api_key_variable,
        system_message,
        model,
        temperature,
        max_tokens,
        ..
    } = kind
    else {
        return "ERRO_CONFIG_IA: nó não é do tipo gptQuery".to_string();
    };

    let Some(prompt) = prompt.as_deref() else {
        return "ERRO_CONFIG_IA: campo 'prompt' ausente.".to_string();
    };
    let Some(api_key_variable) = api_key_variable.as_deref() else {
        return "ERRO_CONFIG_IA: campo 'apiKeyVariable' ausente.".to_string();
    };

    let Some(api_key) = variables.get(api_key_variable) else {
        return format!("ERRO_IA: API Key '{api_key_variable}' não definida.");
    };

    let Some(url) = ai_query_api_url else {
        return "ERRO_CONFIG_CTRL: URL da API de IA não configurada.".to_string();
    };

    let expanded_prompt = substitute(Some(prompt), variables).unwrap_or_default();
    let expanded_system = system_message
        .as_deref()
        .map(|m| substitute(Some(m), variables).unwrap_or_default());

    let request = AiRequest {
        prompt: &expanded_prompt,
        api_key,
        system_message: expanded_system.as_deref(),
        model: model.as_deref(),
        temperature: *temperature,
        max_tokens: *max_tokens,
    };

    let response = client
        .post(url)
        .timeout(AI_CALL_TIMEOUT)
        .json(&request)
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(err) if err.is_timeout() => return "ERRO_IA_TIMEOUT".to_string(),
        Err(err) if err.is_connect() => return format!("ERRO_IA_CONEXAO: {}", truncate(&err.to_string(), 100)),
        Err(err) => return format!("ERRO_IA_INESPERADO: {}", truncate(&err.to_string(), 100)),
    };

    let response = match response.error_for_status() {
        Ok(response) => response,
        Err(err) => return format!("ERRO_IA_CONEXAO: {}", truncate(&err.to_string(), 100)),
    };

    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(err) => return format!("ERRO_IA_INESPERADO: {}", truncate(&err.to_string(), 100)),
    };

    let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
    if success {
        if let Some(text) = body.get("response").and_then(Value::as_str) {
            return text.to_string();
        }
    }

    let details = body
        .get("details")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("resposta inesperada da API de IA");
    format!("ERRO_IA_API: {}", truncate(details, 200))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    fn gpt_query(prompt: &str, api_key_variable: &str, save_to: &str) -> NodeKind {
        NodeKind::GptQuery {
            prompt: Some(prompt.to_string()),
            api_key_variable: Some(api_key_variable.to_string()),
            save_response_to: Some(save_to.to_string()),
            system_message: None,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Spawn a one-shot mock AI endpoint; `respond` builds the JSON body,
    /// optionally after `delay`.
    async fn spawn_mock(delay: Option<Duration>, body: Value) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/",
            post(move || {
                let body = body.clone();
                async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    Json(body)
                }
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn successful_call_returns_response_text() {
        let url = spawn_mock(None, serde_json::json!({"success": true, "response": "hello"})).await;
        let client = reqwest::Client::new();
        let mut vars = HashMap::new();
        vars.insert("K".to_string(), "sk-x".to_string());
        let kind = gpt_query("Q:{{q}}", "K", "A");
        vars.insert("q".to_string(), "hi".to_string());
        let result = call(&client, Some(&url), &kind, &vars).await;
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn slow_endpoint_yields_timeout_sentinel() {
        let url = spawn_mock(Some(Duration::from_millis(500)), serde_json::json!({"success": true})).await;
        let client = reqwest::Client::new();
        let mut vars = HashMap::new();
        vars.insert("K".to_string(), "sk-x".to_string());
        let kind = gpt_query("Q", "K", "A");
        let result = call(&client, Some(&url), &kind, &vars).await;
        assert_eq!(result, "ERRO_IA_TIMEOUT");
    }

    #[tokio::test]
    async fn connection_refused_yields_conexao_sentinel() {
        let client = reqwest::Client::new();
        let mut vars = HashMap::new();
        vars.insert("K".to_string(), "sk-x".to_string());
        let kind = gpt_query("Q", "K", "A");
        let result = call(&client, Some("http://127.0.0.1:1"), &kind, &vars).await;
        assert!(result.starts_with("ERRO_IA_CONEXAO"));
    }

    #[tokio::test]
    async fn missing_api_key_value_yields_named_sentinel() {
        let client = reqwest::Client::new();
        let vars = HashMap::new();
        let kind = gpt_query("Q", "K", "A");
        let result = call(&client, Some("http://example.invalid/"), &kind, &vars).await;
        assert_eq!(result, "ERRO_IA: API Key 'K' não definida.");
    }

    #[tokio::test]
    async fn missing_api_url_yields_config_sentinel() {
        let client = reqwest::Client::new();
        let mut vars = HashMap::new();
        vars.insert("K".to_string(), "sk-x".to_string());
        let kind = gpt_query("Q", "K", "A");
        let result = call(&client, None, &kind, &vars).await;
        assert_eq!(result, "ERRO_CONFIG_CTRL: URL da API de IA não configurada.");
    }

    #[tokio::test]
    async fn unsuccessful_response_is_truncated_into_api_sentinel() {
        let url = spawn_mock(
            None,
            serde_json::json!({"success": false, "details": "rate limited"}),
        )
        .await;
        let client = reqwest::Client::new();
        let mut vars = HashMap::new();
        vars.insert("K".to_string(), "sk-x".to_string());
        let kind = gpt_query("Q", "K", "A");
        let result = call(&client, Some(&url), &kind, &vars).await;
        assert_eq!(result, "ERRO_IA_API: rate limited");
    }
}
