//! Ollama model host client
//!
//! Blocking HTTP client for the local Ollama endpoint: `/api/generate`
//! for text generation and `/api/embed` for embeddings. Context window
//! size is computed from the prompt unless the caller fixed one.

use std::time::Duration;

use serde_json::json;

use crate::error::{ParanoidError, Result};
use crate::llm::context::context_size_for_prompt;
use crate::llm::{GenerateOptions, Generation, ModelHost};

/// Client for a single Ollama host
pub struct OllamaHost {
    host: String,
    client: reqwest::blocking::Client,
}

impl OllamaHost {
    /// Create a client for the given base URL with a per-call timeout
    pub fn new(host: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ParanoidError::ModelError {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn post(&self, endpoint: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.host, endpoint);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            let model = body
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
                .to_string();
            return Err(ParanoidError::ModelNotFound { model });
        }
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(ParanoidError::ModelError {
                message: format!("{} returned {}: {}", url, status, text),
            });
        }

        response.json().map_err(|e| ParanoidError::ModelError {
            message: format!("invalid response from {}: {}", url, e),
        })
    }

    fn map_transport_error(&self, error: reqwest::Error) -> ParanoidError {
        if error.is_connect() || error.is_timeout() {
            ParanoidError::ModelHostUnreachable {
                host: self.host.clone(),
                message: error.to_string(),
            }
        } else {
            ParanoidError::ModelError {
                message: error.to_string(),
            }
        }
    }
}

impl ModelHost for OllamaHost {
    fn generate(&self, model: &str, prompt: &str, options: &GenerateOptions) -> Result<Generation> {
        let num_ctx = match options.num_ctx {
            Some(n) => n,
            None => context_size_for_prompt(prompt)?,
        };
        let mut opts = json!({ "num_ctx": num_ctx });
        if let Some(temperature) = options.temperature {
            opts["temperature"] = json!(temperature);
        }
        if let Some(num_predict) = options.num_predict {
            opts["num_predict"] = json!(num_predict);
        }

        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": opts,
        });
        let value = self.post("/api/generate", &body)?;

        let text = value
            .get("response")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();
        let model_version = value
            .get("model")
            .and_then(|m| m.as_str())
            .map(str::to_string);
        let tokens_used = value.get("eval_count").and_then(|n| n.as_i64());
        let elapsed_ms = value
            .get("total_duration")
            .and_then(|n| n.as_i64())
            .map(|nanos| nanos / 1_000_000);

        Ok(Generation {
            text,
            model_version,
            tokens_used,
            elapsed_ms,
        })
    }

    fn generate_simple(&self, model: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_ctx": 2048, "num_predict": 16, "temperature": 0 },
        });
        let value = self.post("/api/generate", &body)?;
        Ok(value
            .get("response")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "model": model, "input": inputs });
        let value = self.post("/api/embed", &body)?;

        let embeddings = value
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| ParanoidError::ModelError {
                message: "embed response missing 'embeddings' array".to_string(),
            })?;

        let mut result = Vec::with_capacity(embeddings.len());
        for embedding in embeddings {
            let vector: Vec<f32> = embedding
                .as_array()
                .ok_or_else(|| ParanoidError::ModelError {
                    message: "embedding is not an array".to_string(),
                })?
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect();
            result.push(vector);
        }

        if result.len() != inputs.len() {
            return Err(ParanoidError::ModelError {
                message: format!(
                    "embed returned {} vectors for {} inputs",
                    result.len(),
                    inputs.len()
                ),
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_trailing_slash_is_trimmed() {
        let host = OllamaHost::new("http://localhost:11434/", 5).unwrap();
        assert_eq!(host.host, "http://localhost:11434");
    }

    #[test]
    fn test_unreachable_host_maps_to_model_host_unreachable() {
        // Reserved TEST-NET address: connection refused or timeout
        let host = OllamaHost::new("http://127.0.0.1:1", 1).unwrap();
        let err = host.generate_simple("some-model", "hi").unwrap_err();
        assert!(matches!(err, ParanoidError::ModelHostUnreachable { .. }));
    }

    #[test]
    fn test_empty_embed_batch_short_circuits() {
        let host = OllamaHost::new("http://127.0.0.1:1", 1).unwrap();
        assert!(host.embed("m", &[]).unwrap().is_empty());
    }
}
