use crate::persistence::{ensure_cache_dir, get_cache_dir};
use crate::tools::{
    get_string_param, validate_required, ParameterSchema, ParameterType, Tool, ToolError,
    ToolHandler, ToolResult,
};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

const MAX_BODY_BYTES: usize = 102400; // 100KB
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct FetchTool;

impl FetchTool {
    pub fn new() -> Self {
        Self
    }
}

/// Cache location for a fetched URL. The driver uses the same mapping when
/// it records temporary artifacts.
pub fn cache_path(url: &str) -> PathBuf {
    let sanitized: String = url
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let name: String = sanitized.chars().take(120).collect();
    get_cache_dir().join(format!("{}.fetch", name))
}

impl ToolHandler for FetchTool {
    fn definition(&self) -> Tool {
        Tool {
            id: "fetch".to_string(),
            description: "Fetch a URL over HTTP GET and cache the body locally. Returns the response text, truncated to 100KB.".to_string(),
            parameters: vec![ParameterSchema {
                name: "url".to_string(),
                description: "URL to fetch".to_string(),
                required: true,
                param_type: ParameterType::String,
            }],
        }
    }

    fn validate(&self, params: &Value) -> Result<(), ToolError> {
        validate_required(params, &["url"])?;
        let url = get_string_param(params, "url").unwrap_or_default();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::Validation(format!(
                "URL must be http(s): {}",
                url
            )));
        }
        Ok(())
    }

    fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let url = get_string_param(&params, "url")
            .ok_or_else(|| ToolError::Validation("url is required".to_string()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ToolError::Execution(format!("Failed to build client: {}", e)))?;

        let response = client
            .get(&url)
            .send()
            .map_err(|e| ToolError::Execution(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ToolError::Execution(format!(
                "Request failed with status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .map_err(|e| ToolError::Execution(format!("Failed to read body: {}", e)))?;

        let truncated = body.len() > MAX_BODY_BYTES;
        let text = if truncated {
            let mut end = MAX_BODY_BYTES;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            &body[..end]
        } else {
            body.as_str()
        };

        let cache_file = cache_path(&url);
        ensure_cache_dir()
            .map_err(|e| ToolError::Execution(format!("Failed to create cache dir: {}", e)))?;
        std::fs::write(&cache_file, &body)
            .map_err(|e| ToolError::Execution(format!("Failed to cache body: {}", e)))?;

        let mut output = text.to_string();
        if truncated {
            output.push_str(&format!(
                "\n\n[Truncated to {} bytes; full body cached at {}]",
                MAX_BODY_BYTES,
                cache_file.display()
            ));
        }

        Ok(ToolResult::new(format!("Fetch: {}", url), output)
            .with_metadata("cache_path", serde_json::json!(cache_file.to_string_lossy()))
            .with_metadata("bytes", serde_json::json!(body.len())))
    }
}
