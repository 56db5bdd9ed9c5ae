use crate::tools::{
    get_integer_param, get_string_param, validate_required, ParameterSchema, ParameterType, Tool,
    ToolError, ToolHandler, ToolResult,
};
use serde_json::Value;
use std::path::Path;

const DEFAULT_LINE_LIMIT: usize = 2000;

pub struct ReadTool;

impl ReadTool {
    pub fn new() -> Self {
        Self
    }
}

impl ToolHandler for ReadTool {
    fn definition(&self) -> Tool {
        Tool {
            id: "read".to_string(),
            description: "Read a text file, optionally from an offset with a line limit."
                .to_string(),
            parameters: vec![
                ParameterSchema {
                    name: "file_path".to_string(),
                    description: "Path to the file to read".to_string(),
                    required: true,
                    param_type: ParameterType::String,
                },
                ParameterSchema {
                    name: "offset".to_string(),
                    description: "1-based line to start reading from".to_string(),
                    required: false,
                    param_type: ParameterType::Integer,
                },
                ParameterSchema {
                    name: "limit".to_string(),
                    description: "Maximum number of lines to return (default: 2000)".to_string(),
                    required: false,
                    param_type: ParameterType::Integer,
                },
            ],
        }
    }

    fn validate(&self, params: &Value) -> Result<(), ToolError> {
        validate_required(params, &["file_path"])
    }

    fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let file_path = get_string_param(&params, "file_path")
            .ok_or_else(|| ToolError::Validation("file_path is required".to_string()))?;

        let offset = get_integer_param(&params, "offset")
            .map(|v| v.max(1) as usize)
            .unwrap_or(1);
        let limit = get_integer_param(&params, "limit")
            .map(|v| if v <= 0 { DEFAULT_LINE_LIMIT } else { v as usize })
            .unwrap_or(DEFAULT_LINE_LIMIT);

        let path = Path::new(&file_path);

        if !path.exists() {
            return Err(ToolError::NotFound(format!("File not found: {}", file_path)));
        }
        if !path.is_file() {
            return Err(ToolError::Validation(format!(
                "Path is not a file: {}",
                file_path
            )));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ToolError::Execution(format!("Failed to read file: {}", e)))?;

        let total_lines = content.lines().count();
        let selected: Vec<&str> = content.lines().skip(offset - 1).take(limit).collect();
        let truncated = offset - 1 + selected.len() < total_lines;

        let mut output = selected.join("\n");
        if truncated {
            output.push_str(&format!(
                "\n\n[Truncated: showing lines {}-{} of {}]",
                offset,
                offset - 1 + selected.len(),
                total_lines
            ));
        }

        Ok(ToolResult::new(format!("Read: {}", file_path), output)
            .with_metadata("total_lines", serde_json::json!(total_lines)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_whole_file() {
        let path = std::env::temp_dir().join("taskforge_read_test.txt");
        std::fs::write(&path, "one\ntwo\nthree\n").unwrap();

        let tool = ReadTool::new();
        let result = tool
            .execute(serde_json::json!({"file_path": path.to_string_lossy()}))
            .unwrap();
        assert_eq!(result.output, "one\ntwo\nthree");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_read_with_offset_and_limit() {
        let path = std::env::temp_dir().join("taskforge_read_offset_test.txt");
        std::fs::write(&path, "a\nb\nc\nd\n").unwrap();

        let tool = ReadTool::new();
        let result = tool
            .execute(serde_json::json!({
                "file_path": path.to_string_lossy(),
                "offset": 2,
                "limit": 2
            }))
            .unwrap();
        assert!(result.output.starts_with("b\nc"));
        assert!(result.output.contains("[Truncated"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_read_missing_file() {
        let tool = ReadTool::new();
        let err = tool
            .execute(serde_json::json!({"file_path": "/nonexistent/taskforge.txt"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
