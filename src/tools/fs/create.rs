use crate::tools::{
    get_bool_param, get_string_param, validate_required, ParameterSchema, ParameterType, Tool,
    ToolError, ToolHandler, ToolResult,
};
use serde_json::Value;
use std::path::Path;

pub struct CreateTool;

impl CreateTool {
    pub fn new() -> Self {
        Self
    }
}

impl ToolHandler for CreateTool {
    fn definition(&self) -> Tool {
        Tool {
            id: "create".to_string(),
            description: "Create or overwrite a file with the given content. Parent directories are created as needed.".to_string(),
            parameters: vec![
                ParameterSchema {
                    name: "file_path".to_string(),
                    description: "Path of the file to write".to_string(),
                    required: true,
                    param_type: ParameterType::String,
                },
                ParameterSchema {
                    name: "content".to_string(),
                    description: "File content".to_string(),
                    required: true,
                    param_type: ParameterType::String,
                },
                ParameterSchema {
                    name: "overwrite".to_string(),
                    description: "Allow replacing an existing file (default: true)".to_string(),
                    required: false,
                    param_type: ParameterType::Boolean,
                },
            ],
        }
    }

    fn validate(&self, params: &Value) -> Result<(), ToolError> {
        validate_required(params, &["file_path", "content"])
    }

    fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let file_path = get_string_param(&params, "file_path")
            .ok_or_else(|| ToolError::Validation("file_path is required".to_string()))?;
        let content = get_string_param(&params, "content")
            .ok_or_else(|| ToolError::Validation("content is required".to_string()))?;
        let overwrite = get_bool_param(&params, "overwrite", true);

        let path = Path::new(&file_path);

        if path.exists() && !overwrite {
            return Err(ToolError::Validation(format!(
                "File already exists: {}",
                file_path
            )));
        }
        if path.exists() && !path.is_file() {
            return Err(ToolError::Validation(format!(
                "Path exists and is not a file: {}",
                file_path
            )));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::Execution(format!("Failed to create parent: {}", e)))?;
        }

        std::fs::write(path, &content)
            .map_err(|e| ToolError::Execution(format!("Failed to write file: {}", e)))?;

        Ok(ToolResult::new(
            format!("Create: {}", file_path),
            format!("Wrote {} bytes to {}", content.len(), file_path),
        )
        .with_metadata("bytes", serde_json::json!(content.len())))
    }
}
