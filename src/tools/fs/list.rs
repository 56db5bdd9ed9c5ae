use crate::tools::{
    get_string_param, validate_required, ParameterSchema, ParameterType, Tool, ToolError,
    ToolHandler, ToolResult,
};
use serde_json::Value;
use std::path::Path;

const MAX_DEPTH: usize = 10;

pub struct ListTool;

impl ListTool {
    pub fn new() -> Self {
        Self
    }

    fn list_directory(
        path: &Path,
        ignore_patterns: &[String],
        prefix: &str,
        is_last: bool,
        output: &mut Vec<String>,
        depth: usize,
    ) -> Result<(), ToolError> {
        if depth > MAX_DEPTH {
            return Ok(());
        }

        let connector = if is_last { "└── " } else { "├── " };

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            output.push(format!("{}{}{}", prefix, connector, name));
        }

        if !path.is_dir() {
            return Ok(());
        }

        let new_prefix = if is_last {
            format!("{}    ", prefix)
        } else {
            format!("{}│   ", prefix)
        };

        let entries = Self::sorted_entries(path, ignore_patterns)?;
        let count = entries.len();
        for (i, entry) in entries.iter().enumerate() {
            Self::list_directory(
                &entry.path(),
                ignore_patterns,
                &new_prefix,
                i == count - 1,
                output,
                depth + 1,
            )?;
        }

        Ok(())
    }

    fn sorted_entries(
        path: &Path,
        ignore_patterns: &[String],
    ) -> Result<Vec<std::fs::DirEntry>, ToolError> {
        let entries: Vec<_> = std::fs::read_dir(path)
            .map_err(|e| ToolError::Execution(format!("Failed to read directory: {}", e)))?
            .filter_map(|e| e.ok())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                !name.starts_with('.') && !ignore_patterns.iter().any(|p| name.contains(p))
            })
            .collect();

        let mut filtered = entries;
        filtered.sort_by(|a, b| {
            let a_is_dir = a.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let b_is_dir = b.file_type().map(|t| t.is_dir()).unwrap_or(false);

            match (a_is_dir, b_is_dir) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => a.file_name().cmp(&b.file_name()),
            }
        });

        Ok(filtered)
    }
}

impl ToolHandler for ListTool {
    fn definition(&self) -> Tool {
        Tool {
            id: "list".to_string(),
            description: "List directory contents in a tree format. Shows files and subdirectories with visual tree connectors.".to_string(),
            parameters: vec![
                ParameterSchema {
                    name: "path".to_string(),
                    description: "Directory path to list".to_string(),
                    required: true,
                    param_type: ParameterType::String,
                },
                ParameterSchema {
                    name: "ignore".to_string(),
                    description: "Patterns to ignore (e.g., ['node_modules', 'target'])".to_string(),
                    required: false,
                    param_type: ParameterType::Array(Box::new(ParameterType::String)),
                },
            ],
        }
    }

    fn validate(&self, params: &Value) -> Result<(), ToolError> {
        validate_required(params, &["path"])
    }

    fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let path_str = get_string_param(&params, "path")
            .ok_or_else(|| ToolError::Validation("path is required".to_string()))?;

        let ignore_patterns: Vec<String> = params
            .get("ignore")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let path = Path::new(&path_str);

        if !path.exists() {
            return Err(ToolError::NotFound(format!(
                "Directory not found: {}",
                path_str
            )));
        }

        if !path.is_dir() {
            return Err(ToolError::Validation(format!(
                "Path is not a directory: {}",
                path_str
            )));
        }

        let mut output = Vec::new();

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            output.push(name.to_string());
        } else {
            output.push(path_str.clone());
        }

        let entries = Self::sorted_entries(path, &ignore_patterns)?;
        let count = entries.len();
        for (i, entry) in entries.iter().enumerate() {
            Self::list_directory(
                &entry.path(),
                &ignore_patterns,
                "",
                i == count - 1,
                &mut output,
                1,
            )?;
        }

        let result_text = if output.len() <= 1 {
            format!("{}\n(empty directory)", output.join("\n"))
        } else {
            output.join("\n")
        };

        Ok(ToolResult::new(format!("List: {}", path_str), result_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_missing_directory() {
        let tool = ListTool::new();
        let err = tool
            .execute(serde_json::json!({"path": "/nonexistent/taskforge-test"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn test_list_directory_contents() {
        let dir = std::env::temp_dir().join("taskforge_list_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("a.txt"), "x").unwrap();

        let tool = ListTool::new();
        let result = tool
            .execute(serde_json::json!({"path": dir.to_string_lossy()}))
            .unwrap();
        assert!(result.output.contains("a.txt"));
        assert!(result.output.contains("sub"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_validate_requires_path() {
        let tool = ListTool::new();
        assert!(tool.validate(&serde_json::json!({})).is_err());
        assert!(tool.validate(&serde_json::json!({"path": "/tmp"})).is_ok());
    }
}
