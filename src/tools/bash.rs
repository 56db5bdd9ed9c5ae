use crate::tools::{
    get_integer_param, get_string_param, validate_required, ParameterSchema, ParameterType, Tool,
    ToolError, ToolHandler, ToolResult,
};
use serde_json::Value;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
const MAX_OUTPUT_BYTES: usize = 51200; // 50KB
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct BashTool;

impl BashTool {
    pub fn new() -> Self {
        Self
    }

    fn is_dangerous(command: &str) -> Option<String> {
        let dangerous_patterns = [
            "rm -rf /",
            "rm -rf /*",
            ":(){ :|: & };:",
            "> /dev/sda",
            "mkfs",
            "dd if=/dev/zero",
            "chmod -R 777 /",
        ];

        for pattern in &dangerous_patterns {
            if command.contains(pattern) {
                return Some(format!("Command contains dangerous pattern: {}", pattern));
            }
        }

        None
    }

    /// Polls the child until exit or deadline. Output pipes are drained on
    /// reader threads so a chatty process cannot fill the pipe and stall.
    fn wait_with_deadline(
        mut child: Child,
        timeout: Duration,
    ) -> Result<(std::process::ExitStatus, String, String), ToolError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::Execution("stdout not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ToolError::Execution("stderr not piped".to_string()))?;

        let stdout_reader = std::thread::spawn(move || read_capped(stdout));
        let stderr_reader = std::thread::spawn(move || read_capped(stderr));

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ToolError::Execution(format!(
                            "Command timed out after {} seconds",
                            timeout.as_secs()
                        )));
                    }
                    std::thread::sleep(WAIT_POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(ToolError::Execution(format!("Process error: {}", e)));
                }
            }
        };

        let stdout_text = stdout_reader
            .join()
            .unwrap_or_else(|_| String::from("(stdout reader panicked)"));
        let stderr_text = stderr_reader
            .join()
            .unwrap_or_else(|_| String::from("(stderr reader panicked)"));

        Ok((status, stdout_text, stderr_text))
    }
}

fn read_capped(mut source: impl Read) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() < MAX_OUTPUT_BYTES {
                    let take = n.min(MAX_OUTPUT_BYTES - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                }
                // Keep draining even when capped so the child never blocks.
            }
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

impl ToolHandler for BashTool {
    fn definition(&self) -> Tool {
        Tool {
            id: "bash".to_string(),
            description: "Execute shell commands with a timeout and captured output.".to_string(),
            parameters: vec![
                ParameterSchema {
                    name: "command".to_string(),
                    description: "Command to execute".to_string(),
                    required: true,
                    param_type: ParameterType::String,
                },
                ParameterSchema {
                    name: "timeout".to_string(),
                    description: "Timeout in seconds (default: 120)".to_string(),
                    required: false,
                    param_type: ParameterType::Integer,
                },
                ParameterSchema {
                    name: "workdir".to_string(),
                    description: "Working directory for the command".to_string(),
                    required: false,
                    param_type: ParameterType::String,
                },
            ],
        }
    }

    fn validate(&self, params: &Value) -> Result<(), ToolError> {
        validate_required(params, &["command"])
    }

    fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let command_str = get_string_param(&params, "command")
            .ok_or_else(|| ToolError::Validation("command is required".to_string()))?;

        let timeout_seconds = get_integer_param(&params, "timeout")
            .map(|v| if v <= 0 { DEFAULT_TIMEOUT_SECONDS } else { v as u64 })
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        let workdir = get_string_param(&params, "workdir");

        if let Some(reason) = Self::is_dangerous(&command_str) {
            return Err(ToolError::Permission(reason));
        }

        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(&command_str);

        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| ToolError::Execution(format!("Failed to spawn process: {}", e)))?;

        let (status, stdout_text, stderr_text) =
            Self::wait_with_deadline(child, Duration::from_secs(timeout_seconds))?;

        let mut output_parts = Vec::new();
        if !stdout_text.is_empty() {
            output_parts.push(stdout_text.trim_end().to_string());
        }
        if !stderr_text.is_empty() {
            if !output_parts.is_empty() {
                output_parts.push("\n--- stderr ---".to_string());
            }
            output_parts.push(stderr_text.trim_end().to_string());
        }

        let output = if output_parts.is_empty() {
            "(no output)".to_string()
        } else {
            output_parts.join("\n")
        };

        let exit_code = status.code().unwrap_or(-1);

        Ok(ToolResult::new(format!("Bash: {}", command_str), output)
            .with_metadata("exit_code", serde_json::json!(exit_code))
            .with_metadata("command", serde_json::json!(command_str)))
    }
}
