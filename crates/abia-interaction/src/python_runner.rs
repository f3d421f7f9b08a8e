//! Runs the bundled Python extraction scripts.
//!
//! Each script prints one JSON document on stdout. A top-level `error`
//! string means the script ran but refused the input.

use crate::error::AgentError;
use abia_core::config::PythonConfig;
use serde_json::Value;
use std::ffi::OsStr;
use std::path::PathBuf;
use tokio::process::Command;

pub const EXCEL_SCRIPT: &str = "excel_processor.py";
pub const DOCUMENT_SCRIPT: &str = "document_extractor.py";

#[derive(Debug, Clone)]
pub struct PythonRunner {
    interpreter: String,
    scripts_dir: PathBuf,
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<String>, scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            scripts_dir: scripts_dir.into(),
        }
    }

    pub fn from_config(config: &PythonConfig) -> Self {
        Self::new(config.interpreter.clone(), config.scripts_dir.clone())
    }

    pub fn script_path(&self, script: &str) -> PathBuf {
        self.scripts_dir.join(script)
    }

    /// Runs `script` with `args` and parses its JSON output.
    ///
    /// # Errors
    ///
    /// - the interpreter cannot be spawned
    /// - the process exits unsuccessfully
    /// - stdout holds no JSON document
    /// - the document carries an `error` field
    pub async fn run_json<I, S>(&self, script: &str, args: I) -> Result<Value, AgentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let script_path = self.script_path(script);
        tracing::debug!(
            "[Python] {} {}",
            self.interpreter,
            script_path.display()
        );

        let output = Command::new(&self.interpreter)
            .arg(&script_path)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                AgentError::NotConfigured(format!(
                    "Impossible de lancer l'interpréteur Python '{}': {}",
                    self.interpreter, e
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("[Python] {} exited with {}: {}", script, output.status, stderr.trim());
            // Scripts report handled failures as JSON even on a non-zero exit.
            if let Some(message) = parse_output(&stdout).as_ref().and_then(error_field) {
                return Err(AgentError::ExecutionFailed(message));
            }
            return Err(AgentError::ExecutionFailed(format!(
                "Le script {} a échoué ({}): {}",
                script,
                output.status,
                stderr.trim()
            )));
        }

        let value = parse_output(&stdout).ok_or_else(|| {
            AgentError::ExecutionFailed(format!("Sortie invalide du script {}", script))
        })?;
        if let Some(message) = error_field(&value) {
            return Err(AgentError::ExecutionFailed(message));
        }
        Ok(value)
    }
}

/// Parses the whole output, or failing that its last non-empty line.
fn parse_output(stdout: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(stdout.trim()) {
        return Some(value);
    }
    stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| serde_json::from_str(line.trim()).ok())
}

fn error_field(value: &Value) -> Option<String> {
    value.get("error").and_then(Value::as_str).map(str::to_string)
}
