//! Spreadsheet analysis.
//!
//! The workbook is read by `excel_processor.py`, which returns the first
//! sheet as JSON. When a model is configured it answers the user's question
//! over that data; otherwise the reply is a plain overview of the sheet.

use super::chat::{ChatAgent, system_prompt};
use super::{ensure_exists, truncate_chars};
use crate::error::AgentError;
use crate::llm_client::ChatMessage;
use crate::python_runner::{EXCEL_SCRIPT, PythonRunner};
use abia_core::integration::{AgentContext, AgentReply, ReplyAction, ReplyKind};
use abia_core::session::{AgentKind, FileRef};
use serde_json::{Value, json};
use std::path::Path;

pub const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];
pub const DEFAULT_EXCEL_QUERY: &str = "Analyser ce fichier Excel";

const OUTPUT_FORMAT: &str = "json";
const MAX_ROWS: u32 = 100;
const MAX_COLS: u32 = 20;
const FIRST_SHEET: u32 = 0;
const MAX_PROMPT_CHARS: usize = 12_000;

pub fn is_excel_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| EXCEL_EXTENSIONS.contains(&ext.as_str()))
}

/// Markdown overview of the script output.
pub fn describe_sheet(data: &Value) -> String {
    let text = |key: &str| data.get(key).and_then(Value::as_str).unwrap_or("?");
    let count = |key: &str| data.get(key).and_then(Value::as_u64).unwrap_or(0);

    let mut summary = format!("# Analyse du fichier {}\n\n", text("fileName"));
    summary.push_str(&format!("- Feuille: {}\n", text("sheetName")));
    summary.push_str(&format!("- Nombre de lignes: {}\n", count("rowCount")));
    summary.push_str(&format!("- Nombre de colonnes: {}\n", count("columnCount")));

    if let Some(names) = data.get("sheet_names").and_then(Value::as_array)
        && names.len() > 1
    {
        let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
        summary.push_str(&format!("- Feuilles disponibles: {}\n", names.join(", ")));
    }
    summary
}

#[derive(Clone)]
pub struct ExcelAgent {
    runner: PythonRunner,
    chat: ChatAgent,
}

impl ExcelAgent {
    pub fn new(runner: PythonRunner, chat: ChatAgent) -> Self {
        Self { runner, chat }
    }

    pub async fn analyze(
        &self,
        path: &str,
        query: &str,
        ctx: &AgentContext,
    ) -> Result<AgentReply, AgentError> {
        ensure_exists(path).await?;
        if !is_excel_file(path) {
            return Err(AgentError::ExecutionFailed(format!(
                "Le fichier {} n'est pas un fichier Excel valide.",
                path
            )));
        }
        let query = if query.trim().is_empty() {
            DEFAULT_EXCEL_QUERY
        } else {
            query
        };

        let data = self
            .runner
            .run_json(
                EXCEL_SCRIPT,
                [
                    path.to_string(),
                    OUTPUT_FORMAT.to_string(),
                    MAX_ROWS.to_string(),
                    MAX_COLS.to_string(),
                    FIRST_SHEET.to_string(),
                ],
            )
            .await?;
        let row_count = data.get("rowCount").and_then(Value::as_u64).unwrap_or(0);
        tracing::info!(
            "[ExcelAgent] Read {} ({} rows) for session {}",
            path,
            row_count,
            ctx.session_id
        );

        let overview = describe_sheet(&data);
        let (message, usage) = if self.chat.llm().is_some() {
            let file = FileRef::new(path);
            let serialized = serde_json::to_string(&data).unwrap_or_default();
            let messages = [
                ChatMessage::system(system_prompt(Some(&file))),
                ChatMessage::user(format!(
                    "{}\n\n{}\nDonnées extraites (JSON):\n{}",
                    query,
                    overview,
                    truncate_chars(&serialized, MAX_PROMPT_CHARS)
                )),
            ];
            let completion = self.chat.complete(&messages).await?;
            (completion.text, Some(completion.usage))
        } else {
            (overview, None)
        };

        let show_data = ReplyAction {
            payload: Some(json!({ "filePath": path })),
            ..ReplyAction::new("Afficher les données", "show-excel-data")
        };
        Ok(AgentReply::new(ReplyKind::Excel, AgentKind::Excel, message)
            .with_actions(vec![show_data])
            .with_usage(usage)
            .with_data(data))
    }
}
