use abia_core::integration::{AgentReply, QueryOptions};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use super::{Args, CommandError, CommandResult};
use crate::app::AppState;

/// `{type: "error", <field>: message}`, the shape the chat view renders.
fn error_reply(field: &str, error: &CommandError) -> Value {
    let mut body = Map::new();
    body.insert("type".into(), json!("error"));
    body.insert(field.into(), json!(error.message));
    Value::Object(body)
}

fn reply_or_error(outcome: Result<AgentReply, CommandError>, field: &str) -> CommandResult {
    match outcome {
        Ok(reply) => Ok(serde_json::to_value(reply)?),
        Err(e) => {
            tracing::warn!("[Assistant] Request failed: {}", e.message);
            Ok(error_reply(field, &e))
        }
    }
}

pub async fn process_query(state: &AppState, args: &Args<'_>) -> CommandResult {
    let outcome = async {
        let services = state.services()?;
        let query = args.required::<String>(0, "query")?;
        let options = args
            .optional::<QueryOptions>(1, "options")?
            .unwrap_or_default();
        Ok::<_, CommandError>(services.assistant.process_query(&query, &options).await?)
    }
    .await;
    reply_or_error(outcome, "message")
}

pub async fn process_excel_file(state: &AppState, args: &Args<'_>) -> CommandResult {
    let outcome = async {
        let services = state.services()?;
        let path = args.required::<String>(0, "filePath")?;
        let query = args.optional::<String>(1, "query")?.unwrap_or_default();
        tracing::info!("[Assistant] Excel file: {}", path);
        Ok::<_, CommandError>(services.assistant.process_excel_file(&path, &query).await?)
    }
    .await;
    reply_or_error(outcome, "content")
}

pub async fn process_document(state: &AppState, args: &Args<'_>) -> CommandResult {
    let outcome = async {
        let services = state.services()?;
        let path = args.required::<String>(0, "filePath")?;
        let query = args.optional::<String>(1, "query")?.unwrap_or_default();
        tracing::info!("[Assistant] Document: {}", path);
        Ok::<_, CommandError>(services.assistant.process_document(&path, &query).await?)
    }
    .await;
    reply_or_error(outcome, "content")
}

pub async fn generate_letter(state: &AppState, args: &Args<'_>) -> CommandResult {
    let outcome = async {
        let services = state.services()?;
        let template = args.required::<String>(0, "templateType")?;
        let data = args
            .optional::<BTreeMap<String, Value>>(1, "data")?
            .unwrap_or_default();
        Ok::<_, CommandError>(services.assistant.generate_letter(&template, &data).await?)
    }
    .await;

    Ok(match outcome {
        Ok(letter) => {
            let mut body = Map::new();
            body.insert("success".into(), json!(true));
            if let Value::Object(fields) = serde_json::to_value(letter)? {
                body.extend(fields);
            }
            Value::Object(body)
        }
        Err(e) => {
            tracing::warn!("[Assistant] Letter generation failed: {}", e.message);
            json!({ "success": false, "error": e.message })
        }
    })
}

pub async fn get_letter_templates(state: &AppState) -> CommandResult {
    let services = state.services()?;
    Ok(serde_json::to_value(services.integration.letter_templates())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reply_shape() {
        let err = CommandError::new("external_service", "Clé API manquante");
        assert_eq!(
            error_reply("content", &err),
            json!({"type": "error", "content": "Clé API manquante"})
        );
    }
}
