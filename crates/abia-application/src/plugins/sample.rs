//! Example plugin shipped with the application.

use abia_core::error::Result;
use abia_core::plugin::{Plugin, PluginContext};
use chrono::Utc;
use serde_json::{Value, json};

pub const SAMPLE_PLUGIN_ID: &str = "sample-plugin";
pub const SAMPLE_FUNCTION: &str = "sample-function";

/// Registers `sample-function`, which echoes its input with a timestamp.
#[derive(Debug, Default)]
pub struct SamplePlugin;

impl Plugin for SamplePlugin {
    fn id(&self) -> &str {
        SAMPLE_PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Plugin d'exemple"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Un plugin d'exemple pour montrer comment créer des extensions pour ABIA"
    }

    fn init(&self, ctx: &mut PluginContext) -> Result<()> {
        ctx.register_function(SAMPLE_FUNCTION, |input| Ok(sample_function(&input)))
    }
}

fn sample_function(input: &Value) -> Value {
    let shown = match input {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    json!({
        "result": format!("Le plugin a traité: {}", shown),
        "timestamp": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_function_echoes_input() {
        let out = sample_function(&json!("bonjour"));
        assert_eq!(out["result"], "Le plugin a traité: bonjour");
        assert!(out["timestamp"].as_str().is_some());

        let out = sample_function(&json!({"n": 1}));
        assert_eq!(out["result"], "Le plugin a traité: {\"n\":1}");
    }
}
