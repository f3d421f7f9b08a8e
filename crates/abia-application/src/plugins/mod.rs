//! Built-in plugins.
//!
//! The desktop host loads these at bootstrap through
//! [`PluginRegistry::reload`](abia_core::plugin::PluginRegistry::reload).

mod sample;

pub use sample::{SAMPLE_FUNCTION, SAMPLE_PLUGIN_ID, SamplePlugin};

use abia_core::plugin::Plugin;
use std::sync::Arc;

/// Plugins compiled into the application.
pub fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![Arc::new(SamplePlugin)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use abia_core::plugin::PluginRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn test_builtins_load_and_invoke() {
        let registry = PluginRegistry::new();
        let loaded = registry.reload(builtin_plugins()).await;
        assert_eq!(loaded, 1);

        let out = registry.invoke(SAMPLE_FUNCTION, json!("x")).await.unwrap();
        assert_eq!(out["result"], "Le plugin a traité: x");

        let listed = registry.list().await;
        assert_eq!(listed[0].id, SAMPLE_PLUGIN_ID);
        assert_eq!(listed[0].version, "1.0.0");
    }
}
