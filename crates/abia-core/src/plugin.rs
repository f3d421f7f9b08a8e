//! Plugin contract and registry.
//!
//! A plugin registers named functions into a [`PluginContext`] during
//! `init`. The registry keeps plugins keyed by id and dispatches
//! `invoke(function, input)` calls to whichever plugin registered the name.

use crate::error::{AbiaError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A function exposed by a plugin.
pub type PluginFunction = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Extension loaded at bootstrap.
pub trait Plugin: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn description(&self) -> &str {
        ""
    }
    /// Registers the plugin's functions.
    fn init(&self, ctx: &mut PluginContext) -> Result<()>;
}

/// Registration surface handed to [`Plugin::init`].
#[derive(Default)]
pub struct PluginContext {
    functions: BTreeMap<String, PluginFunction>,
}

impl PluginContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callable function under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AbiaError::Plugin`] if the name is already taken in this context.
    pub fn register_function<F>(&mut self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(AbiaError::plugin(format!(
                "Function '{}' is already registered",
                name
            )));
        }
        self.functions.insert(name, Arc::new(f));
        Ok(())
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }
}

/// Listing entry for `list-plugins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub functions: Vec<String>,
}

struct LoadedPlugin {
    plugin: Arc<dyn Plugin>,
    functions: Vec<String>,
}

#[derive(Default)]
struct RegistryInner {
    plugins: BTreeMap<String, LoadedPlugin>,
    functions: BTreeMap<String, (String, PluginFunction)>,
}

/// Plugins keyed by id.
#[derive(Default)]
pub struct PluginRegistry {
    inner: RwLock<RegistryInner>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes and registers a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`AbiaError::Plugin`] when the id is already registered, when
    /// `init` fails, or when one of its function names clashes with another
    /// plugin's. Nothing is registered in those cases.
    pub async fn register(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let id = plugin.id().to_string();
        let mut inner = self.inner.write().await;

        if inner.plugins.contains_key(&id) {
            return Err(AbiaError::plugin(format!(
                "Plugin '{}' is already registered",
                id
            )));
        }

        let mut ctx = PluginContext::new();
        plugin.init(&mut ctx)?;

        if let Some(clash) = ctx
            .functions
            .keys()
            .find(|name| inner.functions.contains_key(*name))
        {
            return Err(AbiaError::plugin(format!(
                "Plugin '{}' registers '{}', which another plugin already provides",
                id, clash
            )));
        }

        let names = ctx.function_names();
        for (name, f) in ctx.functions {
            inner.functions.insert(name, (id.clone(), f));
        }
        tracing::info!(
            "[Plugins] Loaded {} ({}) v{}",
            plugin.name(),
            id,
            plugin.version()
        );
        inner.plugins.insert(
            id,
            LoadedPlugin {
                plugin,
                functions: names,
            },
        );
        Ok(())
    }

    /// Drops every registered plugin and loads `plugins` again.
    ///
    /// A plugin that fails to load is logged and skipped; the others still
    /// load. Returns the number of plugins loaded.
    pub async fn reload(&self, plugins: Vec<Arc<dyn Plugin>>) -> usize {
        {
            let mut inner = self.inner.write().await;
            *inner = RegistryInner::default();
        }

        let mut loaded = 0;
        for plugin in plugins {
            let id = plugin.id().to_string();
            match self.register(plugin).await {
                Ok(()) => loaded += 1,
                Err(e) => tracing::error!("[Plugins] Failed to load {}: {}", id, e),
            }
        }
        loaded
    }

    /// Calls a function registered by any plugin.
    pub async fn invoke(&self, function: &str, input: Value) -> Result<Value> {
        let f = {
            let inner = self.inner.read().await;
            inner
                .functions
                .get(function)
                .map(|(_, f)| f.clone())
                .ok_or_else(|| {
                    AbiaError::plugin(format!("Unknown plugin function '{}'", function))
                })?
        };
        f(input)
    }

    pub async fn list(&self) -> Vec<PluginInfo> {
        let inner = self.inner.read().await;
        inner
            .plugins
            .values()
            .map(|loaded| PluginInfo {
                id: loaded.plugin.id().to_string(),
                name: loaded.plugin.name().to_string(),
                version: loaded.plugin.version().to_string(),
                description: loaded.plugin.description().to_string(),
                functions: loaded.functions.clone(),
            })
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        let inner = self.inner.read().await;
        inner.plugins.get(id).map(|loaded| loaded.plugin.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoPlugin {
        id: &'static str,
        function: &'static str,
    }

    impl Plugin for EchoPlugin {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            "Echo"
        }
        fn version(&self) -> &str {
            "0.1.0"
        }
        fn init(&self, ctx: &mut PluginContext) -> Result<()> {
            ctx.register_function(self.function, |input| Ok(json!({ "echo": input })))
        }
    }

    fn echo(id: &'static str, function: &'static str) -> Arc<dyn Plugin> {
        Arc::new(EchoPlugin { id, function })
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let registry = PluginRegistry::new();
        registry.register(echo("echo", "echo-fn")).await.unwrap();

        let out = registry.invoke("echo-fn", json!("bonjour")).await.unwrap();
        assert_eq!(out, json!({ "echo": "bonjour" }));

        let listed = registry.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].functions, vec!["echo-fn".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let registry = PluginRegistry::new();
        registry.register(echo("echo", "a")).await.unwrap();
        let err = registry.register(echo("echo", "b")).await.unwrap_err();
        assert_eq!(err.code(), "plugin");
        assert!(registry.invoke("b", json!(null)).await.is_err());
    }

    #[tokio::test]
    async fn test_function_clash_is_rejected() {
        let registry = PluginRegistry::new();
        registry.register(echo("one", "shared")).await.unwrap();
        assert!(registry.register(echo("two", "shared")).await.is_err());
        assert!(registry.get("two").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let registry = PluginRegistry::new();
        let err = registry.invoke("nope", json!(1)).await.unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_reload_skips_failures_and_is_restartable() {
        let registry = PluginRegistry::new();
        let loaded = registry
            .reload(vec![echo("a", "fa"), echo("a", "fb"), echo("c", "fc")])
            .await;
        assert_eq!(loaded, 2);

        let loaded = registry.reload(vec![echo("a", "fa")]).await;
        assert_eq!(loaded, 1);
        assert!(registry.invoke("fc", json!(null)).await.is_err());
    }
}
