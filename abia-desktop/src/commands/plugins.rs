use super::{Args, CommandResult};
use crate::app::AppState;

pub async fn list_plugins(state: &AppState) -> CommandResult {
    let services = state.services()?;
    Ok(serde_json::to_value(services.plugins.list().await)?)
}

/// `invoke-plugin function, input`
pub async fn invoke_plugin(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let function = args.required::<String>(0, "function")?;
    let output = services.plugins.invoke(&function, args.raw(1)).await?;
    tracing::debug!("[Plugins] Invoked {}", function);
    Ok(output)
}
