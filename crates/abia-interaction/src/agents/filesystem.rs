//! Local file and folder answers. No model is involved.

use crate::error::AgentError;
use abia_core::integration::{AgentContext, AgentReply, ReplyKind};
use abia_core::session::AgentKind;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_FOLDER_NAME: &str = "Nouveau Dossier";

const HELP_MESSAGE: &str = "Je peux vous aider à gérer vos fichiers et dossiers. Que souhaitez-vous faire ? Créer un dossier ou lister le contenu d'un répertoire ?";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntryInfo {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub size: u64,
}

/// What a filesystem query asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Intent {
    CreateFolder(String),
    List,
    Describe,
    Help,
}

fn parse_intent(query: &str) -> Intent {
    let lower = query.to_lowercase();
    if lower.contains("créer") && lower.contains("dossier") {
        return Intent::CreateFolder(
            extract_folder_name(query).unwrap_or_else(|| DEFAULT_FOLDER_NAME.to_string()),
        );
    }
    if ["liste", "afficher", "voir", "contenu"]
        .iter()
        .any(|k| lower.contains(k))
    {
        return Intent::List;
    }
    if ["info", "taille", "propriétés", "détails"]
        .iter()
        .any(|k| lower.contains(k))
    {
        return Intent::Describe;
    }
    Intent::Help
}

/// Takes a quoted name, else the words following "dossier".
fn extract_folder_name(query: &str) -> Option<String> {
    for quote in ['"', '\'', '«'] {
        let close = if quote == '«' { '»' } else { quote };
        if let Some(start) = query.find(quote) {
            let rest = &query[start + quote.len_utf8()..];
            if let Some(end) = rest.find(close) {
                let name = sanitize_file_name(&rest[..end]);
                if !name.is_empty() {
                    return Some(name);
                }
            }
        }
    }

    let lower = query.to_lowercase();
    let idx = lower.find("dossier")?;
    let after = query.get(idx + "dossier".len()..)?;
    let after = after.trim_start();
    let after = after
        .strip_prefix("nommé ")
        .or_else(|| after.strip_prefix("appelé "))
        .unwrap_or(after);
    let name = sanitize_file_name(after);
    (!name.is_empty()).then_some(name)
}

/// Removes characters that are invalid in file names on common platforms.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["octets", "Ko", "Mo", "Go"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[derive(Debug, Clone)]
pub struct FilesystemAgent {
    base_dir: PathBuf,
}

impl FilesystemAgent {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `~/Documents/ABIA`, or `ABIA` under the home directory.
    pub fn default_base_dir() -> Option<PathBuf> {
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .map(|dir| dir.join("ABIA"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory a query refers to: the active file (or its folder), else the base dir.
    async fn target_dir(&self, ctx: &AgentContext) -> PathBuf {
        if let Some(file) = ctx.active_file() {
            let path = PathBuf::from(&file.path);
            if tokio::fs::metadata(&path)
                .await
                .is_ok_and(|m| m.is_dir())
            {
                return path;
            }
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                return parent.to_path_buf();
            }
        }
        self.base_dir.clone()
    }

    pub async fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntryInfo>, AgentError> {
        if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
            return Err(AgentError::ExecutionFailed(format!(
                "Le répertoire {} n'existe pas",
                dir.display()
            )));
        }

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let meta = entry.metadata().await?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path().to_string_lossy().into_owned(),
                is_directory: meta.is_dir(),
                size: meta.len(),
            });
        }
        // Folders first, then files, each alphabetically.
        entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(entries)
    }

    pub async fn create_folder(&self, parent: &Path, name: &str) -> Result<PathBuf, AgentError> {
        let name = sanitize_file_name(name);
        if name.is_empty() {
            return Err(AgentError::ExecutionFailed(
                "Le nom du dossier est invalide".to_string(),
            ));
        }
        let path = parent.join(&name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AgentError::ExecutionFailed(format!(
                "Le dossier {} existe déjà",
                path.display()
            )));
        }
        tokio::fs::create_dir_all(&path).await?;
        tracing::info!("[FilesystemAgent] Created {}", path.display());
        Ok(path)
    }

    pub async fn answer(&self, query: &str, ctx: &AgentContext) -> Result<AgentReply, AgentError> {
        let reply = |message: String| AgentReply::new(ReplyKind::Filesystem, AgentKind::Filesystem, message);

        match parse_intent(query) {
            Intent::CreateFolder(name) => {
                let parent = self.target_dir(ctx).await;
                let path = self.create_folder(&parent, &name).await?;
                Ok(reply(format!("Dossier créé: {}", path.display()))
                    .with_data(serde_json::json!({ "path": path })))
            }
            Intent::List => {
                let dir = self.target_dir(ctx).await;
                let entries = self.list_dir(&dir).await?;
                let mut message = format!("Contenu du répertoire {}\n", dir.display());
                if entries.is_empty() {
                    message.push_str("\n(vide)");
                }
                for entry in &entries {
                    if entry.is_directory {
                        message.push_str(&format!("\n📁 {}", entry.name));
                    } else {
                        message.push_str(&format!("\n📄 {} ({})", entry.name, human_size(entry.size)));
                    }
                }
                let data = serde_json::to_value(&entries)
                    .map_err(|e| AgentError::Other(e.to_string()))?;
                Ok(reply(message).with_data(data))
            }
            Intent::Describe => {
                let Some(file) = ctx.active_file() else {
                    return Ok(reply(
                        "Aucun fichier n'est sélectionné. Ajoutez un fichier pour voir ses propriétés."
                            .to_string(),
                    ));
                };
                let meta = tokio::fs::metadata(&file.path).await.map_err(|_| {
                    AgentError::ExecutionFailed(format!("Le fichier {} n'existe pas.", file.path))
                })?;
                let mut message = format!(
                    "{}\n- Chemin: {}\n- Type: {}\n- Taille: {}",
                    file.name,
                    file.path,
                    file.file_type,
                    human_size(meta.len())
                );
                if let Ok(modified) = meta.modified() {
                    let modified: DateTime<Local> = modified.into();
                    message.push_str(&format!(
                        "\n- Modifié le: {}",
                        modified.format("%d/%m/%Y %H:%M")
                    ));
                }
                Ok(reply(message))
            }
            Intent::Help => Ok(reply(HELP_MESSAGE.to_string())),
        }
    }
}
