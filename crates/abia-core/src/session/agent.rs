//! Agent enumeration.

use crate::error::{AbiaError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// The domain handler that subsequent queries are routed to.
///
/// Parsing is ASCII-case-insensitive. The French aliases `fichier` and
/// `dossier` resolve to [`AgentKind::Filesystem`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AgentKind {
    #[default]
    Chat,
    #[serde(alias = "fichier", alias = "dossier")]
    #[strum(to_string = "filesystem", serialize = "fichier", serialize = "dossier")]
    Filesystem,
    Excel,
    Document,
    Mail,
    Translation,
}

impl AgentKind {
    /// Parses an agent identifier coming from the UI.
    ///
    /// # Errors
    ///
    /// Returns [`AbiaError::InvalidAgent`] carrying the raw value when it is
    /// not a member of the enumeration.
    pub fn parse(value: &str) -> Result<Self> {
        AgentKind::from_str(value.trim()).map_err(|_| AbiaError::invalid_agent(value))
    }

    /// All agent identifiers in declaration order.
    pub fn all() -> Vec<AgentKind> {
        AgentKind::iter().collect()
    }
}
