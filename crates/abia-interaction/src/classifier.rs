//! Keyword-based query classification.
//!
//! Used when a query asks to be auto-routed. Each agent has a keyword list;
//! a keyword "hits" when it occurs anywhere in the lowercased query. The
//! agent with strictly the most hits wins. Ties and queries without any
//! hit go to chat.

use abia_core::session::AgentKind;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

const EXCEL_KEYWORDS: &[&str] = &[
    "excel",
    "tableau",
    "feuille de calcul",
    "graphique",
    "cellule",
    "xls",
];
const MAIL_KEYWORDS: &[&str] = &[
    "email",
    "mail",
    "message",
    "envoyer",
    "boite de réception",
    "outlook",
];
const DOCUMENT_KEYWORDS: &[&str] = &[
    "document", "pdf", "texte", "doc", "fichier", "lire", "analyser",
];
const CHAT_KEYWORDS: &[&str] = &["discuter", "parler", "question", "répondre", "aide"];

const KEYWORDS: &[(AgentKind, &[&str])] = &[
    (AgentKind::Excel, EXCEL_KEYWORDS),
    (AgentKind::Mail, MAIL_KEYWORDS),
    (AgentKind::Document, DOCUMENT_KEYWORDS),
    (AgentKind::Chat, CHAT_KEYWORDS),
];

const BASE_CONFIDENCE: f32 = 0.5;
const CONFIDENCE_STEP: f32 = 0.1;
const MAX_CONFIDENCE: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub agent: AgentKind,
    pub confidence: f32,
    pub hits: usize,
}

fn confidence(hits: usize) -> f32 {
    (BASE_CONFIDENCE + CONFIDENCE_STEP * hits as f32).min(MAX_CONFIDENCE)
}

fn count_hits(query: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| query.contains(*k)).count()
}

pub fn classify(query: &str) -> Classification {
    let query = query.to_lowercase();

    let mut best: Option<(AgentKind, usize)> = None;
    let mut tied = false;
    for (agent, keywords) in KEYWORDS {
        let hits = count_hits(&query, keywords);
        if hits == 0 {
            continue;
        }
        match best {
            Some((_, best_hits)) if hits < best_hits => {}
            Some((_, best_hits)) if hits == best_hits => tied = true,
            _ => {
                best = Some((*agent, hits));
                tied = false;
            }
        }
    }

    match best {
        Some((agent, hits)) if !tied => Classification {
            agent,
            confidence: confidence(hits),
            hits,
        },
        _ => Classification {
            agent: AgentKind::Chat,
            confidence: BASE_CONFIDENCE,
            hits: 0,
        },
    }
}

pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Remembers recent classifications, evicting the oldest entry when full.
pub struct ClassificationCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Classification>,
    order: VecDeque<String>,
}

impl Default for ClassificationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ClassificationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Classifies `query`, reusing a cached result unless `skip_cache` is set.
    pub fn classify(&self, query: &str, skip_cache: bool) -> Classification {
        let key = query.trim().to_lowercase();
        let Ok(mut inner) = self.inner.lock() else {
            return classify(query);
        };

        if !skip_cache && let Some(hit) = inner.entries.get(&key) {
            return *hit;
        }

        let result = classify(query);
        if inner.entries.insert(key.clone(), result).is_none() {
            inner.order.push_back(key);
        }
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
