//! Letter generation from French administrative templates.
//!
//! Every template extends a common layout: sender, date, recipient,
//! reference, subject, salutation, body, closing and signature. Missing
//! fields are skipped; a missing conclusion falls back to the standard
//! closing formula.

use crate::error::AgentError;
use abia_core::integration::{
    AgentContext, AgentReply, LetterOutput, LetterTemplateInfo, ReplyAction, ReplyKind,
};
use abia_core::session::AgentKind;
use chrono::{Datelike, Local, NaiveDate};
use minijinja::Environment;
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_CLOSING: &str =
    "Je vous prie d'agréer, Madame, Monsieur, l'expression de mes salutations distinguées.";

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

const LAYOUT: &str = r#"{% if expediteur %}
{{ expediteur }}

{% endif %}
Le {{ date }}

{% if destinataire %}
{{ destinataire }}

{% endif %}
{% if reference %}
Réf: {{ reference }}

{% endif %}
{% if objet %}
Objet: {{ objet }}

{% endif %}
Madame, Monsieur,

{% block body %}
{% if corps %}
{{ corps }}

{% endif %}
{% endblock %}
{% if conclusion %}
{{ conclusion }}
{% else %}
{{ default_closing }}
{% endif %}
{% if signature %}

{{ signature }}
{% endif %}
"#;

const MOTIVATION_BODY: &str = r#"{% extends "layout" %}
{% block body %}
{% for part in [introduction, experience, motivation] %}
{% if part %}
{{ part }}

{% endif %}
{% endfor %}
{% endblock %}
"#;

const RECLAMATION_BODY: &str = r#"{% extends "layout" %}
{% block body %}
{% if description %}
{{ description }}

{% endif %}
{% if demande %}
{{ demande }}

{% endif %}
{% endblock %}
"#;

const RESILIATION_BODY: &str = r#"{% extends "layout" %}
{% block body %}
{% if corps %}
{{ corps }}

{% endif %}
{% if date_effet %}
Cette résiliation prendra effet le {{ date_effet }}.

{% endif %}
{% endblock %}
"#;

const ADMINISTRATIVE_BODY: &str = r#"{% extends "layout" %}
"#;

/// Field name and its label shown to the user.
type Field = (&'static str, &'static str);

struct LetterTemplate {
    key: &'static str,
    title: &'static str,
    source: &'static str,
    fields: &'static [Field],
}

const TEMPLATES: &[LetterTemplate] = &[
    LetterTemplate {
        key: "motivation",
        title: "Lettre de motivation",
        source: MOTIVATION_BODY,
        fields: &[
            ("coordonnees_expediteur", "Vos coordonnées"),
            ("coordonnees_destinataire", "Coordonnées du destinataire"),
            ("objet", "Objet de la lettre"),
            ("introduction", "Introduction"),
            ("experience", "Expérience et compétences"),
            ("motivation", "Motivation pour le poste"),
            ("conclusion", "Conclusion"),
            ("signature", "Signature"),
        ],
    },
    LetterTemplate {
        key: "reclamation",
        title: "Lettre de réclamation",
        source: RECLAMATION_BODY,
        fields: &[
            ("expediteur", "Vos coordonnées"),
            ("destinataire", "Coordonnées du destinataire"),
            ("reference", "Références (commande, dossier, etc.)"),
            ("objet", "Objet de la réclamation"),
            ("description", "Description du problème"),
            ("demande", "Votre demande"),
            ("conclusion", "Conclusion"),
            ("signature", "Signature"),
        ],
    },
    LetterTemplate {
        key: "administrative",
        title: "Lettre administrative",
        source: ADMINISTRATIVE_BODY,
        fields: &[
            ("expediteur", "Vos coordonnées"),
            ("destinataire", "Coordonnées du destinataire"),
            ("objet", "Objet de la lettre"),
            ("corps", "Corps de la lettre"),
            ("conclusion", "Conclusion"),
            ("signature", "Signature"),
        ],
    },
    LetterTemplate {
        key: "resiliation",
        title: "Lettre de résiliation",
        source: RESILIATION_BODY,
        fields: &[
            ("expediteur", "Vos coordonnées"),
            ("destinataire", "Coordonnées du destinataire"),
            ("reference", "Références client/contrat"),
            ("objet", "Objet de la résiliation"),
            ("corps", "Demande de résiliation"),
            ("date_effet", "Date d'effet souhaitée"),
            ("conclusion", "Conclusion"),
            ("signature", "Signature"),
        ],
    },
];

/// Formats a date the way French letters write it ("18 octobre 2026").
pub fn french_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_FR[date.month0() as usize],
        date.year()
    )
}

pub struct MailAgent {
    env: Environment<'static>,
}

impl MailAgent {
    /// Compiles the letter templates.
    ///
    /// # Errors
    ///
    /// Fails only if a built-in template does not parse.
    pub fn new() -> Result<Self, AgentError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("layout", LAYOUT)
            .map_err(|e| AgentError::Other(format!("Invalid letter layout: {e}")))?;
        for template in TEMPLATES {
            env.add_template(template.key, template.source).map_err(|e| {
                AgentError::Other(format!("Invalid letter template {}: {e}", template.key))
            })?;
        }
        Ok(Self { env })
    }

    fn template(name: &str) -> Result<&'static LetterTemplate, AgentError> {
        TEMPLATES
            .iter()
            .find(|t| t.key == name)
            .ok_or_else(|| {
                AgentError::ExecutionFailed(format!("Le modèle \"{}\" n'existe pas.", name))
            })
    }

    pub fn available_templates(&self) -> BTreeMap<String, LetterTemplateInfo> {
        TEMPLATES
            .iter()
            .map(|t| {
                (
                    t.key.to_string(),
                    LetterTemplateInfo {
                        title: t.title.to_string(),
                        fields: t.fields.iter().map(|(_, label)| label.to_string()).collect(),
                    },
                )
            })
            .collect()
    }

    pub fn generate(
        &self,
        template_type: &str,
        data: &BTreeMap<String, Value>,
    ) -> Result<LetterOutput, AgentError> {
        self.generate_on(template_type, data, Local::now().date_naive())
    }

    /// Renders a letter dated `date`.
    pub fn generate_on(
        &self,
        template_type: &str,
        data: &BTreeMap<String, Value>,
        date: NaiveDate,
    ) -> Result<LetterOutput, AgentError> {
        let template = Self::template(template_type)?;

        let mut ctx: BTreeMap<String, Value> = data
            .iter()
            .filter(|(_, v)| !is_blank(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        // The motivation letter names its address fields differently.
        for (from, to) in [
            ("coordonnees_expediteur", "expediteur"),
            ("coordonnees_destinataire", "destinataire"),
        ] {
            if let Some(value) = ctx.get(from).cloned() {
                ctx.entry(to.to_string()).or_insert(value);
            }
        }
        ctx.insert("date".to_string(), Value::String(french_date(date)));
        ctx.insert(
            "default_closing".to_string(),
            Value::String(DEFAULT_CLOSING.to_string()),
        );

        let content = self
            .env
            .get_template(template.key)
            .and_then(|t| t.render(&ctx))
            .map_err(|e| AgentError::Other(format!("Letter rendering failed: {e}")))?;

        let title = data
            .get("objet")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(template.title)
            .to_string();

        tracing::info!("[MailAgent] Generated '{}' letter", template.key);
        Ok(LetterOutput {
            template: template.key.to_string(),
            title,
            content: content.trim_end().to_string(),
        })
    }

    /// Free-form queries while the mail agent is active list the templates.
    pub fn answer(&self, _query: &str, _ctx: &AgentContext) -> AgentReply {
        let mut message =
            String::from("Je peux rédiger les lettres suivantes à partir de vos informations :\n");
        let mut actions = Vec::new();
        for template in TEMPLATES {
            message.push_str(&format!("\n- {}", template.title));
            actions.push(ReplyAction {
                payload: Some(serde_json::json!({ "templateType": template.key })),
                ..ReplyAction::new(template.title, "generate-letter")
            });
        }
        AgentReply::new(ReplyKind::Letter, AgentKind::Mail, message).with_actions(actions)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
