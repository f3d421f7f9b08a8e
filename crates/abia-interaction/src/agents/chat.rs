//! General conversation through the LLM.

use crate::error::AgentError;
use crate::llm_client::{ChatMessage, Completion, LlmClient};
use abia_core::integration::{AgentContext, AgentReply, ReplyKind};
use abia_core::session::{AgentKind, FileRef};
use std::sync::Arc;

const PROMPT_INTRO: &str = "Vous êtes ABIA, un assistant IA intelligent et utile. ";
const PROMPT_OUTRO: &str = "Soyez concis, précis et utile dans vos réponses.";

/// Builds the system prompt, mentioning the file the user is working on.
pub fn system_prompt(active_file: Option<&FileRef>) -> String {
    let mut prompt = String::from(PROMPT_INTRO);
    if let Some(file) = active_file {
        prompt.push_str(&format!(
            "Vous travaillez actuellement sur le fichier {}. C'est un fichier de type {}. ",
            file.name, file.file_type
        ));
    }
    prompt.push_str(PROMPT_OUTRO);
    prompt
}

#[derive(Clone)]
pub struct ChatAgent {
    llm: Option<Arc<dyn LlmClient>>,
}

impl ChatAgent {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> Option<&Arc<dyn LlmClient>> {
        self.llm.as_ref()
    }

    /// Sends `messages` to the configured model.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, AgentError> {
        let llm = self.llm.as_ref().ok_or_else(|| {
            AgentError::NotConfigured(
                "Aucun modèle de langage n'est configuré. Ajoutez une clé API dans la configuration."
                    .to_string(),
            )
        })?;
        llm.complete(messages).await
    }

    pub async fn answer(&self, query: &str, ctx: &AgentContext) -> Result<AgentReply, AgentError> {
        let mut messages = Vec::with_capacity(ctx.history.len() + 2);
        messages.push(ChatMessage::system(system_prompt(ctx.active_file())));
        messages.extend(ctx.history.iter().map(ChatMessage::from_turn));
        messages.push(ChatMessage::user(query));

        let completion = self.complete(&messages).await?;
        Ok(
            AgentReply::new(ReplyKind::General, AgentKind::Chat, completion.text)
                .with_usage(Some(completion.usage)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{ScriptedLlm, context};
    use abia_core::session::Turn;

    #[test]
    fn test_system_prompt_mentions_file() {
        let prompt = system_prompt(Some(&FileRef::new("/tmp/budget.xlsx")));
        assert!(prompt.starts_with("Vous êtes ABIA"));
        assert!(prompt.contains("le fichier budget.xlsx"));
        assert!(prompt.contains("de type excel"));
        assert!(prompt.ends_with("utile dans vos réponses."));

        assert!(!system_prompt(None).contains("fichier"));
    }

    #[tokio::test]
    async fn test_answer_sends_history_in_order() {
        let llm = Arc::new(ScriptedLlm::new("Bien sûr."));
        let agent = ChatAgent::new(Some(llm.clone()));
        let mut ctx = context(AgentKind::Chat);
        ctx.history = vec![Turn::user("Bonjour"), Turn::assistant("Salut !", AgentKind::Chat)];

        let reply = agent.answer("Peux-tu m'aider ?", &ctx).await.unwrap();
        assert_eq!(reply.message, "Bien sûr.");
        assert_eq!(reply.kind, ReplyKind::General);
        assert!(reply.usage.is_some());

        let sent = llm.last_messages();
        let roles: Vec<&str> = sent.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(sent[3].content, "Peux-tu m'aider ?");
    }

    #[tokio::test]
    async fn test_without_llm_is_not_configured() {
        let agent = ChatAgent::new(None);
        let err = agent
            .answer("Bonjour", &context(AgentKind::Chat))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NotConfigured(_)));
    }
}
