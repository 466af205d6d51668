//! Grounded answer generation: retrieve, resolve texts, prompt, complete.

use serde::{Deserialize, Serialize};
use tracing::info;

use chatrag_core::error::Result;
use chatrag_core::traits::{ChatMessage, CompletionProvider, DenseIndex, SparseStore};
use chatrag_core::types::DomainId;

use crate::engine::{HybridSearchEngine, SearchOptions};

const NO_MESSAGES: &str = "Нет сообщений.";

/// Completion text plus the records that were offered as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub base_ids: Vec<DomainId>,
}

/// Renders the Russian instruction prompt around `<{id, text}>` lines.
pub fn build_prompt(question: &str, messages: &[(DomainId, String)]) -> String {
    let history = if messages.is_empty() {
        NO_MESSAGES.to_string()
    } else {
        messages
            .iter()
            .map(|(id, text)| format!("<{{{id}, {text}}}>"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "\
РОЛЬ: Ты помощник по поиску информации в чатах Telegram.
ЗАДАЧА: На основе запроса пользователя и предоставленных сообщений составь ответ.
ФОРМАТ ДАННЫХ:
История сообщений в формате:
<{{message_id, message_text}}>
Каждое сообщение на отдельной строке.

ПРАВИЛА:
- Используй только предоставленные сообщения для ответа.
- Если нет подходящей информации, ответь \"Извините, я не смог найти информацию по вашему запросу.\"
- Будь краток и точен.
- Не обязательно использовать все предоставленные сообщения, выбери только релевантные.

ФОРМАТ ОТВЕТА:
Ответ: [текст ответа]
Использованные сообщения: <{{message_id1, message_id2, ...}}>

История сообщений:
{history}

Запрос пользователя: {question}
"
    )
}

impl<D, S> HybridSearchEngine<D, S>
where
    D: DenseIndex,
    S: SparseStore + 'static,
{
    /// Search, then ask `llm` to answer from the retrieved messages only.
    /// Completion failures propagate.
    pub async fn answer(
        &self,
        llm: &dyn CompletionProvider,
        question: &str,
        options: &SearchOptions,
    ) -> Result<Answer> {
        let hits = self.search(question, options).await?;
        let ids: Vec<DomainId> = hits.iter().map(|h| h.id).collect();
        let messages = self.get_texts(&ids).await?;
        let prompt = build_prompt(question, &messages);
        info!(context = messages.len(), "sending prompt to completion provider");
        let text = llm.complete(&[ChatMessage::user(prompt)]).await?;
        Ok(Answer { text, base_ids: messages.into_iter().map(|(id, _)| id).collect() })
    }
}
