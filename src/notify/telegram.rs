use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Notifier, NotifyError};
use crate::db::Database;
use crate::models::{DecisionLog, Item, ItemStatus};

/// Default Bot API endpoint.
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Posts transition notices to the chat configured on the item's project.
///
/// Projects without both a bot token and a chat id are silently skipped.
#[derive(Clone)]
pub struct TelegramNotifier {
    db: Database,
    api_url: String,
    client: Client,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

impl TelegramNotifier {
    pub fn new(db: Database, api_url: impl Into<String>) -> Self {
        Self {
            db,
            api_url: api_url.into(),
            client: Client::new(),
        }
    }

    async fn send(&self, token: &str, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id,
                text,
                parse_mode: "MarkdownV2",
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(
        &self,
        item: &Item,
        new_status: ItemStatus,
        comment: Option<&str>,
    ) -> Result<(), NotifyError> {
        let Some(project) = self.db.get_project(item.project_id)? else {
            return Ok(());
        };
        let (Some(token), Some(chat_id)) = (project.telegram_bot_token, project.telegram_chat_id)
        else {
            return Ok(());
        };

        let latest_decision = if new_status == ItemStatus::Done {
            self.db.list_decision_logs(item.id)?.pop()
        } else {
            None
        };

        let Some(message) = format_message(item, new_status, comment, latest_decision.as_ref())
        else {
            return Ok(());
        };

        tracing::debug!(item = %item.id, status = %new_status, "Sending Telegram notification");
        self.send(&token, &chat_id, &message).await
    }
}

/// The MarkdownV2 notice for a transition, or `None` if the status change
/// is not worth a message.
pub fn format_message(
    item: &Item,
    new_status: ItemStatus,
    comment: Option<&str>,
    latest_decision: Option<&DecisionLog>,
) -> Option<String> {
    match new_status {
        ItemStatus::PendingReview => Some(format!(
            "📋 *New item ready for review*\n\n*{}* \\[{}\\]",
            escape_markdown(&item.title),
            item.priority
        )),
        ItemStatus::Done => {
            let mut message = format!(
                "✅ *Item completed, needs acceptance*\n\n*{}*",
                escape_markdown(&item.title)
            );
            if let Some(decision) = latest_decision {
                message.push_str(&format!(
                    "\n\nDecision: {}",
                    escape_markdown(&decision.decision)
                ));
            }
            Some(message)
        }
        ItemStatus::Draft => comment.map(|reason| {
            format!(
                "❌ *Item rejected*\n\n*{}*\nReason: {}",
                escape_markdown(&item.title),
                escape_markdown(reason)
            )
        }),
        _ => None,
    }
}

/// Escape the characters MarkdownV2 treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|'
                | '{' | '}' | '.' | '!'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
