use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{EventHandlers, MenuButton, Notifier};
use crate::config::TelegramCfg;
use crate::shared::errors::NotifierError;
use crate::shared::shutdown::ShutdownSignal;

/// Pause before polling again after a failed `getUpdates`
const RETRY_PAUSE: Duration = Duration::from_secs(5);

/// Envelope shared by every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    first_name: String,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    data: Option<String>,
}

/// Telegram Bot API notifier posting to a single chat
pub struct TelegramNotifier {
    http_client: Client,
    base_url: String,
    chat_id: String,
    poll_timeout_secs: u64,
}

impl TelegramNotifier {
    pub fn new(cfg: &TelegramCfg) -> Result<Self, NotifierError> {
        // Long polls must finish before the client gives up on them.
        let http_client = Client::builder()
            .timeout(Duration::from_secs(cfg.poll_timeout_secs + 10))
            .build()
            .map_err(|e| NotifierError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: format!("{}/bot{}", cfg.api_url.trim_end_matches('/'), cfg.token),
            chat_id: cfg.chat_id.clone(),
            poll_timeout_secs: cfg.poll_timeout_secs,
        })
    }

    /// Build the notifier and check the credentials with `getMe`
    pub async fn connect(cfg: &TelegramCfg) -> Result<Self, NotifierError> {
        let notifier = Self::new(cfg)?;
        let me: BotUser = notifier.call("getMe", &json!({})).await?;
        info!(
            "Authorized as {}",
            me.username.as_deref().unwrap_or(&me.first_name)
        );
        Ok(notifier)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, NotifierError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.http_client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(NotifierError::Transport(format!("{} returned {}", method, status)));
            }
            Err(e) => return Err(NotifierError::Decode(format!("{}: {}", method, e))),
        };

        if !envelope.ok {
            return Err(NotifierError::Api(format!(
                "{}: {}",
                method,
                envelope.description.unwrap_or_else(|| status.to_string())
            )));
        }

        envelope
            .result
            .ok_or_else(|| NotifierError::Decode(format!("{}: missing result", method)))
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, NotifierError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["callback_query"],
            }),
        )
        .await
    }

    async fn answer_callback(&self, callback_id: &str) {
        let result: Result<bool, _> = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": callback_id }))
            .await;
        if let Err(e) = result {
            debug!("Failed to acknowledge callback {}: {}", callback_id, e);
        }
    }
}

/// `reply_markup` with one button per row
fn inline_keyboard(buttons: &[MenuButton]) -> Value {
    let rows: Vec<Value> = buttons
        .iter()
        .map(|b| json!([{ "text": b.label, "callback_data": b.event_id }]))
        .collect();
    json!({ "inline_keyboard": rows })
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotifierError> {
        let _: Value = self
            .call("sendMessage", &json!({ "chat_id": self.chat_id, "text": text }))
            .await?;
        Ok(())
    }

    async fn create_menu(&self, title: &str, buttons: &[MenuButton]) -> Result<(), NotifierError> {
        let _: Value = self
            .call(
                "sendMessage",
                &json!({
                    "chat_id": self.chat_id,
                    "text": title,
                    "reply_markup": inline_keyboard(buttons),
                }),
            )
            .await?;
        Ok(())
    }

    async fn listen_for_events(
        &self,
        handlers: &EventHandlers,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), NotifierError> {
        info!("Listening for menu events: {:?}", handlers);
        let mut offset = 0;

        loop {
            let updates = tokio::select! {
                _ = shutdown.triggered() => break,
                updates = self.get_updates(offset) => updates,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(callback) = update.callback_query else {
                            continue;
                        };
                        self.answer_callback(&callback.id).await;
                        match callback.data {
                            Some(event_id) => {
                                handlers.dispatch(&event_id);
                            }
                            None => debug!("Callback {} without data", callback.id),
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch updates: {}", e);
                    tokio::select! {
                        _ = shutdown.triggered() => break,
                        _ = tokio::time::sleep(RETRY_PAUSE) => {}
                    }
                }
            }
        }

        info!("Event listener stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_keyboard_one_button_per_row() {
        let markup = inline_keyboard(&[
            MenuButton::new("📊 Current quotes", "CURRENT_QUOTES_RATE"),
            MenuButton::new("Other", "OTHER"),
        ]);

        let rows = markup["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0]["callback_data"], "CURRENT_QUOTES_RATE");
        assert_eq!(rows[1][0]["text"], "Other");
    }

    #[test]
    fn test_update_envelope_decodes_callback() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 7, "callback_query": {"id": "abc", "data": "CURRENT_QUOTES_RATE", "from": {"id": 1}}},
                {"update_id": 8, "message": {"text": "hello"}}
            ]
        }"#;
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let updates = envelope.result.unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates[0].callback_query.as_ref().unwrap().data.as_deref(),
            Some("CURRENT_QUOTES_RATE")
        );
        assert!(updates[1].callback_query.is_none());
    }

    #[test]
    fn test_error_envelope_carries_description() {
        let body = r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#;
        let envelope: ApiResponse<Value> = serde_json::from_str(body).unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.description.as_deref(), Some("Bad Request: chat not found"));
    }

    #[test]
    fn test_base_url_embeds_token() {
        let cfg = TelegramCfg {
            token: "123:ABC".to_string(),
            chat_id: "-100".to_string(),
            ..TelegramCfg::default()
        };
        let notifier = TelegramNotifier::new(&cfg).unwrap();
        assert_eq!(notifier.base_url, "https://api.telegram.org/bot123:ABC");
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_token() {
        let cfg = TelegramCfg {
            token: "123456:SECRET-TOKEN".to_string(),
            chat_id: "-100".to_string(),
            api_url: "http://127.0.0.1:1".to_string(),
            ..TelegramCfg::default()
        };
        let notifier = TelegramNotifier::new(&cfg).unwrap();

        let err = notifier.send_message("hi").await.unwrap_err();
        assert!(matches!(err, NotifierError::Transport(_)));
        assert!(!err.to_string().contains("SECRET-TOKEN"), "{}", err);
    }
}
