//! Board REST client: key/token query auth, JSON bodies.

use async_trait::async_trait;
use taskpulse_core::config::BoardConfig;
use taskpulse_core::error::{Error, Result};

use crate::{BoardApi, BoardList, BoardMember, CardDraft, CardSnapshot, WebhookInfo};

/// HTTP client for the collaboration board.
pub struct BoardClient {
    config: BoardConfig,
    client: reqwest::Client,
}

impl BoardClient {
    pub fn new(config: BoardConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Client build: {e}")))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [("key", &self.config.api_key), ("token", &self.config.token)]
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .query(&self.auth())
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("GET {path}: {status} - {text}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Http(format!("GET {path}: invalid body: {e}")))
    }
}

#[async_trait]
impl BoardApi for BoardClient {
    async fn list_cards(&self) -> Result<Vec<CardSnapshot>> {
        let path = format!("boards/{}/cards", self.config.board_id);
        self.get_json(&path)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))
    }

    async fn get_list(&self, list_id: &str) -> Result<BoardList> {
        self.get_json(&format!("lists/{list_id}"))
            .await
            .map_err(|e| Error::Enrichment(e.to_string()))
    }

    async fn get_member(&self, member_id: &str) -> Result<BoardMember> {
        self.get_json(&format!("members/{member_id}"))
            .await
            .map_err(|e| Error::Enrichment(e.to_string()))
    }

    async fn board_members(&self) -> Result<Vec<BoardMember>> {
        let path = format!("boards/{}/members", self.config.board_id);
        self.get_json(&path)
            .await
            .map_err(|e| Error::Enrichment(e.to_string()))
    }

    async fn upsert_card(&self, draft: &CardDraft) -> Result<CardSnapshot> {
        // Completed edits land on the done list, open edits on the inbox.
        let list_id = if draft.completed {
            self.done_list_id().await?
        } else {
            self.config.inbox_list_id.clone()
        };

        let mut form = vec![
            ("key".to_string(), self.config.api_key.clone()),
            ("token".to_string(), self.config.token.clone()),
            ("name".to_string(), draft.name.clone()),
            ("desc".to_string(), draft.desc.clone()),
            ("idMembers".to_string(), draft.member_ids.join(",")),
            ("idList".to_string(), list_id),
        ];
        if let Some(due) = draft.due {
            form.push(("due".to_string(), due.to_rfc3339()));
        }

        let request = match &draft.card_id {
            Some(id) => self.client.put(self.url(&format!("cards/{id}"))),
            None => self.client.post(self.url("cards")),
        };
        let response = request
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Upsert card: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("Upsert card: {status} - {text}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Http(format!("Upsert card: invalid body: {e}")))
    }

    async fn delete_card(&self, card_id: &str) -> Result<bool> {
        let response = self
            .client
            .delete(self.url(&format!("cards/{card_id}")))
            .query(&self.auth())
            .send()
            .await
            .map_err(|e| Error::Http(format!("Delete card: {e}")))?;
        Ok(response.status().is_success())
    }

    async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>> {
        let path = format!("tokens/{}/webhooks", self.config.token);
        let response = self
            .client
            .get(self.url(&path))
            .query(&[("key", &self.config.api_key)])
            .send()
            .await
            .map_err(|e| Error::Http(format!("List webhooks: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!("List webhooks: {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Http(format!("List webhooks: invalid body: {e}")))
    }

    async fn create_webhook(&self, callback_url: &str) -> Result<()> {
        let form = [
            ("key", self.config.api_key.as_str()),
            ("token", self.config.token.as_str()),
            ("callbackURL", callback_url),
            ("idModel", self.config.board_id.as_str()),
        ];
        let response = self
            .client
            .post(self.url("webhooks"))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Create webhook: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("Create webhook: {status} - {text}")));
        }
        tracing::info!("Webhook registered for {callback_url}");
        Ok(())
    }
}

impl BoardClient {
    /// Resolve the done list's id by name on the configured board.
    async fn done_list_id(&self) -> Result<String> {
        let path = format!("boards/{}/lists", self.config.board_id);
        let lists: Vec<BoardList> = self.get_json(&path).await?;
        lists
            .into_iter()
            .find(|l| l.name.eq_ignore_ascii_case(&self.config.done_list))
            .map(|l| l.id)
            .ok_or_else(|| {
                Error::Http(format!("No list named '{}' on board", self.config.done_list))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_snapshot_wire_format() {
        let json = r#"{
            "id": "card-1",
            "name": "Ship the release",
            "desc": "cut and tag",
            "due": "2026-08-10T12:00:00.000Z",
            "idList": "list-9",
            "idMembers": ["m-1", "m-2"]
        }"#;
        let card: CardSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(card.id, "card-1");
        assert_eq!(card.list_id.as_deref(), Some("list-9"));
        assert_eq!(card.member_ids, vec!["m-1", "m-2"]);
        assert!(card.due.is_some());
    }

    #[test]
    fn test_card_snapshot_missing_optionals() {
        let json = r#"{"id": "card-2", "name": "No frills"}"#;
        let card: CardSnapshot = serde_json::from_str(json).unwrap();
        assert!(card.due.is_none());
        assert!(card.list_id.is_none());
        assert!(card.member_ids.is_empty());
        assert_eq!(card.desc, "");
    }

    #[test]
    fn test_url_join() {
        let client = BoardClient::new(BoardConfig {
            base_url: "https://api.example.com/1/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.url("cards"), "https://api.example.com/1/cards");
    }
}
