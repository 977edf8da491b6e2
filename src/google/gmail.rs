//! Gmail operations
//!
//! Message search and retrieval, drafts, sending, labels and trash.

use serde_json::{json, Value};

use crate::error::Result;
use crate::google::client::GoogleClient;
use crate::google::types::*;
use crate::google::utils::{find_header, message_body, truncate_chars, OutgoingMessage};

/// Bodies returned by `get` are cut to this many characters
pub const MAX_BODY_CHARS: usize = 10_000;

const METADATA_HEADERS: [&str; 4] = ["From", "To", "Subject", "Date"];

/// Parameters for drafts and sent messages
#[derive(Debug, Clone, Default)]
pub struct ComposeParams {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub thread_id: Option<String>,
    pub in_reply_to: Option<String>,
}

/// Gmail API bound to one authorized user
pub struct GmailApi<'a> {
    client: &'a GoogleClient,
}

impl<'a> GmailApi<'a> {
    pub fn new(client: &'a GoogleClient) -> Self {
        Self { client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.client.endpoints().gmail, path)
    }

    fn message_url(&self, message_id: &str) -> String {
        self.url(&format!("messages/{}", urlencoding::encode(message_id)))
    }

    /// Search messages and fetch their metadata headers
    pub async fn search(&self, query: &str, max_results: u32) -> Result<SearchResult> {
        let list: MessageList = self
            .client
            .get_json(
                &self.url("messages"),
                &[("q", query.to_string()), ("maxResults", max_results.to_string())],
            )
            .await?;

        let mut query_params = vec![("format", "metadata".to_string())];
        query_params.extend(METADATA_HEADERS.iter().map(|h| ("metadataHeaders", h.to_string())));

        let mut messages = Vec::with_capacity(list.messages.len());
        for reference in &list.messages {
            let message: Message = self
                .client
                .get_json(&self.message_url(&reference.id), &query_params)
                .await?;
            messages.push(summarize(message));
        }

        tracing::debug!(count = messages.len(), "gmail search");
        Ok(SearchResult {
            result_count: messages.len(),
            messages,
        })
    }

    /// Full message with decoded body
    pub async fn get(&self, message_id: &str) -> Result<MessageDetail> {
        let message: Message = self
            .client
            .get_json(&self.message_url(message_id), &[("format", "full".to_string())])
            .await?;

        let payload = message.payload.unwrap_or_default();
        let header = |name: &str| find_header(&payload, name).unwrap_or_default().to_string();

        Ok(MessageDetail {
            from: header("From"),
            to: header("To"),
            cc: header("Cc"),
            subject: header("Subject"),
            date: header("Date"),
            body: truncate_chars(&message_body(&payload), MAX_BODY_CHARS),
            id: message.id,
            thread_id: message.thread_id,
            label_ids: message.label_ids,
            snippet: message.snippet,
        })
    }

    pub async fn create_draft(&self, params: &ComposeParams) -> Result<Value> {
        let raw = OutgoingMessage {
            to: params.to.clone(),
            subject: params.subject.clone(),
            body: params.body.clone(),
            in_reply_to: params.in_reply_to.clone(),
            ..Default::default()
        }
        .encode()?;

        let request = CreateDraftRequest {
            message: SendMessageRequest {
                raw,
                thread_id: params.thread_id.clone(),
            },
        };
        let draft: Draft = self.client.post_json(&self.url("drafts"), &[], &request).await?;

        let message = draft.message.as_ref();
        Ok(json!({
            "draftId": draft.id,
            "messageId": message.map(|m| m.id.clone()),
            "threadId": message.and_then(|m| m.thread_id.clone()),
        }))
    }

    /// Send as the authorized user
    pub async fn send(&self, params: &ComposeParams) -> Result<Value> {
        let raw = OutgoingMessage {
            from: Some(self.client.email().to_string()),
            to: params.to.clone(),
            cc: params.cc.clone(),
            bcc: params.bcc.clone(),
            subject: params.subject.clone(),
            body: params.body.clone(),
            in_reply_to: params.in_reply_to.clone(),
        }
        .encode()?;

        let request = SendMessageRequest {
            raw,
            thread_id: params.thread_id.clone(),
        };
        let message: Message = self
            .client
            .post_json(&self.url("messages/send"), &[], &request)
            .await?;

        tracing::info!(email = %self.client.email(), message_id = %message.id, "sent message");
        Ok(json!({
            "messageId": message.id,
            "threadId": message.thread_id,
            "labelIds": message.label_ids,
            "sent": true,
        }))
    }

    async fn modify(&self, message_id: &str, request: &ModifyMessageRequest) -> Result<Message> {
        self.client
            .post_json(&format!("{}/modify", self.message_url(message_id)), &[], request)
            .await
    }

    pub async fn add_labels(&self, message_id: &str, label_ids: &[String]) -> Result<Value> {
        let request = ModifyMessageRequest {
            add_label_ids: Some(label_ids.to_vec()),
            remove_label_ids: None,
        };
        self.modify(message_id, &request).await?;
        Ok(json!({ "success": true, "messageId": message_id, "addedLabels": label_ids }))
    }

    pub async fn remove_labels(&self, message_id: &str, label_ids: &[String]) -> Result<Value> {
        let request = ModifyMessageRequest {
            add_label_ids: None,
            remove_label_ids: Some(label_ids.to_vec()),
        };
        self.modify(message_id, &request).await?;
        Ok(json!({ "success": true, "messageId": message_id, "removedLabels": label_ids }))
    }

    pub async fn mark_as_read(&self, message_id: &str) -> Result<Value> {
        let request = ModifyMessageRequest {
            add_label_ids: None,
            remove_label_ids: Some(vec!["UNREAD".to_string()]),
        };
        self.modify(message_id, &request).await?;
        Ok(json!({ "success": true, "messageId": message_id, "markedAsRead": true }))
    }

    pub async fn list_labels(&self) -> Result<Vec<Label>> {
        let list: LabelList = self.client.get_json(&self.url("labels"), &[]).await?;
        Ok(list.labels)
    }

    /// Create a visible user label; a missing color falls back to black on white
    pub async fn create_label(
        &self,
        name: &str,
        background_color: Option<&str>,
        text_color: Option<&str>,
    ) -> Result<Label> {
        let color = match (background_color, text_color) {
            (None, None) => None,
            (background, text) => Some(LabelColor {
                background_color: background.unwrap_or("#000000").to_string(),
                text_color: text.unwrap_or("#ffffff").to_string(),
            }),
        };

        let request = CreateLabelRequest {
            name: name.to_string(),
            label_list_visibility: "labelShow".to_string(),
            message_list_visibility: "show".to_string(),
            color,
        };
        let label: Label = self.client.post_json(&self.url("labels"), &[], &request).await?;
        tracing::info!(email = %self.client.email(), label = %label.name, "created label");
        Ok(label)
    }

    pub async fn trash(&self, message_id: &str) -> Result<Value> {
        let _: Message = self
            .client
            .post_json(&format!("{}/trash", self.message_url(message_id)), &[], &json!({}))
            .await?;
        Ok(json!({ "success": true, "messageId": message_id, "trashed": true }))
    }
}

fn summarize(message: Message) -> MessageSummary {
    let payload = message.payload.unwrap_or_default();
    let header = |name: &str| find_header(&payload, name).unwrap_or_default().to_string();

    MessageSummary {
        from: header("From"),
        to: header("To"),
        subject: header("Subject"),
        date: header("Date"),
        id: message.id,
        thread_id: message.thread_id,
        snippet: message.snippet,
        label_ids: message.label_ids,
    }
}
