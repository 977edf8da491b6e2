//! MCP tool definitions and handlers
//!
//! Every tool names the Workspace user it acts for via `userEmail`; the
//! broker resolves that to an authorized Google client.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::error::{McpError, Result, ValidationError, WorkspaceMcpError};
use crate::google::calendar::{CalendarApi, EventChanges, WorkingHours};
use crate::google::drive::DriveApi;
use crate::google::gmail::{ComposeParams, GmailApi};
use crate::google::utils::{validate_email, validate_header_value, validate_recipients};
use crate::google::WorkspaceBroker;
use crate::mcp::types::{CallToolResult, Tool};

/// Appended to errors the caller may retry unchanged
pub const RETRY_HINT: &str = "temporary failure; retrying may succeed";

/// Tool handler
pub struct ToolHandler {
    broker: Arc<WorkspaceBroker>,
    time_zone: String,
}

impl ToolHandler {
    /// `time_zone` is attached to created and updated calendar events
    pub fn new(broker: Arc<WorkspaceBroker>, time_zone: impl Into<String>) -> Self {
        Self {
            broker,
            time_zone: time_zone.into(),
        }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        tool_definitions()
    }

    /// Call a tool by name; failures become tool errors, never protocol errors
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        let outcome = match name {
            "gmail_search" => self.gmail_search(args).await,
            "gmail_get" => self.gmail_get(args).await,
            "gmail_create_draft" => self.gmail_compose(args, false).await,
            "gmail_send" => self.gmail_compose(args, true).await,
            "gmail_add_label" => self.gmail_change_labels(args, true).await,
            "gmail_remove_label" => self.gmail_change_labels(args, false).await,
            "gmail_list_labels" => self.gmail_list_labels(args).await,
            "gmail_create_label" => self.gmail_create_label(args).await,
            "gmail_mark_as_read" => self.gmail_mark_as_read(args).await,
            "gmail_trash" => self.gmail_trash(args).await,
            "calendar_get_events" => self.calendar_get_events(args).await,
            "calendar_create_event" => self.calendar_create_event(args).await,
            "calendar_update_event" => self.calendar_update_event(args).await,
            "calendar_delete_event" => self.calendar_delete_event(args).await,
            "calendar_find_free_slots" => self.calendar_find_free_slots(args).await,
            "drive_search" => self.drive_search(args).await,
            "drive_get_file" => self.drive_get_file(args).await,
            "drive_create_document" => self.drive_create_document(args).await,
            "drive_list_files" => self.drive_list_files(args).await,
            "drive_upload_file" => self.drive_upload_file(args).await,
            "drive_create_folder" => self.drive_create_folder(args).await,
            "drive_move_file" => self.drive_move_file(args).await,
            _ => Err(McpError::UnknownTool {
                name: name.to_string(),
            }
            .into()),
        };

        match outcome {
            Ok(text) => CallToolResult::text(text),
            Err(e) => {
                let retryable = e.is_retryable();
                tracing::warn!(tool = %name, retryable, "tool call failed: {}", e);
                if retryable {
                    CallToolResult::error(format!("{} ({})", e, RETRY_HINT))
                } else {
                    CallToolResult::error(e.to_string())
                }
            }
        }
    }

    // ==================== Gmail ====================

    async fn gmail_search(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            query: String,
            #[serde(default = "default_ten")]
            #[validate(range(min = 1, max = 50))]
            max_results: u32,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        render(&GmailApi::new(&client).search(&args.query, args.max_results).await?)
    }

    async fn gmail_get(&self, args: Value) -> Result<String> {
        let args: MessageArgs = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        render(&GmailApi::new(&client).get(&args.message_id).await?)
    }

    async fn gmail_compose(&self, args: Value, send: bool) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            to: String,
            subject: String,
            body: String,
            cc: Option<String>,
            bcc: Option<String>,
            thread_id: Option<String>,
            in_reply_to: Option<String>,
        }

        let args: Args = parse_args(args)?;
        validate_recipients(&args.to)?;
        for list in [&args.cc, &args.bcc].into_iter().flatten() {
            validate_recipients(list)?;
        }
        if let Some(reply) = &args.in_reply_to {
            validate_header_value("inReplyTo", reply)?;
        }

        let params = ComposeParams {
            to: args.to,
            subject: args.subject,
            body: args.body,
            cc: args.cc,
            bcc: args.bcc,
            thread_id: args.thread_id,
            in_reply_to: args.in_reply_to,
        };

        let client = self.broker.client_for(&args.user_email).await?;
        let gmail = GmailApi::new(&client);
        if send {
            render(&gmail.send(&params).await?)
        } else {
            render(&gmail.create_draft(&params).await?)
        }
    }

    async fn gmail_change_labels(&self, args: Value, add: bool) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            message_id: String,
            #[validate(length(min = 1))]
            label_ids: Vec<String>,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        let gmail = GmailApi::new(&client);
        if add {
            render(&gmail.add_labels(&args.message_id, &args.label_ids).await?)
        } else {
            render(&gmail.remove_labels(&args.message_id, &args.label_ids).await?)
        }
    }

    async fn gmail_list_labels(&self, args: Value) -> Result<String> {
        let args: UserArgs = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        render(&GmailApi::new(&client).list_labels().await?)
    }

    async fn gmail_create_label(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            #[validate(length(min = 1))]
            name: String,
            background_color: Option<String>,
            text_color: Option<String>,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        let label = GmailApi::new(&client)
            .create_label(
                &args.name,
                args.background_color.as_deref(),
                args.text_color.as_deref(),
            )
            .await?;
        render(&label)
    }

    async fn gmail_mark_as_read(&self, args: Value) -> Result<String> {
        let args: MessageArgs = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        render(&GmailApi::new(&client).mark_as_read(&args.message_id).await?)
    }

    async fn gmail_trash(&self, args: Value) -> Result<String> {
        let args: MessageArgs = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        render(&GmailApi::new(&client).trash(&args.message_id).await?)
    }

    // ==================== Calendar ====================

    async fn calendar_get_events(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            time_min: Option<String>,
            time_max: Option<String>,
            #[serde(default = "default_ten")]
            #[validate(range(min = 1, max = 250))]
            max_results: u32,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        let events = CalendarApi::new(&client, &self.time_zone)
            .get_events(args.time_min.as_deref(), args.time_max.as_deref(), args.max_results)
            .await?;
        render(&events)
    }

    async fn calendar_create_event(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            summary: String,
            start_time: String,
            end_time: String,
            description: Option<String>,
            location: Option<String>,
            #[serde(default)]
            attendees: Vec<String>,
        }

        let args: Args = parse_args(args)?;
        if let Some(bad) = args.attendees.iter().find(|a| !validate_email(a)) {
            return Err(ValidationError::InvalidEmail { email: bad.clone() }.into());
        }

        let client = self.broker.client_for(&args.user_email).await?;
        let created = CalendarApi::new(&client, &self.time_zone)
            .create_event(
                &args.summary,
                &args.start_time,
                &args.end_time,
                args.description.as_deref(),
                args.location.as_deref(),
                &args.attendees,
            )
            .await?;
        render(&created)
    }

    async fn calendar_update_event(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            event_id: String,
            summary: Option<String>,
            start_time: Option<String>,
            end_time: Option<String>,
            description: Option<String>,
            location: Option<String>,
        }

        let args: Args = parse_args(args)?;
        let changes = EventChanges {
            summary: args.summary,
            start_time: args.start_time,
            end_time: args.end_time,
            description: args.description,
            location: args.location,
        };

        let client = self.broker.client_for(&args.user_email).await?;
        let updated = CalendarApi::new(&client, &self.time_zone)
            .update_event(&args.event_id, &changes)
            .await?;
        render(&updated)
    }

    async fn calendar_delete_event(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            event_id: String,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        let deleted = CalendarApi::new(&client, &self.time_zone)
            .delete_event(&args.event_id)
            .await?;
        render(&deleted)
    }

    async fn calendar_find_free_slots(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            date_min: String,
            date_max: String,
            #[serde(default = "default_slot_minutes")]
            #[validate(range(min = 15, max = 480))]
            duration_minutes: i64,
            #[serde(default = "default_hours_start")]
            #[validate(range(min = 0, max = 23))]
            working_hours_start: u32,
            #[serde(default = "default_hours_end")]
            #[validate(range(min = 1, max = 24))]
            working_hours_end: u32,
        }

        let args: Args = parse_args(args)?;
        let hours = WorkingHours {
            start: args.working_hours_start,
            end: args.working_hours_end,
        };

        let client = self.broker.client_for(&args.user_email).await?;
        let slots = CalendarApi::new(&client, &self.time_zone)
            .find_free_slots(&args.date_min, &args.date_max, args.duration_minutes, hours)
            .await?;
        render(&slots)
    }

    // ==================== Drive ====================

    async fn drive_search(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            query: String,
            #[serde(default = "default_ten")]
            #[validate(range(min = 1, max = 50))]
            max_results: u32,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        render(&DriveApi::new(&client).search(&args.query, args.max_results).await?)
    }

    async fn drive_get_file(&self, args: Value) -> Result<String> {
        let args: FileArgs = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        render(&DriveApi::new(&client).get_file(&args.file_id).await?)
    }

    async fn drive_create_document(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            #[validate(length(min = 1))]
            title: String,
            #[serde(default)]
            content: String,
            folder_id: Option<String>,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        let created = DriveApi::new(&client)
            .create_document(&args.title, &args.content, args.folder_id.as_deref())
            .await?;
        render(&created)
    }

    async fn drive_list_files(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            folder_id: Option<String>,
            #[serde(default = "default_twenty")]
            #[validate(range(min = 1, max = 100))]
            max_results: u32,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        let files = DriveApi::new(&client)
            .list_files(args.folder_id.as_deref(), args.max_results)
            .await?;
        render(&files)
    }

    async fn drive_upload_file(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            #[validate(length(min = 1))]
            name: String,
            content: String,
            #[serde(default = "default_upload_mime")]
            mime_type: String,
            folder_id: Option<String>,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        let file = DriveApi::new(&client)
            .upload_file(&args.name, &args.content, &args.mime_type, args.folder_id.as_deref())
            .await?;
        render(&file)
    }

    async fn drive_create_folder(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            #[validate(length(min = 1))]
            name: String,
            parent_folder_id: Option<String>,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        let folder = DriveApi::new(&client)
            .create_folder(&args.name, args.parent_folder_id.as_deref())
            .await?;
        render(&folder)
    }

    async fn drive_move_file(&self, args: Value) -> Result<String> {
        #[derive(Deserialize, Validate)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            #[validate(email)]
            user_email: String,
            file_id: String,
            new_parent_id: String,
        }

        let args: Args = parse_args(args)?;
        let client = self.broker.client_for(&args.user_email).await?;
        let moved = DriveApi::new(&client)
            .move_file(&args.file_id, &args.new_parent_id)
            .await?;
        render(&moved)
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UserArgs {
    #[validate(email)]
    user_email: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct MessageArgs {
    #[validate(email)]
    user_email: String,
    message_id: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct FileArgs {
    #[validate(email)]
    user_email: String,
    file_id: String,
}

fn default_ten() -> u32 {
    10
}

fn default_twenty() -> u32 {
    20
}

fn default_slot_minutes() -> i64 {
    30
}

fn default_hours_start() -> u32 {
    9
}

fn default_hours_end() -> u32 {
    17
}

fn default_upload_mime() -> String {
    "text/plain".to_string()
}

/// Deserialize and validate tool arguments
fn parse_args<T: DeserializeOwned + Validate>(args: Value) -> Result<T> {
    let parsed: T = serde_json::from_value(args).map_err(|e| McpError::InvalidArguments {
        message: e.to_string(),
    })?;
    parsed.validate().map_err(|e| McpError::InvalidArguments {
        message: e.to_string(),
    })?;
    Ok(parsed)
}

fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(WorkspaceMcpError::from)
}

// ==================== Tool Definitions ====================

fn tool_def(name: &str, title: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        title: Some(title.to_string()),
        description: Some(description.to_string()),
        input_schema,
    }
}

/// Object schema with the `userEmail` property prepended and required
fn schema(properties: Value, required: &[&str]) -> Value {
    let mut props = serde_json::Map::new();
    props.insert(
        "userEmail".to_string(),
        json!({"type": "string", "format": "email", "description": "Google account to act for"}),
    );
    if let Value::Object(extra) = properties {
        props.extend(extra);
    }

    let mut required_fields = vec!["userEmail"];
    required_fields.extend_from_slice(required);

    json!({
        "type": "object",
        "properties": props,
        "required": required_fields,
    })
}

fn compose_schema(with_copies: bool) -> Value {
    let mut properties = json!({
        "to": {"type": "string", "description": "Recipients, comma-separated"},
        "subject": {"type": "string"},
        "body": {"type": "string", "description": "Plain-text body"},
        "threadId": {"type": "string", "description": "Thread to reply in"},
        "inReplyTo": {"type": "string", "description": "Message-ID header of the message replied to"}
    });
    if with_copies {
        properties["cc"] = json!({"type": "string", "description": "CC recipients, comma-separated"});
        properties["bcc"] = json!({"type": "string", "description": "BCC recipients, comma-separated"});
    }
    schema(properties, &["to", "subject", "body"])
}

fn tool_definitions() -> Vec<Tool> {
    let message_id = json!({"messageId": {"type": "string"}});
    let labels = json!({
        "messageId": {"type": "string"},
        "labelIds": {"type": "array", "items": {"type": "string"}, "minItems": 1}
    });

    vec![
        // Gmail
        tool_def(
            "gmail_search",
            "Gmail - Search",
            "Search messages with Gmail query syntax, e.g. \"from:alice is:unread newer_than:7d\".",
            schema(
                json!({
                    "query": {"type": "string", "description": "Gmail search query"},
                    "maxResults": {"type": "integer", "minimum": 1, "maximum": 50, "default": 10}
                }),
                &["query"],
            ),
        ),
        tool_def(
            "gmail_get",
            "Gmail - Read Message",
            "Read a message with headers and plain-text body.",
            schema(message_id.clone(), &["messageId"]),
        ),
        tool_def(
            "gmail_create_draft",
            "Gmail - Create Draft",
            "Create a draft without sending it.",
            compose_schema(false),
        ),
        tool_def(
            "gmail_send",
            "Gmail - Send",
            "Send a plain-text message from the user's account.",
            compose_schema(true),
        ),
        tool_def(
            "gmail_add_label",
            "Gmail - Add Labels",
            "Apply labels to a message.",
            schema(labels.clone(), &["messageId", "labelIds"]),
        ),
        tool_def(
            "gmail_remove_label",
            "Gmail - Remove Labels",
            "Remove labels from a message.",
            schema(labels, &["messageId", "labelIds"]),
        ),
        tool_def(
            "gmail_list_labels",
            "Gmail - List Labels",
            "List system and user labels with their IDs.",
            schema(json!({}), &[]),
        ),
        tool_def(
            "gmail_create_label",
            "Gmail - Create Label",
            "Create a user label, optionally colored.",
            schema(
                json!({
                    "name": {"type": "string"},
                    "backgroundColor": {"type": "string", "description": "Hex color, e.g. #16a765"},
                    "textColor": {"type": "string", "description": "Hex color, e.g. #ffffff"}
                }),
                &["name"],
            ),
        ),
        tool_def(
            "gmail_mark_as_read",
            "Gmail - Mark as Read",
            "Remove the UNREAD label from a message.",
            schema(message_id.clone(), &["messageId"]),
        ),
        tool_def(
            "gmail_trash",
            "Gmail - Trash",
            "Move a message to the trash.",
            schema(message_id, &["messageId"]),
        ),
        // Calendar
        tool_def(
            "calendar_get_events",
            "Google Calendar - Get Events",
            "List events of the primary calendar. Defaults to the next 7 days.",
            schema(
                json!({
                    "timeMin": {"type": "string", "description": "RFC 3339 start, defaults to now"},
                    "timeMax": {"type": "string", "description": "RFC 3339 end, defaults to now + 7 days"},
                    "maxResults": {"type": "integer", "minimum": 1, "maximum": 250, "default": 10}
                }),
                &[],
            ),
        ),
        tool_def(
            "calendar_create_event",
            "Google Calendar - Create Event",
            "Create an event. Attendees receive invitations.",
            schema(
                json!({
                    "summary": {"type": "string"},
                    "startTime": {"type": "string", "description": "RFC 3339, e.g. 2026-02-09T10:00:00+01:00"},
                    "endTime": {"type": "string", "description": "RFC 3339"},
                    "description": {"type": "string"},
                    "location": {"type": "string"},
                    "attendees": {"type": "array", "items": {"type": "string", "format": "email"}}
                }),
                &["summary", "startTime", "endTime"],
            ),
        ),
        tool_def(
            "calendar_update_event",
            "Google Calendar - Update Event",
            "Change only the given fields of an event.",
            schema(
                json!({
                    "eventId": {"type": "string"},
                    "summary": {"type": "string"},
                    "startTime": {"type": "string"},
                    "endTime": {"type": "string"},
                    "description": {"type": "string"},
                    "location": {"type": "string"}
                }),
                &["eventId"],
            ),
        ),
        tool_def(
            "calendar_delete_event",
            "Google Calendar - Delete Event",
            "Delete an event.",
            schema(json!({"eventId": {"type": "string"}}), &["eventId"]),
        ),
        tool_def(
            "calendar_find_free_slots",
            "Google Calendar - Find Free Slots",
            "Find free slots within working hours on weekdays, skipping existing events.",
            schema(
                json!({
                    "dateMin": {"type": "string", "description": "Start of search range, RFC 3339"},
                    "dateMax": {"type": "string", "description": "End of search range, RFC 3339"},
                    "durationMinutes": {"type": "integer", "minimum": 15, "maximum": 480, "default": 30},
                    "workingHoursStart": {"type": "integer", "minimum": 0, "maximum": 23, "default": 9},
                    "workingHoursEnd": {"type": "integer", "minimum": 1, "maximum": 24, "default": 17}
                }),
                &["dateMin", "dateMax"],
            ),
        ),
        // Drive
        tool_def(
            "drive_search",
            "Google Drive - Search Files",
            "Search files with Drive query syntax, e.g. \"name contains 'Offer'\" or \"fullText contains 'strategy'\".",
            schema(
                json!({
                    "query": {"type": "string"},
                    "maxResults": {"type": "integer", "minimum": 1, "maximum": 50, "default": 10}
                }),
                &["query"],
            ),
        ),
        tool_def(
            "drive_get_file",
            "Google Drive - Get File Content",
            "Read a file. Docs and Slides are exported as text, Sheets as CSV. Binary files return metadata only.",
            schema(json!({"fileId": {"type": "string"}}), &["fileId"]),
        ),
        tool_def(
            "drive_create_document",
            "Google Drive - Create Google Doc",
            "Create a Google Doc with text content.",
            schema(
                json!({
                    "title": {"type": "string"},
                    "content": {"type": "string"},
                    "folderId": {"type": "string"}
                }),
                &["title", "content"],
            ),
        ),
        tool_def(
            "drive_list_files",
            "Google Drive - List Files",
            "List non-trashed files, optionally within one folder.",
            schema(
                json!({
                    "folderId": {"type": "string"},
                    "maxResults": {"type": "integer", "minimum": 1, "maximum": 100, "default": 20}
                }),
                &[],
            ),
        ),
        tool_def(
            "drive_upload_file",
            "Google Drive - Upload File",
            "Upload text content as a new file.",
            schema(
                json!({
                    "name": {"type": "string"},
                    "content": {"type": "string"},
                    "mimeType": {"type": "string", "default": "text/plain"},
                    "folderId": {"type": "string"}
                }),
                &["name", "content"],
            ),
        ),
        tool_def(
            "drive_create_folder",
            "Google Drive - Create Folder",
            "Create a folder.",
            schema(
                json!({
                    "name": {"type": "string"},
                    "parentFolderId": {"type": "string"}
                }),
                &["name"],
            ),
        ),
        tool_def(
            "drive_move_file",
            "Google Drive - Move File",
            "Move a file into another folder.",
            schema(
                json!({
                    "fileId": {"type": "string"},
                    "newParentId": {"type": "string"}
                }),
                &["fileId", "newParentId"],
            ),
        ),
    ]
}
