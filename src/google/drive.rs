//! Drive and Docs operations

use serde_json::{json, Value};

use crate::config::google::mime;
use crate::error::Result;
use crate::google::client::GoogleClient;
use crate::google::types::*;
use crate::google::utils::truncate_chars;

/// File content returned by `get_file` is cut to this many characters
pub const MAX_CONTENT_CHARS: usize = 15_000;

const SEARCH_FIELDS: &str =
    "files(id, name, mimeType, modifiedTime, size, webViewLink, parents, owners)";
const LIST_FIELDS: &str = "files(id, name, mimeType, modifiedTime, size, webViewLink, parents)";
const META_FIELDS: &str = "id, name, mimeType, modifiedTime, size, webViewLink";
const CREATED_FIELDS: &str = "id, name, webViewLink";
const UPLOADED_FIELDS: &str = "id, name, mimeType, webViewLink";

/// How a file's readable content is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// Workspace file exported to the given MIME type
    Export(&'static str),
    /// Text file downloaded as-is
    Download,
    /// Nothing readable
    Binary,
}

impl ContentSource {
    pub fn for_mime(mime_type: &str) -> Self {
        match mime_type {
            mime::DOCUMENT | mime::PRESENTATION => ContentSource::Export("text/plain"),
            mime::SPREADSHEET => ContentSource::Export("text/csv"),
            "application/json" => ContentSource::Download,
            m if m.starts_with("text/") => ContentSource::Download,
            _ => ContentSource::Binary,
        }
    }
}

/// Quote a value for a Drive query string literal
fn quote_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub struct DriveApi<'a> {
    client: &'a GoogleClient,
}

impl<'a> DriveApi<'a> {
    pub fn new(client: &'a GoogleClient) -> Self {
        Self { client }
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.client.endpoints().drive)
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/{}", self.files_url(), urlencoding::encode(file_id))
    }

    async fn list(&self, query: &str, page_size: u32, fields: &str) -> Result<Vec<DriveFile>> {
        let list: DriveFileList = self
            .client
            .get_json(
                &self.files_url(),
                &[
                    ("q", query.to_string()),
                    ("pageSize", page_size.to_string()),
                    ("fields", fields.to_string()),
                    ("orderBy", "modifiedTime desc".to_string()),
                ],
            )
            .await?;
        Ok(list.files)
    }

    /// Search with Drive query syntax, newest first
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<DriveFile>> {
        self.list(query, max_results, SEARCH_FIELDS).await
    }

    /// Non-trashed files, optionally restricted to one folder
    pub async fn list_files(
        &self,
        folder_id: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<DriveFile>> {
        let query = match folder_id.filter(|f| !f.is_empty()) {
            Some(folder) => {
                format!("'{}' in parents and trashed = false", quote_query_value(folder))
            }
            None => "trashed = false".to_string(),
        };
        let mut files = self.list(&query, max_results, LIST_FIELDS).await?;
        for file in &mut files {
            file.parents = None;
        }
        Ok(files)
    }

    /// Metadata plus readable content
    pub async fn get_file(&self, file_id: &str) -> Result<DriveFileContent> {
        let url = self.file_url(file_id);
        let meta: DriveFile = self
            .client
            .get_json(&url, &[("fields", META_FIELDS.to_string())])
            .await?;

        let content = match ContentSource::for_mime(meta.mime_type.as_deref().unwrap_or("")) {
            ContentSource::Export(target) => {
                self.client
                    .get_text(&format!("{}/export", url), &[("mimeType", target.to_string())])
                    .await?
            }
            ContentSource::Download => {
                self.client
                    .get_text(&url, &[("alt", "media".to_string())])
                    .await?
            }
            ContentSource::Binary => format!(
                "[Binary file - cannot display content. Download at: {}]",
                meta.web_view_link.as_deref().unwrap_or("")
            ),
        };

        Ok(DriveFileContent {
            id: meta.id,
            name: meta.name,
            mime_type: meta.mime_type,
            modified_time: meta.modified_time,
            web_view_link: meta.web_view_link,
            content: truncate_chars(&content, MAX_CONTENT_CHARS),
        })
    }

    async fn create(&self, name: &str, mime_type: &str, parent: Option<&str>) -> Result<DriveFile> {
        let metadata = file_metadata(name, mime_type, parent);
        self.client
            .post_json(&self.files_url(), &[("fields", CREATED_FIELDS.to_string())], &metadata)
            .await
    }

    /// New Google Doc; non-blank content is inserted at the start
    pub async fn create_document(
        &self,
        title: &str,
        content: &str,
        folder_id: Option<&str>,
    ) -> Result<Value> {
        let file = self.create(title, mime::DOCUMENT, folder_id).await?;
        let file_id = file.id.clone().unwrap_or_default();

        if !content.trim().is_empty() {
            let url = format!(
                "{}/documents/{}:batchUpdate",
                self.client.endpoints().docs,
                urlencoding::encode(&file_id)
            );
            let request = json!({
                "requests": [
                    { "insertText": { "location": { "index": 1 }, "text": content } }
                ]
            });
            let _: Value = self.client.post_json(&url, &[], &request).await?;
        }

        tracing::info!(email = %self.client.email(), file_id = %file_id, "created document");
        Ok(json!({ "id": file_id, "name": file.name, "webViewLink": file.web_view_link }))
    }

    pub async fn upload_file(
        &self,
        name: &str,
        content: &str,
        mime_type: &str,
        folder_id: Option<&str>,
    ) -> Result<DriveFile> {
        let url = format!("{}/files", self.client.endpoints().drive_upload);
        let metadata = file_metadata(name, mime_type, folder_id);

        let file: DriveFile = self
            .client
            .upload_multipart(
                &url,
                &[
                    ("uploadType", "multipart".to_string()),
                    ("fields", UPLOADED_FIELDS.to_string()),
                ],
                &metadata,
                content,
                mime_type,
            )
            .await?;

        tracing::info!(email = %self.client.email(), file_id = ?file.id, "uploaded file");
        Ok(file)
    }

    pub async fn create_folder(
        &self,
        name: &str,
        parent_folder_id: Option<&str>,
    ) -> Result<DriveFile> {
        self.create(name, mime::FOLDER, parent_folder_id).await
    }

    /// Replace all current parents with `new_parent_id`
    pub async fn move_file(&self, file_id: &str, new_parent_id: &str) -> Result<Value> {
        let url = self.file_url(file_id);
        let current: DriveFile = self
            .client
            .get_json(&url, &[("fields", "id, name, parents".to_string())])
            .await?;
        let current_parents = current.parents.unwrap_or_default().join(",");

        let moved: DriveFile = self
            .client
            .patch_json(
                &url,
                &[
                    ("addParents", new_parent_id.to_string()),
                    ("removeParents", current_parents),
                    ("fields", "id, name, parents, webViewLink".to_string()),
                ],
                &json!({}),
            )
            .await?;

        Ok(json!({
            "id": moved.id,
            "name": moved.name,
            "newParent": new_parent_id,
            "webViewLink": moved.web_view_link,
            "moved": true,
        }))
    }
}

fn file_metadata(name: &str, mime_type: &str, parent: Option<&str>) -> Value {
    let mut metadata = json!({ "name": name, "mimeType": mime_type });
    if let Some(parent) = parent.filter(|p| !p.is_empty()) {
        metadata["parents"] = json!([parent]);
    }
    metadata
}
