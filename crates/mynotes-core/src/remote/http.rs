//! JSON-over-HTTP client for the notes REST service.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{RemoteError, RemoteResult, RemoteService};
use crate::models::{
    DeleteAck, Folder, FolderDraft, FolderId, FolderPatch, Note, NoteDraft, NoteId, NotePatch,
};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// HTTP client for the folders/notes endpoints under one base URL.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: String,
    client: Client,
}

impl HttpRemote {
    /// Build a client for `base_url` (e.g. `http://localhost:8000/api`).
    ///
    /// Every request is bounded by `timeout`; expiry surfaces as
    /// [`RemoteError::Http`] like any other transport failure.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| {
            RemoteError::Decode(format!("{error}: {}", compact_text(&body)))
        })
    }
}

impl RemoteService for HttpRemote {
    async fn health(&self) -> RemoteResult<()> {
        let _: serde_json::Value = self.send_json(self.client.get(self.url("/health"))).await?;
        Ok(())
    }

    async fn list_folders(&self) -> RemoteResult<Vec<Folder>> {
        self.send_json(self.client.get(self.url("/folders"))).await
    }

    async fn create_folder(&self, draft: &FolderDraft) -> RemoteResult<Folder> {
        self.send_json(self.client.post(self.url("/folders")).json(draft))
            .await
    }

    async fn update_folder(&self, id: FolderId, patch: &FolderPatch) -> RemoteResult<Folder> {
        self.send_json(
            self.client
                .put(self.url(&format!("/folders/{id}")))
                .json(patch),
        )
        .await
    }

    async fn delete_folder(&self, id: FolderId) -> RemoteResult<DeleteAck> {
        self.send_json(self.client.delete(self.url(&format!("/folders/{id}"))))
            .await
    }

    async fn list_notes(&self, folder_id: Option<FolderId>) -> RemoteResult<Vec<Note>> {
        let mut request = self.client.get(self.url("/notes"));
        if let Some(folder_id) = folder_id {
            request = request.query(&[("folder_id", folder_id.get())]);
        }
        self.send_json(request).await
    }

    async fn create_note(&self, draft: &NoteDraft) -> RemoteResult<Note> {
        self.send_json(self.client.post(self.url("/notes")).json(draft))
            .await
    }

    async fn update_note(&self, id: NoteId, patch: &NotePatch) -> RemoteResult<Note> {
        self.send_json(self.client.put(self.url(&format!("/notes/{id}"))).json(patch))
            .await
    }

    async fn delete_note(&self, id: NoteId) -> RemoteResult<DeleteAck> {
        self.send_json(self.client.delete(self.url(&format!("/notes/{id}"))))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let message = parse_error_message(body);
    if status == StatusCode::NOT_FOUND {
        RemoteError::NotFound(message)
    } else {
        RemoteError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

fn parse_error_message(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = payload.detail.or(payload.message).or(payload.error) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("API base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("localhost:8000/api".to_string()).is_err());
    }

    #[test]
    fn normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url(" http://localhost:8000/api/ ".to_string()).unwrap(),
            "http://localhost:8000/api"
        );
    }

    #[test]
    fn status_error_maps_not_found() {
        let error = status_error(StatusCode::NOT_FOUND, r#"{"detail":"Note not found"}"#);
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "Remote record not found: Note not found");
    }

    #[test]
    fn status_error_keeps_status_and_plain_body() {
        let error = status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(
            error,
            RemoteError::Status { status: 500, ref message } if message == "boom"
        ));
    }

    #[test]
    fn parse_error_message_handles_empty_body() {
        assert_eq!(parse_error_message("   "), "empty response body");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let remote = HttpRemote::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let error = remote.list_folders().await.unwrap_err();
        assert!(matches!(error, RemoteError::Http(_)));
    }
}
