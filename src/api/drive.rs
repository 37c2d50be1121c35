use super::transport::{send_resilient, HttpRequest, HttpResponse, Transport};
use super::EnvConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::export::dto_to_json;
use crate::models::{DocumentDto, DriveFile, DriveFolder};
use crate::retry::{CancelToken, Clock, ResilientCaller};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub(crate) const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub(crate) const ROOT_FOLDER_NAME: &str = "Root (My Drive)";
pub(crate) const APP_FOLDER_NAME: &str = "Pillar Editor";
pub(crate) const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

const MULTIPART_BOUNDARY: &str = "pillar_editor_boundary";
const DOCUMENT_QUERY: &str = "mimeType = 'application/json' and trashed = false";

/// Where new documents are saved. `id: None` is the account root.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct FolderSelection {
    pub id: Option<String>,
    pub name: String,
}

impl Default for FolderSelection {
    fn default() -> Self {
        Self {
            id: None,
            name: ROOT_FOLDER_NAME.to_string(),
        }
    }
}

/// Persisted part of a storage session.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DriveAccount {
    pub token: Option<String>,
    #[serde(default)]
    pub folder: FolderSelection,
}

pub(crate) type FileId = String;

/// `multipart/related` upload body: JSON metadata part, then the file part.
pub(crate) fn multipart_related_body(boundary: &str, metadata: &Value, content: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
         --{boundary}\r\nContent-Type: application/json\r\n\r\n{content}\r\n\
         --{boundary}--"
    )
}

pub(crate) fn parse_file_list(data: &Value) -> Vec<DriveFile> {
    files_of(data)
        .filter_map(|item| {
            let get_s = |k: &str| item.get(k).and_then(|v| v.as_str()).map(|s| s.to_string());
            let id = get_s("id").filter(|s| !s.trim().is_empty())?;
            Some(DriveFile {
                id,
                name: get_s("name").unwrap_or_default(),
                modified_time: get_s("modifiedTime").unwrap_or_default(),
            })
        })
        .collect()
}

pub(crate) fn parse_folder_list(data: &Value) -> Vec<DriveFolder> {
    files_of(data)
        .filter_map(|item| serde_json::from_value::<DriveFolder>(item.clone()).ok())
        .filter(|f| !f.id.trim().is_empty())
        .collect()
}

fn files_of(data: &Value) -> impl Iterator<Item = &Value> {
    data.get("files")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
}

/// Authenticated document storage on the user's Drive.
///
/// Every call goes through the [`ResilientCaller`]. A 401 clears the token,
/// so the UI falls back to asking the user to sign in again.
pub(crate) struct DriveSession<T, C> {
    transport: T,
    caller: ResilientCaller<C>,
    account: DriveAccount,
    api_url: String,
    upload_url: String,
}

impl<T: Transport, C: Clock> DriveSession<T, C> {
    pub fn new(transport: T, caller: ResilientCaller<C>, config: &EnvConfig, account: DriveAccount) -> Self {
        Self {
            transport,
            caller,
            account,
            api_url: config.drive_api_url.clone(),
            upload_url: config.drive_upload_url.clone(),
        }
    }

    pub fn into_account(self) -> DriveAccount {
        self.account
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.token.is_some()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.account.token = (!token.trim().is_empty()).then_some(token);
    }

    pub fn sign_out(&mut self) {
        self.account.token = None;
    }

    pub fn select_folder(&mut self, id: Option<String>, name: impl Into<String>) {
        self.account.folder = FolderSelection {
            id,
            name: name.into(),
        };
    }

    pub fn folder(&self) -> &FolderSelection {
        &self.account.folder
    }

    async fn send(&mut self, cancel: &CancelToken, request: HttpRequest) -> RemoteResult<HttpResponse> {
        let token = self
            .account
            .token
            .clone()
            .ok_or(RemoteError::Unauthenticated)?;
        let result = send_resilient(&self.transport, &self.caller, cancel, request.bearer(&token)).await;

        match result {
            Err(e) if e.is_unauthorized() => {
                log::warn!("storage token rejected; signing out");
                self.sign_out();
                Err(RemoteError::Unauthenticated)
            }
            other => other,
        }
    }

    /// Uploads the document as a new JSON file and returns its id.
    pub async fn save(
        &mut self,
        cancel: &CancelToken,
        doc: &DocumentDto,
        filename: &str,
        folder_id: Option<&str>,
    ) -> RemoteResult<FileId> {
        let mut metadata = json!({ "name": filename, "mimeType": "application/json" });
        if let Some(folder) = folder_id.filter(|f| !f.is_empty()) {
            metadata["parents"] = json!([folder]);
        }
        let body = multipart_related_body(MULTIPART_BOUNDARY, &metadata, &dto_to_json(doc));
        let request = HttpRequest::post(format!("{}/files?uploadType=multipart", self.upload_url)).body(
            format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            body,
        );

        let data: Value = self.send(cancel, request).await?.json()?;
        data.get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| RemoteError::parse("upload response has no file id"))
    }

    pub async fn list_saved_documents(&mut self, cancel: &CancelToken) -> RemoteResult<Vec<DriveFile>> {
        let url = format!(
            "{}/files?q={}&fields=files(id,name,modifiedTime)",
            self.api_url,
            urlencoding::encode(DOCUMENT_QUERY)
        );
        let data: Value = self.send(cancel, HttpRequest::get(url)).await?.json()?;
        Ok(parse_file_list(&data))
    }

    /// Raw document JSON; importing it is the caller's concern.
    pub async fn load_document(&mut self, cancel: &CancelToken, file_id: &str) -> RemoteResult<Value> {
        let url = format!("{}/files/{}?alt=media", self.api_url, urlencoding::encode(file_id));
        self.send(cancel, HttpRequest::get(url)).await?.json()
    }

    pub async fn list_folders(&mut self, cancel: &CancelToken) -> RemoteResult<Vec<DriveFolder>> {
        let query = format!("mimeType = '{FOLDER_MIME_TYPE}' and trashed = false");
        let url = format!(
            "{}/files?q={}&fields=files(id,name)",
            self.api_url,
            urlencoding::encode(&query)
        );
        let data: Value = self.send(cancel, HttpRequest::get(url)).await?.json()?;
        Ok(parse_folder_list(&data))
    }

    pub async fn create_folder(&mut self, cancel: &CancelToken, name: &str) -> RemoteResult<DriveFolder> {
        let request = HttpRequest::post(format!("{}/files", self.api_url))
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME_TYPE }));
        let data: Value = self.send(cancel, request).await?.json()?;
        let id = data
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RemoteError::parse("create response has no folder id"))?;
        Ok(DriveFolder {
            id: id.to_string(),
            name: data
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or(name)
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::testing::ScriptedTransport;
    use crate::api::transport::Method;
    use crate::models::{PillarDto, SubsectionDto};
    use crate::retry::testing::ManualClock;
    use crate::retry::RetryPolicy;
    use futures::executor::block_on;

    fn session(transport: ScriptedTransport, token: Option<&str>) -> DriveSession<ScriptedTransport, ManualClock> {
        DriveSession::new(
            transport,
            ResilientCaller::new(ManualClock::default(), RetryPolicy::default()),
            &EnvConfig::default(),
            DriveAccount {
                token: token.map(|t| t.to_string()),
                folder: FolderSelection::default(),
            },
        )
    }

    fn sample_doc() -> DocumentDto {
        DocumentDto {
            main_title: "Gem".to_string(),
            pillars: vec![PillarDto {
                title: "Context".to_string(),
                color_set: None,
                is_closed: false,
                subsections: vec![SubsectionDto {
                    title: "Role".to_string(),
                    content: "Assistant".to_string(),
                    is_closed: false,
                }],
            }],
        }
    }

    #[test]
    fn test_session_state() {
        let mut s = session(ScriptedTransport::new(), None);
        assert!(!s.is_authenticated());
        assert_eq!(s.folder().name, ROOT_FOLDER_NAME);

        s.set_token("abc");
        assert!(s.is_authenticated());
        s.select_folder(Some("f1".to_string()), "Prompts");
        assert_eq!(s.folder().id.as_deref(), Some("f1"));

        s.sign_out();
        assert!(!s.is_authenticated());
        assert_eq!(s.into_account().folder.name, "Prompts");
    }

    #[test]
    fn test_save_without_token_is_unauthenticated() {
        let mut s = session(ScriptedTransport::new(), None);
        let err = block_on(s.save(&CancelToken::never(), &sample_doc(), "a.json", None)).unwrap_err();
        assert_eq!(err, RemoteError::Unauthenticated);
        assert!(s.transport.requests().is_empty());
    }

    #[test]
    fn test_save_uploads_multipart_with_parent() {
        let mut s = session(ScriptedTransport::new().respond(200, r#"{"id":"file-1"}"#), Some("tok"));
        let id = block_on(s.save(&CancelToken::never(), &sample_doc(), "gem_010124-1200.json", Some("folder-9")))
            .unwrap();
        assert_eq!(id, "file-1");

        let req = &s.transport.requests()[0];
        assert_eq!(req.method, Method::Post);
        assert_eq!(
            req.url,
            "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart"
        );
        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
        let body = req.body.as_ref().unwrap();
        assert_eq!(
            body.content_type,
            format!("multipart/related; boundary={MULTIPART_BOUNDARY}")
        );
        assert!(body.content.contains(r#""parents":["folder-9"]"#));
        assert!(body.content.contains("\"mainTitle\": \"Gem\""));
        assert!(body.content.ends_with(&format!("--{MULTIPART_BOUNDARY}--")));
    }

    #[test]
    fn test_save_missing_id_is_parse_error() {
        let mut s = session(ScriptedTransport::new().respond(200, "{}"), Some("tok"));
        let err = block_on(s.save(&CancelToken::never(), &sample_doc(), "a.json", None)).unwrap_err();
        assert!(matches!(err, RemoteError::Parse(_)));
    }

    #[test]
    fn test_list_saved_documents_query() {
        let body = r#"{"files":[{"id":"1","name":"a.json","modifiedTime":"2024-01-01T00:00:00Z"},{"name":"no id"}]}"#;
        let mut s = session(ScriptedTransport::new().respond(200, body), Some("tok"));
        let files = block_on(s.list_saved_documents(&CancelToken::never())).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.json");
        assert_eq!(files[0].modified_time, "2024-01-01T00:00:00Z");

        let url = &s.transport.requests()[0].url;
        assert!(url.starts_with("https://www.googleapis.com/drive/v3/files?q=mimeType%20%3D%20%27application%2Fjson%27"));
        assert!(url.ends_with("&fields=files(id,name,modifiedTime)"));
    }

    #[test]
    fn test_list_failure_is_surfaced() {
        let mut s = session(ScriptedTransport::new().respond(500, "boom"), Some("tok"));
        let err = block_on(s.list_saved_documents(&CancelToken::never())).unwrap_err();
        assert_eq!(
            err,
            RemoteError::Permanent {
                status: 500,
                body: "boom".to_string()
            }
        );
        assert!(s.is_authenticated());
    }

    #[test]
    fn test_unauthorized_clears_token() {
        let mut s = session(ScriptedTransport::new().respond(401, "expired"), Some("tok"));
        let err = block_on(s.load_document(&CancelToken::never(), "abc")).unwrap_err();
        assert_eq!(err, RemoteError::Unauthenticated);
        assert!(!s.is_authenticated());
    }

    #[test]
    fn test_load_document_returns_raw_json() {
        let mut s = session(
            ScriptedTransport::new().respond(200, r#"{"mainTitle":"X","pillars":[]}"#),
            Some("tok"),
        );
        let v = block_on(s.load_document(&CancelToken::never(), "id/1")).unwrap();
        assert_eq!(v["mainTitle"], "X");
        assert_eq!(
            s.transport.requests()[0].url,
            "https://www.googleapis.com/drive/v3/files/id%2F1?alt=media"
        );
    }

    #[test]
    fn test_folders() {
        let mut s = session(
            ScriptedTransport::new()
                .respond(200, r#"{"files":[{"id":"f1","name":"Prompts"},{"id":"","name":"bad"}]}"#)
                .respond(200, r#"{"id":"f2","name":"Pillar Editor"}"#),
            Some("tok"),
        );
        let folders = block_on(s.list_folders(&CancelToken::never())).unwrap();
        assert_eq!(
            folders,
            vec![DriveFolder {
                id: "f1".to_string(),
                name: "Prompts".to_string()
            }]
        );

        let created = block_on(s.create_folder(&CancelToken::never(), APP_FOLDER_NAME)).unwrap();
        assert_eq!(created.id, "f2");
        let req = &s.transport.requests()[1];
        assert!(req.body.as_ref().unwrap().content.contains(FOLDER_MIME_TYPE));
    }
}
