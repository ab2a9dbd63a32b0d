// API client module: a small blocking HTTP client for the TIMEMINE
// backend. It covers the three calls the CLI needs: login, image upload
// and image listing.

use crate::batch::{ImageUploader, UploadItem};
use crate::config::Config;
use crate::error::ApiError;
use crate::gallery::{Photo, PhotoSource};
use crate::session::Credential;
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Blocking client holding the reqwest client (with its cookie jar), the
/// API root and the settings needed to authorize requests.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth_scheme: String,
    folder_id: u64,
}

/// Login request payload.
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of a successful login. Some deployments name the field `token`.
#[derive(Deserialize, Debug)]
struct LoginResponse {
    #[serde(alias = "token")]
    key: String,
}

impl ApiClient {
    /// Build a client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(ApiClient {
            client: builder.build()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            auth_scheme: config.auth_scheme.clone(),
            folder_id: config.folder_id,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Folder new uploads go to.
    pub fn folder_id(&self) -> u64 {
        self.folder_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder, credential: &Credential) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("{} {}", self.auth_scheme, credential.as_str()))
    }

    /// Exchange a username and password for a session token.
    pub fn login(&self, req: &LoginRequest) -> Result<Credential, ApiError> {
        let url = self.url("dj-rest-auth/login/");
        debug!(%url, user = %req.username, "logging in");
        let res = self.client.post(&url).json(req).send()?;
        if !res.status().is_success() {
            return Err(ApiError::Authentication(failure_detail(res)));
        }
        let body: LoginResponse = res.json()?;
        Credential::new(body.key)
            .ok_or_else(|| ApiError::Authentication("server returned an empty token".into()))
    }

    /// Upload one image as multipart/form-data with its display name and
    /// destination folder. Returns the server's JSON response untouched.
    pub fn upload_image(
        &self,
        item: &UploadItem,
        credential: &Credential,
        folder_id: u64,
    ) -> Result<Value, ApiError> {
        let url = self.url("images/");

        let file = File::open(item.path())?;
        let length = file.metadata()?.len();
        let file_name = item
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| item.name().to_string());
        let part = multipart::Part::reader_with_length(file, length)
            .file_name(file_name)
            .mime_str(guess_mime(item.path()))?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("name", item.name().to_string())
            .text("folder", folder_id.to_string());

        let sent = self
            .authorized(self.client.post(&url), credential)
            .multipart(form)
            .send();
        let res = match sent {
            Ok(res) => res,
            // A server that rejects the token may answer before reading the
            // body and hang up, which surfaces as a body error instead of a
            // 401. Ask again with an empty request to find out.
            Err(e) if !e.is_timeout() && self.session_rejected(credential) => {
                debug!("upload broke off, server rejects the token: {e}");
                return Err(ApiError::SessionExpired);
            }
            Err(e) => return Err(e.into()),
        };
        if res.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::SessionExpired);
        }
        if !res.status().is_success() {
            return Err(ApiError::Upload(format!("Upload failed: {}", failure_detail(res))));
        }
        Ok(res.json()?)
    }

    /// True when a bodyless authorized request to the images endpoint is
    /// answered with 401.
    fn session_rejected(&self, credential: &Credential) -> bool {
        self.authorized(self.client.head(self.url("images/")), credential)
            .send()
            .map(|res| res.status() == StatusCode::UNAUTHORIZED)
            .unwrap_or(false)
    }

    /// List images, optionally only those in `folder`.
    ///
    /// Records that don't parse are skipped with a warning so one odd entry
    /// doesn't empty the whole gallery.
    pub fn list_images(
        &self,
        credential: &Credential,
        folder: Option<u64>,
    ) -> Result<Vec<Photo>, ApiError> {
        let url = self.url("images/");
        let mut req = self.authorized(self.client.get(&url), credential);
        if let Some(folder) = folder {
            req = req.query(&[("folder", folder)]);
        }

        let res = req.send()?;
        if res.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::SessionExpired);
        }
        if !res.status().is_success() {
            return Err(ApiError::Fetch(failure_detail(res)));
        }
        let records: Vec<Value> = res
            .json()
            .map_err(|e| ApiError::Fetch(format!("unexpected response: {e}")))?;
        let photos = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Photo>(record) {
                Ok(photo) => Some(photo),
                Err(e) => {
                    warn!("skipping unreadable photo record: {e}");
                    None
                }
            })
            .collect();
        Ok(photos)
    }
}

impl PhotoSource for ApiClient {
    fn list_photos(&self, credential: &Credential, folder: Option<u64>) -> Result<Vec<Photo>, ApiError> {
        self.list_images(credential, folder)
    }
}

impl ImageUploader for ApiClient {
    fn upload(&self, item: &UploadItem, credential: &Credential) -> Result<Value, ApiError> {
        self.upload_image(item, credential, self.folder_id)
    }
}

fn failure_detail(res: Response) -> String {
    let status = res.status();
    let body = res.text().unwrap_or_default();
    error_detail(status, &body)
}

/// Pull a human-readable message out of an error body: `detail`, then the
/// first `non_field_errors` entry, then the first message of any field.
/// Falls back to the status line.
fn error_detail(status: StatusCode, body: &str) -> String {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return status.to_string();
    };
    if let Some(Value::String(detail)) = map.get("detail") {
        return detail.clone();
    }
    if let Some(msg) = first_message(map.get("non_field_errors")) {
        return msg;
    }
    map.iter()
        .find_map(|(field, v)| first_message(Some(v)).map(|m| format!("{field}: {m}")))
        .unwrap_or_else(|| status.to_string())
}

fn first_message(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|i| i.as_str().map(str::to_string)),
        _ => None,
    }
}

/// MIME type from the file extension; the backend only needs a hint.
fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
