// Sequential batch upload.
//
// Files are sent one at a time, in the order they were selected. Each
// finished file produces exactly one `UploadResult`; a failing file is
// recorded and the batch moves on. The one exception is a rejected token:
// the stored credential is cleared and the whole batch stops.

use crate::error::{ApiError, BatchError};
use crate::session::{Credential, CredentialStore};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FALLBACK_NAME: &str = "Uploaded image";

/// A selected file and the name it is uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    path: PathBuf,
    name: String,
}

impl UploadItem {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Use the file name as the display name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Success,
    Error,
}

/// Outcome of one file in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub file: String,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    pub fn success(file: impl Into<String>, data: Value) -> Self {
        Self {
            file: file.into(),
            status: UploadStatus::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: UploadStatus::Error,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UploadStatus::Success
    }

    /// Server-assigned id of the uploaded image, when the response has one.
    pub fn remote_id(&self) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get("id"))
    }
}

/// Progress of the current batch.
///
/// `results.len() == completed` and `completed <= total` hold after every
/// update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub current: Option<String>,
    pub results: Vec<UploadResult>,
}

impl BatchProgress {
    fn start(items: &[UploadItem]) -> Self {
        Self {
            total: items.len(),
            completed: 0,
            current: items.first().map(|i| i.name.clone()),
            results: Vec::with_capacity(items.len()),
        }
    }

    fn record(&mut self, result: UploadResult) {
        debug_assert!(self.completed < self.total);
        self.results.push(result);
        self.completed += 1;
    }

    pub fn is_done(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Rounded completion percentage; 0 for an empty batch.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u8
    }

    pub fn reset(&mut self) {
        *self = BatchProgress::default();
    }
}

/// Sends a single file to the backend.
pub trait ImageUploader {
    fn upload(&self, item: &UploadItem, credential: &Credential) -> Result<Value, ApiError>;
}

/// Upload `items` in order and return the final progress.
///
/// `on_progress` sees every intermediate state: once when an item becomes
/// current and once when its result is recorded. A rejected token clears
/// `store` and ends the run with `BatchError::SessionExpired`; the failing
/// item is not recorded.
pub fn run_batch<U, S, F>(
    items: &[UploadItem],
    credential: &Credential,
    uploader: &U,
    store: &S,
    mut on_progress: F,
) -> Result<BatchProgress, BatchError>
where
    U: ImageUploader + ?Sized,
    S: CredentialStore + ?Sized,
    F: FnMut(&BatchProgress),
{
    if items.is_empty() {
        return Err(BatchError::Empty);
    }

    let mut progress = BatchProgress::start(items);
    info!(total = progress.total, "starting upload batch");
    on_progress(&progress);

    for item in items {
        progress.current = Some(item.name.clone());
        on_progress(&progress);
        debug!(file = %item.name, path = %item.path.display(), "uploading");

        match uploader.upload(item, credential) {
            Ok(data) => {
                progress.record(UploadResult::success(&item.name, data));
            }
            Err(ApiError::SessionExpired) => {
                warn!(
                    file = %item.name,
                    completed = progress.completed,
                    "session expired, aborting batch"
                );
                store.clear();
                return Err(BatchError::SessionExpired { progress });
            }
            Err(e) => {
                warn!(file = %item.name, "upload failed: {e}");
                progress.record(UploadResult::error(&item.name, upload_message(e)));
            }
        }
        on_progress(&progress);
    }

    progress.current = None;
    info!(
        succeeded = progress.succeeded(),
        failed = progress.failed(),
        "upload batch finished"
    );
    on_progress(&progress);
    Ok(progress)
}

fn upload_message(err: ApiError) -> String {
    match err {
        ApiError::Upload(msg) => msg,
        other => format!("Upload failed: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryCredentialStore;
    use serde_json::json;
    use std::sync::Mutex;

    enum Reply {
        Ok,
        Fail,
        Unauthorized,
    }

    struct ScriptedUploader {
        replies: Mutex<Vec<Reply>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedUploader {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl ImageUploader for ScriptedUploader {
        fn upload(&self, item: &UploadItem, _credential: &Credential) -> Result<Value, ApiError> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(item.name().to_string());
            let n = seen.len();
            match self.replies.lock().unwrap().remove(0) {
                Reply::Ok => Ok(json!({ "id": n, "image": format!("/media/{}", item.name()) })),
                Reply::Fail => Err(ApiError::Upload("Upload failed: bad image".into())),
                Reply::Unauthorized => Err(ApiError::SessionExpired),
            }
        }
    }

    fn items(names: &[&str]) -> Vec<UploadItem> {
        names
            .iter()
            .map(|n| UploadItem::new(format!("/photos/{n}"), *n))
            .collect()
    }

    fn token() -> Credential {
        Credential::new("k").unwrap()
    }

    #[test]
    fn all_succeed() {
        let uploader = ScriptedUploader::new(vec![Reply::Ok, Reply::Ok, Reply::Ok]);
        let store = MemoryCredentialStore::with(token());
        let progress = run_batch(&items(&["a.jpg", "b.jpg", "c.jpg"]), &token(), &uploader, &store, |_| {})
            .unwrap();

        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 3);
        assert_eq!(progress.results.len(), 3);
        assert!(progress.results.iter().all(|r| r.is_success()));
        assert_eq!(progress.results[1].remote_id(), Some(&json!(2)));
        assert!(progress.is_done());
        assert!(progress.current.is_none());
        assert!(store.load().is_some());
    }

    #[test]
    fn generic_failure_does_not_stop_batch() {
        let uploader = ScriptedUploader::new(vec![Reply::Ok, Reply::Fail, Reply::Ok]);
        let store = MemoryCredentialStore::with(token());
        let progress = run_batch(&items(&["a.jpg", "b.jpg", "c.jpg"]), &token(), &uploader, &store, |_| {})
            .unwrap();

        let statuses: Vec<_> = progress.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![UploadStatus::Success, UploadStatus::Error, UploadStatus::Success]
        );
        assert_eq!(progress.results[1].error.as_deref(), Some("Upload failed: bad image"));
        assert_eq!(progress.completed, 3);
        assert_eq!(progress.succeeded(), 2);
        assert_eq!(progress.failed(), 1);
        assert_eq!(uploader.seen(), vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn unauthorized_aborts_and_clears_credential() {
        let uploader = ScriptedUploader::new(vec![Reply::Ok, Reply::Unauthorized, Reply::Ok]);
        let store = MemoryCredentialStore::with(token());
        let err = run_batch(&items(&["a.jpg", "b.jpg", "c.jpg"]), &token(), &uploader, &store, |_| {})
            .unwrap_err();

        match err {
            BatchError::SessionExpired { progress } => {
                assert_eq!(progress.results.len(), 1);
                assert_eq!(progress.completed, 1);
                assert!(progress.completed < progress.total);
                assert!(progress.results[0].is_success());
                assert_eq!(progress.current.as_deref(), Some("b.jpg"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.load().is_none());
        // Third item never attempted.
        assert_eq!(uploader.seen(), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn unauthorized_on_first_item_records_nothing() {
        let uploader = ScriptedUploader::new(vec![Reply::Unauthorized]);
        let store = MemoryCredentialStore::with(token());
        let err = run_batch(&items(&["a.jpg", "b.jpg"]), &token(), &uploader, &store, |_| {}).unwrap_err();
        let BatchError::SessionExpired { progress } = err else {
            panic!("expected session expiry");
        };
        assert!(progress.results.is_empty());
        assert_eq!(progress.total, 2);
    }

    #[test]
    fn other_errors_get_prefixed_message() {
        struct IoFail;
        impl ImageUploader for IoFail {
            fn upload(&self, _: &UploadItem, _: &Credential) -> Result<Value, ApiError> {
                Err(ApiError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing")))
            }
        }
        let store = MemoryCredentialStore::new();
        let progress = run_batch(&items(&["x.png"]), &token(), &IoFail, &store, |_| {}).unwrap();
        let msg = progress.results[0].error.as_deref().unwrap();
        assert!(msg.starts_with("Upload failed: I/O error"), "{msg}");
    }

    #[test]
    fn empty_batch_is_rejected() {
        let uploader = ScriptedUploader::new(vec![]);
        let store = MemoryCredentialStore::new();
        let err = run_batch(&[], &token(), &uploader, &store, |_| {}).unwrap_err();
        assert!(matches!(err, BatchError::Empty));
        assert!(uploader.seen().is_empty());
    }

    #[test]
    fn progress_updates_are_monotonic_and_consistent() {
        let uploader = ScriptedUploader::new(vec![Reply::Fail, Reply::Ok, Reply::Ok, Reply::Fail]);
        let store = MemoryCredentialStore::new();
        let mut snapshots = Vec::new();
        run_batch(
            &items(&["1.jpg", "2.jpg", "3.jpg", "4.jpg"]),
            &token(),
            &uploader,
            &store,
            |p| snapshots.push(p.clone()),
        )
        .unwrap();

        let first = &snapshots[0];
        assert_eq!(first.completed, 0);
        assert_eq!(first.current.as_deref(), Some("1.jpg"));

        let mut last = 0;
        for snap in &snapshots {
            assert_eq!(snap.results.len(), snap.completed);
            assert!(snap.completed <= snap.total);
            assert!(snap.completed == last || snap.completed == last + 1);
            last = snap.completed;
        }
        assert_eq!(last, 4);
        assert_eq!(snapshots.last().unwrap().percent(), 100);
    }

    #[test]
    fn from_path_uses_file_name() {
        let item = UploadItem::from_path("/home/me/Pictures/beach.png");
        assert_eq!(item.name(), "beach.png");
        let item = UploadItem::from_path("/");
        assert_eq!(item.name(), "Uploaded image");
    }

    #[test]
    fn percent_and_reset() {
        let mut p = BatchProgress {
            total: 3,
            completed: 1,
            current: Some("a".into()),
            results: vec![UploadResult::success("a", json!({}))],
        };
        assert_eq!(p.percent(), 33);
        assert!(!p.is_done());
        p.reset();
        assert_eq!(p, BatchProgress::default());
        assert_eq!(p.percent(), 0);
    }

    #[test]
    fn result_serializes_lowercase_status() {
        let r = UploadResult::error("a.jpg", "Upload failed: nope");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, json!({ "file": "a.jpg", "status": "error", "error": "Upload failed: nope" }));
    }
}
