// Photo records as returned by the list endpoint.
//
// The records are passed through as-is; the only thing computed here is a
// display size for photos the server has no dimensions for.

use crate::error::ApiError;
use crate::session::{Credential, CredentialStore};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const DEFAULT_WIDTH: u32 = 1500;
pub const DEFAULT_HEIGHT: u32 = 1000;

/// Status flags carried on every photo. Missing flags read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoFlags {
    pub is_trashed: bool,
    pub is_deleted: bool,
    pub is_starred: bool,
    pub is_encrypted: bool,
    pub is_locked: bool,
    pub is_protected: bool,
    pub is_archived: bool,
    pub is_shared: bool,
}

/// One image stored on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: u64,
    pub name: String,
    /// URL of the image resource; `None` when the server has no file.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_width: Option<u32>,
    #[serde(default)]
    pub image_height: Option<u32>,
    #[serde(default)]
    pub folder: Option<u64>,
    #[serde(flatten)]
    pub flags: PhotoFlags,
}

impl Photo {
    /// Width and height to lay the photo out with.
    pub fn display_size(&self) -> (u32, u32) {
        (
            self.image_width.unwrap_or(DEFAULT_WIDTH),
            self.image_height.unwrap_or(DEFAULT_HEIGHT),
        )
    }
}

/// Lists the photos stored on the server.
pub trait PhotoSource {
    fn list_photos(&self, credential: &Credential, folder: Option<u64>) -> Result<Vec<Photo>, ApiError>;
}

/// What a fetch produced. On failure `photos` is empty and `error` says why.
#[derive(Debug, Default)]
pub struct Gallery {
    pub photos: Vec<Photo>,
    pub error: Option<ApiError>,
}

/// Fetch the photo list, optionally only one folder. A failure is logged
/// and yields an empty gallery; a rejected token also clears `store`.
pub fn fetch_gallery<P, S>(
    source: &P,
    credential: &Credential,
    folder: Option<u64>,
    store: &S,
) -> Gallery
where
    P: PhotoSource + ?Sized,
    S: CredentialStore + ?Sized,
{
    match source.list_photos(credential, folder) {
        Ok(photos) => {
            info!(count = photos.len(), "images fetched");
            Gallery { photos, error: None }
        }
        Err(e) => {
            if matches!(e, ApiError::SessionExpired) {
                store.clear();
            }
            error!("Failed to fetch images: {e}");
            Gallery {
                photos: Vec::new(),
                error: Some(e),
            }
        }
    }
}
