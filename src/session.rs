// Session handling: the credential type, where it is kept between runs,
// and how a fresh one is obtained when none is stored.

use crate::error::ApiError;
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Opaque token returned by the login endpoint and sent with every
/// authorized request. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token. Blank tokens are rejected.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(Credential(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep tokens out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Somewhere a credential lives for the duration of a session.
pub trait CredentialStore {
    fn load(&self) -> Option<Credential>;
    fn save(&self, credential: &Credential) -> Result<(), ApiError>;
    fn clear(&self);
}

/// Supplies a credential when the store has none, typically by asking the
/// user for a username and password and calling the login endpoint.
pub trait CredentialProvider {
    fn obtain(&mut self) -> Result<Credential, ApiError>;
}

/// Return the stored credential, or obtain and store a new one.
pub fn ensure_credential<S, P>(store: &S, provider: &mut P) -> Result<Credential, ApiError>
where
    S: CredentialStore + ?Sized,
    P: CredentialProvider + ?Sized,
{
    if let Some(credential) = store.load() {
        return Ok(credential);
    }
    debug!("no stored credential, asking provider");
    let credential = provider.obtain()?;
    store.save(&credential)?;
    Ok(credential)
}

/// Persists the token in a small file, the terminal counterpart of a
/// browser auth cookie.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<Credential> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        Credential::new(data)
    }

    fn save(&self, credential: &Credential) -> Result<(), ApiError> {
        std::fs::write(&self.path, credential.as_str())?;
        Ok(())
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "token file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "could not remove token file: {e}"),
        }
    }
}

/// Holds the credential in memory only.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: RefCell<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credential: Credential) -> Self {
        Self {
            slot: RefCell::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<Credential> {
        self.slot.borrow().clone()
    }

    fn save(&self, credential: &Credential) -> Result<(), ApiError> {
        *self.slot.borrow_mut() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) {
        self.slot.borrow_mut().take();
    }
}
