// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) wires these modules together into the interactive client.
//
// Module responsibilities:
// - `config`: environment-driven settings.
// - `api`: HTTP interactions with the backend (login, upload, listing).
// - `session`: the credential, where it is stored and how a new one is
//   obtained.
// - `batch`: sequential batch upload with progress and per-file results.
// - `gallery`: photo records and the fetch-or-empty policy.
// - `ui`: terminal menus that drive the flows above.
pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod gallery;
pub mod session;
pub mod ui;
