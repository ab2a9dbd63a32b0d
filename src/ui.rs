// UI layer: a simple interactive menu using `dialoguer`.
// The flows are small and synchronous; every network call blocks until
// the backend answers.

use crate::api::{ApiClient, LoginRequest};
use crate::batch::{run_batch, BatchProgress, UploadItem};
use crate::error::{ApiError, BatchError};
use crate::gallery::fetch_gallery;
use crate::session::{ensure_credential, Credential, CredentialProvider, CredentialStore};
use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "heic"];

/// Asks for a username and password on the terminal and logs in.
pub struct PromptCredentialProvider<'a> {
    api: &'a ApiClient,
}

impl<'a> PromptCredentialProvider<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }
}

impl CredentialProvider for PromptCredentialProvider<'_> {
    fn obtain(&mut self) -> Result<Credential, ApiError> {
        let username: String = Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(ApiError::Io)?;
        let password: String = Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(ApiError::Io)?;
        let credential = self.api.login(&LoginRequest { username, password })?;
        println!("{}", "Login successful".green());
        Ok(credential)
    }
}

/// Main interactive menu. Runs until the user chooses "Exit".
pub fn main_menu<S: CredentialStore>(api: ApiClient, store: S) -> Result<()> {
    loop {
        let logged_in = store.load().is_some();
        let items = [
            if logged_in { "Login (again)" } else { "Login" },
            "Upload images",
            "List photos",
            "Logout",
            "Exit",
        ];
        let selection = Select::new().items(&items[..]).default(0).interact()?;
        match selection {
            0 => handle_login(&api, &store),
            1 => handle_upload(&api, &store)?,
            2 => handle_list(&api, &store)?,
            3 => {
                store.clear();
                println!("Logged out.");
            }
            4 => break,
            _ => {}
        }
    }
    Ok(())
}

fn handle_login<S: CredentialStore>(api: &ApiClient, store: &S) {
    let mut provider = PromptCredentialProvider::new(api);
    match provider.obtain().and_then(|c| store.save(&c)) {
        Ok(()) => {}
        Err(e) => println!("{}", e.to_string().red()),
    }
}

fn handle_upload<S: CredentialStore>(api: &ApiClient, store: &S) -> Result<()> {
    let items = select_images()?;
    if items.is_empty() {
        println!("{}", "Please select images first".yellow());
        return Ok(());
    }
    println!("{} image(s) selected", items.len());

    let mut provider = PromptCredentialProvider::new(api);
    let credential = match ensure_credential(store, &mut provider) {
        Ok(c) => c,
        Err(e) => {
            println!("{}", e.to_string().red());
            return Ok(());
        }
    };

    let bar = ProgressBar::new(items.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")?.progress_chars("=> "),
    );
    let outcome = run_batch(&items, &credential, api, store, |p| {
        bar.set_position(p.completed as u64);
        if let Some(current) = &p.current {
            bar.set_message(format!("Currently uploading: {current}"));
        }
    });
    bar.finish_and_clear();

    match outcome {
        Ok(progress) => print_results(&progress),
        Err(BatchError::SessionExpired { progress }) => {
            print_results(&progress);
            println!("{}", "Session expired. Please login again.".red());
        }
        Err(e) => println!("{}", e.to_string().red()),
    }
    Ok(())
}

fn handle_list<S: CredentialStore>(api: &ApiClient, store: &S) -> Result<()> {
    let Some(credential) = store.load() else {
        println!("Login to view your photos");
        return Ok(());
    };
    let raw: String = Input::new()
        .with_prompt(format!(
            "Folder id (empty for all, upload folder is {})",
            api.folder_id()
        ))
        .allow_empty(true)
        .interact_text()?;
    let folder = match parse_folder(&raw) {
        Ok(folder) => folder,
        Err(msg) => {
            println!("{}", msg.red());
            return Ok(());
        }
    };

    let gallery = fetch_gallery(api, &credential, folder, store);
    if let Some(e) = &gallery.error {
        println!("{}", e.to_string().red());
        return Ok(());
    }
    if gallery.photos.is_empty() {
        println!("No photos to show.");
        return Ok(());
    }
    for photo in &gallery.photos {
        let (w, h) = photo.display_size();
        let star = if photo.flags.is_starred { "*" } else { " " };
        let image = photo.image.as_deref().unwrap_or("-");
        println!("{star} #{:<5} {:<30} {w}x{h}  {image}", photo.id, photo.name);
    }
    Ok(())
}

fn parse_folder(raw: &str) -> std::result::Result<Option<u64>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| format!("Not a folder id: {raw}"))
}

/// Pick files with the native dialog, falling back to typed paths when no
/// dialog is available or the user cancels it.
fn select_images() -> Result<Vec<UploadItem>> {
    let picked = rfd::FileDialog::new()
        .add_filter("Images", IMAGE_EXTENSIONS)
        .pick_files();
    let paths = match picked {
        Some(paths) if !paths.is_empty() => paths,
        _ => {
            let raw: String = Input::new()
                .with_prompt("Image paths (comma separated)")
                .allow_empty(true)
                .interact_text()?;
            parse_paths(&raw)
        }
    };
    Ok(paths.into_iter().map(UploadItem::from_path).collect())
}

fn parse_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn print_results(progress: &BatchProgress) {
    if progress.results.is_empty() {
        return;
    }
    println!("Upload Results");
    for result in &progress.results {
        if result.is_success() {
            let id = result
                .remote_id()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".into());
            println!("  {} {} (ID: {id})", "ok".green(), result.file);
        } else {
            let msg = result.error.as_deref().unwrap_or("Upload failed");
            println!("  {} {} {}", "error".red(), result.file, msg.red());
        }
    }
    println!(
        "{} of {} uploads successful",
        progress.succeeded(),
        progress.total
    );
}
