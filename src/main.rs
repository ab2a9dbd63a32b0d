// Entrypoint for the CLI application.
// - Keeps `main` small: load config, build the API client and token store,
//   and hand them to the UI loop.
// - Logs go to stderr so they don't interleave with the menus; set
//   `RUST_LOG` to see more than warnings.

use timemine_cli::{api::ApiClient, config::Config, session::FileCredentialStore, ui::main_menu};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let api = ApiClient::new(&config)?;
    let store = FileCredentialStore::new(&config.token_file);
    tracing::info!(api = %api.base_url(), "starting");

    main_menu(api, store)?;
    Ok(())
}
