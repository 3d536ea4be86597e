use palaver_client::ApiClient;
use palaver_session::SessionStore;

use palaver_app::app;

/// Remote chat service this client is built against.
const DEFAULT_API_URL: &str = "https://chatify-api.up.railway.app";

const DEFAULT_STATE_PATH: &str = ".palaver-state.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palaver=info".into()),
        )
        .init();

    // Config
    let api_url = std::env::var("PALAVER_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
    let state_path =
        std::env::var("PALAVER_STATE_PATH").unwrap_or_else(|_| DEFAULT_STATE_PATH.into());

    let client = ApiClient::new(api_url);
    let store = SessionStore::open(&state_path)?;

    app::run(client, store).await
}
