//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run
//! the download session. No business logic here; authentication is
//! delegated to AuthService.

use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tg_media_dl::adapters::persistence::SeenJson;
use tg_media_dl::adapters::telegram::{GrammersAuthAdapter, GrammersChatGateway};
use tg_media_dl::adapters::ui;
use tg_media_dl::ports::{AuthPort, ChatGateway, SeenStorePort};
use tg_media_dl::shared::config::AppConfig;
use tg_media_dl::usecases::{
    AlbumReconstructor, AlbumSearch, AuthService, MediaDownloader, RetryPolicy, SessionService,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env found"),
    }

    ui::init_ui();

    let cfg = AppConfig::load().unwrap_or_default();
    let api_hash = cfg
        .api_hash
        .clone()
        .or_else(|| std::env::var("TG_MDL_API_HASH").ok())
        .unwrap_or_default();
    if api_hash.is_empty() {
        anyhow::bail!("Set TG_MDL_API_HASH (env or .env). Get from https://my.telegram.org");
    }

    let output_root = PathBuf::from(cfg.output_dir_or_default());
    let session_path = cfg
        .session_path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./session.db"));

    // --- Telegram client (cloned for auth and gateway; same session) ---
    let tg_client = create_telegram_client(&cfg, &session_path).await?;

    // --- Auth: adapter + service, then run flow ---
    let auth_adapter: Arc<dyn AuthPort> = Arc::new(GrammersAuthAdapter::new(tg_client.clone()));
    let auth_service = AuthService::new(auth_adapter, api_hash);
    auth_service
        .run_auth_flow()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let gateway: Arc<dyn ChatGateway> = Arc::new(GrammersChatGateway::new(tg_client));

    // --- Target chat: configured id or interactive picker ---
    let chat_id = match cfg.chat_id {
        Some(id) => id,
        None => {
            let chats = gateway
                .get_dialogs()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            ui::tui::pick_chat(&chats).map_err(|e| anyhow::anyhow!("{}", e))?
        }
    };

    // Validates dates, media types and structure mode; fatal before any
    // processing starts.
    let run_cfg = cfg
        .run_config(chat_id)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    // --- Seen history (dedup across runs) ---
    let seen_store = SeenJson::new(output_root.join("seen.json"));
    seen_store.load().await.map_err(|e| anyhow::anyhow!("{}", e))?;
    let seen: Arc<dyn SeenStorePort> = Arc::new(seen_store);

    // --- Core services ---
    let downloader = Arc::new(MediaDownloader::new(
        Arc::clone(&gateway),
        cfg.concurrent_or_default(),
        RetryPolicy::default(),
    ));
    let albums = AlbumReconstructor::new(Arc::clone(&gateway), AlbumSearch::default());
    let session = SessionService::new(
        Arc::clone(&gateway),
        seen,
        downloader,
        albums,
        &output_root,
    );

    info!(chat_id, path = %output_root.display(), "starting download session");
    let stats = session
        .run(&run_cfg)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    info!(
        downloaded = stats.downloaded,
        text_saved = stats.text_saved,
        failed = stats.failed,
        "done; files in '{}'",
        output_root.display()
    );

    Ok(())
}

/// Create grammers Client with persistent session storage.
/// Loads an existing session from `session_path` if present; otherwise a new
/// session is created and saved after login. Requires TG_MDL_API_ID (and
/// TG_MDL_API_HASH for login).
async fn create_telegram_client(
    cfg: &AppConfig,
    session_path: &std::path::Path,
) -> anyhow::Result<grammers_client::Client> {
    let api_id = cfg
        .api_id
        .or_else(|| {
            std::env::var("TG_MDL_API_ID")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(0);

    if api_id == 0 {
        anyhow::bail!(
            "Set TG_MDL_API_ID (and TG_MDL_API_HASH) in .env. Get from https://my.telegram.org"
        );
    }

    let session = tg_media_dl::adapters::telegram::session::open_file_session(session_path).await?;
    let session = Arc::new(session);
    let pool = grammers_client::SenderPool::new(session, api_id);
    let handle = pool.handle.clone();
    tokio::spawn(async move {
        pool.runner.run().await;
    });
    let client = grammers_client::Client::new(handle);

    Ok(client)
}
