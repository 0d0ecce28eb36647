use chatbot::{
    auth::{
        AuthSession, FirebaseIdentityBackend, IdentityBackend, LocalIdentityBackend,
        StaticCredentialProvider,
    },
    config::Settings,
    db::RealtimeDbClient,
    llm::{GeminiClient, GenerativeModel},
    repositories::{
        ChatStore, FireChatRepository, FirebaseStorageRepository, MediaStore,
        MemoryChatRepository,
    },
    services::{AuthService, ChatService},
    ui::App,
};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

#[derive(Parser)]
#[command(name = "chatbot")]
#[command(about = "Chat with Gemini from the terminal, with history synced per user", long_about = None)]
struct Cli {
    /// Keep chats in memory and sign in as a local user
    #[arg(long)]
    offline: bool,

    /// Gemini model to use instead of GEMINI_MODEL
    #[arg(long)]
    model: Option<String>,

    /// Google ID token to sign in with instead of GOOGLE_ID_TOKEN
    #[arg(long)]
    id_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so they stay out of the chat thread
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatbot=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let mut settings =
        Settings::from_env().map_err(|e| format!("Failed to load settings: {}", e))?;
    if let Some(model) = cli.model {
        settings.gemini.model = model;
    }
    settings
        .validate(cli.offline)
        .map_err(|e| format!("Invalid settings: {}", e))?;

    tracing::info!(
        "Starting chatbot ({} mode, model {})",
        if cli.offline { "offline" } else { "online" },
        settings.gemini.model
    );

    // Identity
    let backend: Arc<dyn IdentityBackend> = if cli.offline {
        Arc::new(LocalIdentityBackend::default())
    } else {
        Arc::new(FirebaseIdentityBackend::new(&settings.firebase))
    };
    let session = AuthSession::new(backend);

    // Repositories
    let store: Arc<dyn ChatStore> = if cli.offline {
        Arc::new(MemoryChatRepository::new(session.clone()))
    } else {
        Arc::new(FireChatRepository::new(
            RealtimeDbClient::new(&settings.firebase),
            session.clone(),
        ))
    };

    let media: Option<Arc<dyn MediaStore>> = match &settings.firebase.storage_bucket {
        Some(bucket) if !cli.offline => Some(Arc::new(FirebaseStorageRepository::new(
            bucket.clone(),
            session.clone(),
        ))),
        _ => None,
    };

    let model: Arc<dyn GenerativeModel> = Arc::new(GeminiClient::new(&settings.gemini));

    // Services
    let id_token = cli
        .id_token
        .or_else(|| settings.app.google_id_token.clone())
        .or_else(|| cli.offline.then(|| "offline".to_string()));
    let credentials = Arc::new(StaticCredentialProvider::new(id_token));
    let auth = AuthService::new(session, credentials.clone());

    let app_config = settings.app.clone();
    let app = App::new(auth, credentials, move || {
        ChatService::new(
            store.clone(),
            model.clone(),
            media.clone(),
            app_config.clone(),
        )
    });

    tokio::select! {
        result = app.run() => {
            result.map_err(|e| format!("Terminal error: {}", e))?;
        }
        _ = shutdown_signal() => {}
    }

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate_signal) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(err) = res {
                            tracing::error!("Failed to listen for Ctrl+C: {}", err);
                        }
                    },
                    _ = terminate_signal.recv() => {},
                }
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl+C: {}", err);
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
        }
    }

    tracing::info!("Shutdown signal received");
}
