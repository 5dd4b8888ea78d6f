use dotenvy::dotenv;
use fleetdesk::{
    app::FleetApp,
    backend::SupabaseBackend,
    config::{BackendConfig, app::load_default_config},
    errors::Result,
    shell,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file; the variables may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Application configuration (defaults when the file is absent)
    let app_config = load_default_config()
        .inspect_err(|e| error!("Failed to load application configuration: {}", e))?;

    // 4. Backend client
    let backend_config = BackendConfig::from_env()
        .inspect_err(|e| error!("Backend configuration incomplete: {}", e))?;
    let backend = SupabaseBackend::new(&backend_config, app_config.auth.redirect_url.clone())
        .inspect_err(|e| error!("Failed to create backend client: {}", e))?;

    // 5. Resume a persisted session, then hand over to the shell
    let mut app = FleetApp::new(backend, app_config);
    if app.check_session().await {
        info!("Resumed session for {}", app.page().user_email);
    }
    for notice in app.page_mut().take_notices() {
        eprintln!("{notice}");
    }

    shell::run(&mut app).await
}
