use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the clinic appointments service
///
/// Loads `.env` if present, opens the document store and serves the REST API
/// (with Swagger UI at `/swagger-ui/`).
///
/// # Environment Variables
/// - `CLINIC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CLINIC_DATA_DIR`: Directory for the document store (default: "clinic_data")
/// - `CLINIC_DIRECTORY_FILE`: YAML file of doctors and users
/// - `CLINIC_DOCTORS`: Comma-separated doctor emails
/// - `CLINIC_SLOT_CAPACITY`, `CLINIC_MINUTES_PER_PATIENT`: queue tuning
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_run=info".parse()?)
                .add_directive("clinic_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CLINIC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let state = api_rest::startup::load_state_from_env()?;
    let app = api_rest::router(state);

    tracing::info!("++ Starting clinic REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
