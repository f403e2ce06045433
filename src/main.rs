use genrelay::{logger, relay::server, LeonardoClient, Relay, RelayConfig};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init()?;
    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = RelayConfig::from_env();
    logger::log_config_info(&config);

    let provider = match LeonardoClient::new(config.leonardo.clone()) {
        Ok(provider) => provider,
        Err(e) => {
            log::error!("❌ Failed to initialize upstream client: {}", e);
            return Err(e.into());
        }
    };

    let relay = Relay::new(Arc::new(provider));
    log::info!("🔌 Relaying to {}", relay.provider_name());

    server::run(relay, &config).await?;
    Ok(())
}
