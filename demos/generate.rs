use futures::StreamExt;
use genrelay::{HttpRelayClient, PollerConfig, PollerController, PollerState};
use std::env;
use tokio_stream::wrappers::WatchStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    genrelay::logger::init()?;

    let prompt = env::args().skip(1).collect::<Vec<_>>().join(" ");
    let config = PollerConfig::from_env();
    log::info!("🎨 Asking {} for: {}", config.relay_url, prompt);

    let mut controller = PollerController::new(HttpRelayClient::from_config(&config), config);

    let mut updates = WatchStream::new(controller.subscribe());
    let printer = tokio::spawn(async move {
        while let Some(state) = updates.next().await {
            let line = state.status_line();
            if !line.is_empty() {
                println!("{}", line);
            }
            if state.is_terminal() {
                break;
            }
        }
    });

    let outcome = controller.generate(&prompt).await.clone();
    drop(controller);
    let _ = printer.await;

    match outcome {
        PollerState::Complete { job } => {
            if let Some(url) = job.image_url() {
                println!("🖼️  {}", url);
            }
            Ok(())
        }
        other => Err(other
            .error_message()
            .unwrap_or("Image generation did not finish")
            .into()),
    }
}
