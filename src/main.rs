use std::env;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::oneshot;

use rxanchor::api::rest::RestApi;
use rxanchor::baas::BaasClient;
use rxanchor::config::load_config;
use rxanchor::store::PrescriptionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize components
    let config_path = env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let config = load_config(Path::new(&config_path))
        .map_err(|e| Box::<dyn Error>::from(e))?;

    println!("Starting rxanchor against provider {}", config.baas.base_url);
    if config.baas.api_key.is_none() {
        eprintln!("Warning: no BLOCKAPI_API_KEY configured; provider calls will be rejected");
    }
    match &config.webhook_url {
        Some(url) => println!("Provider callbacks must be registered to {}", url),
        None => eprintln!("Warning: no WEBHOOK_URL configured; records will stay pending"),
    }

    let store = Arc::new(PrescriptionStore::new());
    let baas = Arc::new(BaasClient::new(&config.baas).map_err(|e| Box::<dyn Error>::from(e))?);
    let api = RestApi::new(Arc::clone(&store), baas);

    let addr = config.listen_addr().map_err(|e| Box::<dyn Error>::from(e))?;
    println!("Starting server on {}", addr);

    // Create a channel for shutdown signal
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // Set up server with graceful shutdown
    let routes = api.routes();
    let (_, server) = warp::serve(routes)
        .bind_with_graceful_shutdown(addr, async move {
            shutdown_rx.await.ok();
            println!("Shutting down server...");
        });

    // Create task for running the server
    let server_handle = tokio::spawn(server);

    // Wait for Ctrl+C
    signal::ctrl_c().await?;
    println!("Ctrl+C received, starting graceful shutdown");

    // Start shutdown process
    shutdown_tx.send(()).ok();

    // Wait for server to exit
    server_handle.await.map_err(|e| Box::<dyn Error>::from(e))?;

    println!("Server shutdown complete");
    Ok(())
}
