// src/main.rs
use log::error;
use pdfgen::{service, Config};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    if let Err(e) = service::serve(config).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}
