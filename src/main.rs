use log::{error, info};
use service::{config::Config, logging::Logger};

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    info!("Starting dashboard relay...");

    let app_state = match service::init_app_state(config) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Failed to initialize relay: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
