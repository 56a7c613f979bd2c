use std::process::ExitCode;
use std::sync::Arc;

use taskd::{App, Config, Server, store::JsonFileStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskd=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = JsonFileStore::new(&config.data_file);
    let app = App::new(Arc::new(store));

    let server = match Server::bind(config.bind_addr()).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "could not start server");
            return ExitCode::FAILURE;
        }
    };

    info!(
        data_file = %config.data_file.display(),
        "Server is running at http://localhost:{}",
        server.local_addr().port()
    );

    if let Err(e) = server.run(app).await {
        error!(error = %e, "server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
