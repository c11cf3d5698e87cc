use std::path::PathBuf;

use fleet_status::lifecycle::startup;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FLEET_STATUS_CONFIG").ok())
        .map(PathBuf::from);

    startup::run(config_path.as_deref()).await
}
