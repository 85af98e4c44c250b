//! Runs the sample pipeline until Ctrl-C.
//!
//! ```bash
//! RUST_LOG=info cargo run -p autowire-sample
//! AUTOWIRE_AUDIT_ENABLED=true RUST_LOG=debug cargo run -p autowire-sample
//! ```

use autowire_boot::{setup_tracing, Application, BootError};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), BootError> {
    setup_tracing();

    let app = Application::new(autowire_sample::application_config(), autowire_sample::register)
        .await?;
    info!(
        order = ?app.running().init_order(),
        "Application running, press Ctrl-C to stop"
    );

    app.run().await;
    Ok(())
}
