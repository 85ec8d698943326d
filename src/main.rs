//! sound-displayer: a microphone-driven half-circle waveform display.

mod app;
mod commands;
mod config;
mod display;
mod logging;
mod sampler;
mod waveform;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        tracing::error!("Fatal error: {e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
