use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use wahat_flow::alert::controller::AlertController;
use wahat_flow::alert::notify::LogNotificationSink;
use wahat_flow::api::{self, ApiContext};
use wahat_flow::config;
use wahat_flow::feed::http::{DEFAULT_FETCH_TIMEOUT, HttpFeedSource};
use wahat_flow::pipeline;
use wahat_flow::registry::RoadRegistry;
use wahat_flow::state::AppState;

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt().with_target(false).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        "wahat-flow starting"
    );
    let config = config::load_default()?;

    let registry = RoadRegistry::with_seed();
    let alerts = AlertController::new(config.alert_policy());
    let state = Arc::new(RwLock::new(AppState::new(
        registry,
        alerts,
        config.feed_url().to_string(),
    )));

    let stop_flag = Arc::new(AtomicBool::new(false));
    let segment_id = config.live_segment_id();

    // Start polling the live feed; without a reachable source the dashboard
    // keeps serving seed data and reports disconnected.
    let _feed_handle = match HttpFeedSource::new(config.feed_url(), DEFAULT_FETCH_TIMEOUT) {
        Ok(source) => {
            tracing::info!(
                url = source.url(),
                segment_id = segment_id,
                interval_ms = config.poll_interval().as_millis(),
                "Starting feed polling"
            );
            Some(pipeline::spawn_feed_thread(
                source,
                Arc::clone(&state),
                LogNotificationSink,
                segment_id,
                config.poll_interval(),
                Arc::clone(&stop_flag),
            ))
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to initialize feed source");
            None
        }
    };

    let _tick_handle = pipeline::spawn_tick_thread(Arc::clone(&state), Arc::clone(&stop_flag));

    let context = ApiContext {
        state: Arc::clone(&state),
        config_path: PathBuf::from(config::DEFAULT_CONFIG_PATH),
    };
    let app = api::router(context);
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    // Signal background threads to stop
    stop_flag.store(true, std::sync::atomic::Ordering::Relaxed);

    Ok(())
}

#[cfg(test)]
mod tests {
    use wahat_flow::config;

    #[test]
    fn default_config_is_valid_toml() -> Result<(), Box<dyn std::error::Error>> {
        let _config = config::load_default()?;
        Ok(())
    }
}
