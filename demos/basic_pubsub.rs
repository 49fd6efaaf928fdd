//! # Example: basic_pubsub
//!
//! Demonstrates the core publish/subscribe flow on one bus instance.
//!
//! Shows how to:
//! - Subscribe to a single topic, a merged topic list, and all events.
//! - Publish plain and source-tagged envelopes.
//! - Inspect the bus with `last_event`, `active_event_types` and `debug_info`.
//!
//! ## Flow
//! ```text
//! publish("user.signed_in") ──► channel["user.signed_in"] ──► sessions
//!                           │                            └──► audit (merged)
//!                           └──► all-events channel ─────────► tap
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=backplane=debug cargo run --example basic_pubsub
//! ```

use std::error::Error;

use backplane::{EventBus, SubscribeConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("backplane=debug")),
        )
        .init();

    let bus: EventBus<String> = EventBus::new();
    bus.set_debug_mode(true);

    let mut sessions = bus.subscribe("user.signed_in", SubscribeConfig::new())?;
    let mut audit = bus.subscribe_many(
        &["user.signed_in", "user.signed_out"],
        SubscribeConfig::new(),
    )?;
    let mut tap = bus.subscribe_all(SubscribeConfig::new())?;

    bus.publish_from("user.signed_in", "alice".to_string(), "session-layer");
    bus.publish("user.signed_out", "bob".to_string());
    bus.publish("cache.invalidated", "users".to_string());

    while let Some(env) = sessions.try_recv() {
        println!("[sessions] {} signed in", env.payload);
    }
    while let Some(env) = audit.try_recv() {
        println!(
            "[audit]    {} by {} (source: {})",
            env.event_type,
            env.payload,
            env.source.as_deref().unwrap_or("-")
        );
    }
    while let Some(env) = tap.try_recv() {
        println!(
            "[tap]      {} @{} correlation={}",
            env.event_type,
            env.timestamp_ms(),
            env.correlation_id
        );
    }

    if let Some(last) = bus.last_event("user.signed_in") {
        println!("last signed-in user: {}", last.payload);
    }
    println!("active topics: {:?}", bus.active_event_types());

    let info = bus.debug_info();
    println!(
        "{} live subscriptions, {} recent envelopes, {} buffered topics",
        info.total_subscriptions,
        info.recent_events.len(),
        info.buffers.len()
    );
    Ok(())
}
