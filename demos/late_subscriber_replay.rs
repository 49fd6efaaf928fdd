//! # Example: late_subscriber_replay
//!
//! Demonstrates replay buffers: a subscriber that arrives after the fact
//! still receives the most recent envelopes, then continues live.
//!
//! Shows how to:
//! - Raise a topic's retention ceiling with `with_replay(depth)`.
//! - Receive the replay prefix strictly before any live envelope.
//! - Compare against a plain late subscriber that gets nothing.
//!
//! ## Flow
//! ```text
//! publish rev 1..=3 ──► buffer["config.changed"] keeps the last 2
//!
//! subscribe(replay: 2) ──► [rev 2, rev 3] (prefix) ──► rev 4 (live)
//! subscribe()          ──►                              rev 4 (live)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example late_subscriber_replay
//! ```

use std::error::Error;

use backplane::{EventBus, SubscribeConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bus: EventBus<u64> = EventBus::new();

    // the first deep subscriber sets the retention ceiling for the topic
    let _pioneer = bus.subscribe("config.changed", SubscribeConfig::new().with_replay(2))?;

    for revision in 1..=3 {
        bus.publish("config.changed", revision);
    }

    let mut replaying =
        bus.subscribe("config.changed", SubscribeConfig::new().with_replay(2))?;
    let mut live_only = bus.subscribe("config.changed", SubscribeConfig::new())?;

    bus.publish("config.changed", 4);

    println!("replaying subscriber:");
    while let Some(env) = replaying.try_recv() {
        println!("  revision {}", env.payload);
    }

    println!("live-only subscriber:");
    while let Some(env) = live_only.try_recv() {
        println!("  revision {}", env.payload);
    }

    Ok(())
}
