//! # Example: rate_shaping
//!
//! Demonstrates per-subscription debounce and throttle against one noisy
//! publisher.
//!
//! Shows how to:
//! - Collapse a burst to its final value with `with_debounce`.
//! - Sample the leading edge of a burst with `with_throttle`.
//! - Combine shaping with a filter on the same subscription.
//!
//! ## Flow
//! ```text
//! publish x10 (every 20ms)
//!     ├──► debounced (150ms)  ─► last value only, after the burst ends
//!     ├──► throttled (100ms)  ─► first value, then one per window
//!     └──► unshaped           ─► all ten values
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example rate_shaping
//! ```

use std::error::Error;
use std::time::Duration;

use backplane::{EventBus, SubscribeConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bus: EventBus<u32> = EventBus::new();

    let mut debounced = bus.subscribe(
        "search.input",
        SubscribeConfig::new().with_debounce(Duration::from_millis(150)),
    )?;
    let mut throttled = bus.subscribe(
        "search.input",
        SubscribeConfig::new().with_throttle(Duration::from_millis(100)),
    )?;
    let mut unshaped = bus.subscribe(
        "search.input",
        SubscribeConfig::new().with_filter(|env| env.payload % 2 == 0),
    )?;

    for n in 1..=10 {
        bus.publish("search.input", n);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // let the debounce window elapse
    tokio::time::sleep(Duration::from_millis(200)).await;

    print!("debounced: ");
    while let Some(env) = debounced.try_recv() {
        print!("{} ", env.payload);
    }
    println!("(only the last of the burst)");

    print!("throttled: ");
    while let Some(env) = throttled.try_recv() {
        print!("{} ", env.payload);
    }
    println!("(leading edge per 100ms window)");

    print!("even only: ");
    while let Some(env) = unshaped.try_recv() {
        print!("{} ", env.payload);
    }
    println!();

    Ok(())
}
