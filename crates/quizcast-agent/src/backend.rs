//! Bus backend selection.

use std::sync::Arc;

use anyhow::Result;
use quizcast_bus::{Bus, MemoryBus};
use quizcast_settings::{BusBackend, BusSettings};

/// Build the configured bus.
pub fn build_bus(settings: &BusSettings) -> Result<Arc<dyn Bus>> {
    match settings.backend {
        BusBackend::Memory => {
            tracing::info!(capacity = settings.capacity, "using in-process bus");
            Ok(Arc::new(MemoryBus::new(settings.capacity)))
        }
        BusBackend::Redis => redis_bus(&settings.url),
    }
}

#[cfg(feature = "redis")]
fn redis_bus(url: &str) -> Result<Arc<dyn Bus>> {
    use anyhow::Context;
    let bus = quizcast_bus::RedisBus::open(url).context("Failed to configure redis bus")?;
    Ok(Arc::new(bus))
}

#[cfg(not(feature = "redis"))]
fn redis_bus(_url: &str) -> Result<Arc<dyn Bus>> {
    anyhow::bail!("bus backend \"redis\" requires building with the `redis` feature")
}
