use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use crate::services::session::SessionRegistry;

pub fn evict_idle_sessions(registry: Arc<SessionRegistry>, idle_timeout: Duration) -> usize {
    let start = Instant::now();
    debug!("Starting session cleanup cycle");

    let evicted = registry.evict_idle(Utc::now(), idle_timeout);
    if evicted > 0 {
        info!(
            evicted,
            remaining = registry.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Idle sittings evicted"
        );
    }
    evicted
}
