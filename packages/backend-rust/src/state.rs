use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::cache::RedisCache;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::db::Database;
use crate::services::progress::ProgressAggregator;
use crate::services::session::{SessionController, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    db: Database,
    catalog: Arc<Catalog>,
    cache: Option<RedisCache>,
    sessions: Arc<SessionController>,
    progress: Arc<ProgressAggregator>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        db: Database,
        catalog: Arc<Catalog>,
        cache: Option<RedisCache>,
        sessions: Arc<SessionController>,
        progress: Arc<ProgressAggregator>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config,
            db,
            catalog,
            cache,
            sessions,
            progress,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_ref()
    }

    pub fn sessions(&self) -> &SessionController {
        &self.sessions
    }

    pub fn session_registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(self.sessions.registry())
    }

    pub fn progress(&self) -> &ProgressAggregator {
        &self.progress
    }
}
