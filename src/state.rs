use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::engine::Dispatcher;
use crate::error::AppError;
use crate::notify::{ExpoPushTransport, LogPushTransport, NotificationInbox, Outbox, PushTransport};
use crate::observability::metrics::Metrics;
use crate::store::{MemoryRepository, Repository};

pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub dispatcher: Dispatcher,
    pub inbox: Arc<NotificationInbox>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let push: Arc<dyn PushTransport> = if config.push_enabled {
            Arc::new(ExpoPushTransport::new(
                config.push_endpoint.clone(),
                Duration::from_millis(config.push_timeout_ms),
            )?)
        } else {
            Arc::new(LogPushTransport)
        };

        Ok(Self::from_parts(config, Arc::new(MemoryRepository::new()), push))
    }

    pub fn from_parts(
        config: &Config,
        repo: Arc<dyn Repository>,
        push: Arc<dyn PushTransport>,
    ) -> Self {
        let metrics = Metrics::new();
        let inbox = Arc::new(NotificationInbox::new());
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        let outbox = Outbox::new(inbox.clone(), push, events_tx, metrics.clone());
        let dispatcher = Dispatcher::new(
            repo.clone(),
            outbox,
            metrics.clone(),
            config.candidate_radius_km,
        );

        Self {
            repo,
            dispatcher,
            inbox,
            metrics,
        }
    }
}
