//! Route table publication and hot reload.
//!
//! # Responsibilities
//! - Hold the live route table behind an `ArcSwap`
//! - Build replacement tables off to the side and publish them atomically
//! - Keep serving the previous table when a reload fails
//! - Drive reloads from file changes, SIGHUP and the admin API
//!
//! # Design Decisions
//! - Readers never block: a lookup loads the current `Arc<RouteTable>` and
//!   keeps using it until the request completes, even across a swap
//! - Writers are serialized by a mutex so generations are strictly
//!   increasing and two reloads never race to publish
//! - Only `routes` are reloadable; listener, timeouts and admin settings
//!   need a restart

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::http::{HeaderMap, Method};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{load_config, ConfigError, GatewayConfig, ReloadTrigger, RouteDefinition};
use crate::filter::FilterRegistry;
use crate::observability::metrics;
use crate::routing::{Route, RouteTable};

/// Quiet period used to coalesce bursts of file events into one reload.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct WriterState {
    last_error: Option<String>,
}

/// Owner of the live route table.
#[derive(Debug)]
pub struct RouteStore {
    current: ArcSwap<RouteTable>,
    registry: FilterRegistry,
    /// Inbound request ceiling that route timeouts must stay below.
    request_limit: Option<Duration>,
    writer: Mutex<WriterState>,
}

impl RouteStore {
    /// Compile `definitions` and publish them as generation 1.
    pub fn new(definitions: &[RouteDefinition], registry: FilterRegistry) -> Result<Self, ConfigError> {
        Self::build(definitions, registry, None)
    }

    /// Compile `config.routes`, holding this and every later reload to the
    /// configured inbound request ceiling.
    pub fn from_config(config: &GatewayConfig, registry: FilterRegistry) -> Result<Self, ConfigError> {
        Self::build(&config.routes, registry, Some(config.timeouts.request_limit()))
    }

    fn build(
        definitions: &[RouteDefinition],
        registry: FilterRegistry,
        request_limit: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let table = RouteTable::load_with_limit(definitions, &registry, request_limit)?.with_generation(1);
        tracing::info!(routes = table.len(), "Route table loaded");

        Ok(Self {
            current: ArcSwap::from_pointee(table),
            registry,
            request_limit,
            writer: Mutex::new(WriterState::default()),
        })
    }

    /// Snapshot of the live table.
    pub fn current(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Select a route against the live table.
    pub fn lookup(&self, method: &Method, path: &str, headers: &HeaderMap) -> Option<Arc<Route>> {
        self.current.load().lookup(method, path, headers)
    }

    /// Error of the most recent failed reload, cleared by a successful one.
    pub fn last_error(&self) -> Option<String> {
        self.lock_writer().last_error.clone()
    }

    /// Compile `definitions` and publish them, or keep the current table.
    ///
    /// Lookups running concurrently see either the old or the new table,
    /// never a mix.
    pub fn reload(&self, definitions: &[RouteDefinition]) -> Result<Arc<RouteTable>, ConfigError> {
        let mut writer = self.lock_writer();
        let previous = self.current.load().generation();

        match RouteTable::load_with_limit(definitions, &self.registry, self.request_limit) {
            Ok(table) => {
                let table = Arc::new(table.with_generation(previous + 1));
                self.current.store(table.clone());
                writer.last_error = None;
                metrics::record_reload(true);
                tracing::info!(
                    generation = table.generation(),
                    routes = table.len(),
                    "Route table reloaded"
                );
                Ok(table)
            }
            Err(err) => {
                writer.last_error = Some(err.to_string());
                metrics::record_reload(false);
                tracing::warn!(
                    generation = previous,
                    error = %err,
                    "Route reload rejected, keeping current table"
                );
                Err(err)
            }
        }
    }

    /// Re-read `path` and publish its routes.
    pub fn reload_from_path(&self, path: &Path) -> Result<Arc<RouteTable>, ConfigError> {
        match load_config(path) {
            Ok(config) => self.reload(&config.routes),
            Err(err) => {
                self.lock_writer().last_error = Some(err.to_string());
                metrics::record_reload(false);
                tracing::warn!(path = %path.display(), error = %err, "Failed to read configuration");
                Err(err)
            }
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, WriterState> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Apply reload triggers until `shutdown` fires or every sender is gone.
pub async fn reload_task(
    store: Arc<RouteStore>,
    config_path: PathBuf,
    mut triggers: mpsc::UnboundedReceiver<ReloadTrigger>,
    shutdown: CancellationToken,
) {
    loop {
        let trigger = tokio::select! {
            _ = shutdown.cancelled() => break,
            trigger = triggers.recv() => match trigger {
                Some(trigger) => trigger,
                None => break,
            },
        };

        tokio::time::sleep(RELOAD_DEBOUNCE).await;
        while triggers.try_recv().is_ok() {}

        tracing::info!(trigger = %trigger, path = %config_path.display(), "Reloading routes");
        let (store, path) = (store.clone(), config_path.clone());
        if let Err(e) = tokio::task::spawn_blocking(move || store.reload_from_path(&path)).await {
            tracing::error!(error = %e, "Reload task panicked");
        }
    }

    tracing::debug!("Reload task stopped");
}
