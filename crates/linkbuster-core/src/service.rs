//! The protection service: one explicit object owning every component.
//!
//! Hosts (the CLI, the socket bus) build a [`ProtectionService`], feed it
//! [`Request`]s and subscribe to its surface messages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::bus::{
    pending, AckResponse, ConnectionResponse, FrameKind, NavigationOutcome, PingResponse, Reply,
    Request, Response, ServiceState, StatusResponse, SurfaceBus, SurfaceMessage,
};
use crate::cache::ResultCache;
use crate::clock::Clock;
use crate::config::LinkbusterConfig;
use crate::heuristic::HeuristicScorer;
use crate::notify::{ContextId, Dispatcher, TriggerOrigin};
use crate::orchestrator::ScanOrchestrator;
use crate::remote::RemoteScanner;
use crate::scan::ScanResult;
use crate::settings::{self, LiveSettings, Settings, SETTINGS_KEY};
use crate::stats::{Stats, StatsAggregator};
use crate::store::KeyValueStore;
use crate::url_model;

#[derive(Debug)]
pub struct ProtectionService {
    config: LinkbusterConfig,
    settings: LiveSettings,
    store: Arc<dyn KeyValueStore>,
    orchestrator: ScanOrchestrator,
    stats: StatsAggregator,
    dispatcher: Arc<Dispatcher>,
    remote: Arc<dyn RemoteScanner>,
    clock: Arc<dyn Clock>,
    bus: SurfaceBus,
    /// Host and port of the scoring API; navigations to it are never scanned.
    api_origin: Option<(String, u16)>,
    active: AtomicBool,
    maintenance: Mutex<Vec<JoinHandle<()>>>,
}

impl ProtectionService {
    /// Build the service with the built-in heuristic rules.
    ///
    /// Settings and stats are read from `store` (defaults are written on
    /// first run). Storage problems are logged, never fatal.
    pub async fn new(
        config: LinkbusterConfig,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteScanner>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Self::with_heuristic(config, store, remote, clock, HeuristicScorer::default()).await
    }

    pub async fn with_heuristic(
        config: LinkbusterConfig,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteScanner>,
        clock: Arc<dyn Clock>,
        heuristic: HeuristicScorer,
    ) -> Arc<Self> {
        let initial = settings::load_or_init(store.as_ref()).await;
        let settings = LiveSettings::new(initial);
        let stats =
            StatsAggregator::load(Arc::clone(&store), Arc::clone(&clock), settings.clone()).await;
        let bus = SurfaceBus::new();
        let dispatcher = Dispatcher::new(
            bus.clone(),
            Arc::clone(&remote),
            Arc::clone(&clock),
            settings.clone(),
            config.notification_expiry(),
        );
        let orchestrator = ScanOrchestrator::new(
            ResultCache::new(config.cache_ttl()),
            Arc::clone(&remote),
            heuristic,
            Arc::clone(&clock),
        );
        let api_origin = url::Url::parse(&config.api_base_url)
            .ok()
            .and_then(|u| Some((u.host_str()?.to_string(), u.port_or_known_default()?)));

        tracing::info!(
            api = %config.api_base_url,
            threshold = initial.risk_threshold,
            notifications = initial.notifications_enabled,
            auto_scan = initial.auto_scan,
            "protection service ready"
        );

        Arc::new(Self {
            config,
            settings,
            store,
            orchestrator,
            stats,
            dispatcher,
            remote,
            clock,
            bus,
            api_origin,
            active: AtomicBool::new(true),
            maintenance: Mutex::new(Vec::new()),
        })
    }

    /// Settings currently in force.
    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn orchestrator(&self) -> &ScanOrchestrator {
        &self.orchestrator
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Subscribe to surface-bound messages.
    pub fn surface(&self) -> broadcast::Receiver<SurfaceMessage> {
        self.bus.subscribe()
    }

    /// Answer a bus request.
    ///
    /// Status and ping are answered immediately; everything else runs as a
    /// task and is answered through the pending handle. Dropping that handle
    /// is fine: the work still completes, the response is discarded.
    pub fn handle(self: &Arc<Self>, request: Request) -> Reply {
        tracing::debug!(action = request.action(), "request");
        match request {
            Request::GetStatus => Reply::Ready(Response::Status(self.status())),
            Request::Ping => Reply::Ready(Response::Ping(PingResponse {
                alive: true,
                timestamp: self.clock.now(),
            })),
            other => {
                let (responder, pending) = pending();
                let svc = Arc::clone(self);
                tokio::spawn(async move {
                    let response = svc.call(other).await;
                    responder.send(response);
                });
                Reply::Pending(pending)
            }
        }
    }

    /// Run a request to completion.
    pub async fn call(&self, request: Request) -> Response {
        match request {
            Request::ScanUrl { url, context_id } => {
                Response::Scan(self.scan_url(&url, context_id).await)
            }
            Request::GetStats => Response::Stats(self.stats().await),
            Request::GetStatus => Response::Status(self.status()),
            Request::Ping => Response::Ping(PingResponse {
                alive: true,
                timestamp: self.clock.now(),
            }),
            Request::TestConnection => Response::Connection(self.test_connection().await),
            Request::Navigate {
                url,
                context_id,
                frame,
                background,
            } => {
                let origin = if background {
                    TriggerOrigin::Background
                } else {
                    TriggerOrigin::Direct
                };
                Response::Navigation(self.handle_navigation(&url, context_id, frame, origin).await)
            }
            Request::PageLoaded { url, context_id } => {
                Response::Navigation(self.handle_page_loaded(&url, context_id).await)
            }
            Request::DismissWarning { context_id } => Response::Ack(AckResponse {
                success: self.dispatcher.dismiss(context_id).is_some(),
            }),
            Request::FocusContext { context_id } => {
                self.dispatcher.set_focused(context_id);
                Response::Ack(AckResponse { success: true })
            }
        }
    }

    /// Explicit scan request. Counted in stats; with a context it may raise
    /// a warning there.
    pub async fn scan_url(&self, url: &str, context: Option<ContextId>) -> ScanResult {
        let result = self.orchestrator.scan_for(url, context).await;
        self.stats.record(url, &result).await;
        if let Some(context) = context {
            self.dispatcher
                .on_scan(context, TriggerOrigin::Direct, url, &result);
        }
        result
    }

    /// Intercepted navigation. Filtered navigations are not scanned.
    pub async fn handle_navigation(
        &self,
        url: &str,
        context: ContextId,
        frame: FrameKind,
        origin: TriggerOrigin,
    ) -> NavigationOutcome {
        if !self.should_scan_navigation(url, frame) {
            return NavigationOutcome {
                scanned: false,
                result: None,
                notification: None,
            };
        }
        let result = self.orchestrator.scan_for(url, Some(context)).await;
        self.stats.record(url, &result).await;
        let transition = self.dispatcher.on_scan(context, origin, url, &result);
        NavigationOutcome {
            scanned: true,
            notification: transition.map(|t| t.notification.id),
            result: Some(result),
        }
    }

    /// Rescan after a page load; a result still over threshold refreshes the
    /// warning shown in `context`. Not counted in stats.
    pub async fn handle_page_loaded(&self, url: &str, context: ContextId) -> NavigationOutcome {
        if !url_model::is_web_url(url) {
            return NavigationOutcome {
                scanned: false,
                result: None,
                notification: None,
            };
        }
        let result = self.orchestrator.scan_for(url, Some(context)).await;
        self.dispatcher.refresh(context, &result);
        NavigationOutcome {
            scanned: true,
            result: Some(result),
            notification: self.dispatcher.active(context).map(|n| n.id),
        }
    }

    pub async fn stats(&self) -> Stats {
        self.stats.snapshot().await
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            status: if self.is_active() {
                ServiceState::Active
            } else {
                ServiceState::Inactive
            },
            timestamp: self.clock.now(),
        }
    }

    /// Probe `GET /status`. Touches neither cache nor stats.
    pub async fn test_connection(&self) -> ConnectionResponse {
        match self.remote.status().await {
            Ok(code) => ConnectionResponse {
                connected: (200..300).contains(&code),
                status: Some(code),
                error: None,
            },
            Err(e) => {
                tracing::debug!(kind = ?e.kind(), "connection test failed: {}", e);
                ConnectionResponse {
                    connected: false,
                    status: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn should_scan_navigation(&self, url: &str, frame: FrameKind) -> bool {
        if !self.is_active() || !self.settings.get().auto_scan {
            return false;
        }
        if frame != FrameKind::MainFrame || !url_model::is_web_url(url) {
            return false;
        }
        match (&self.api_origin, url::Url::parse(url)) {
            (Some((host, port)), Ok(u)) => {
                u.host_str() != Some(host.as_str()) || u.port_or_known_default() != Some(*port)
            }
            _ => true,
        }
    }

    /// Start the cache sweep, keepalive and settings watcher tasks.
    ///
    /// The watcher is subscribed before this returns, so any `settings` write
    /// made afterwards is picked up.
    pub fn spawn_maintenance(self: &Arc<Self>) {
        let sweep_every = self.config.sweep_interval();
        let keepalive_every = self.config.keepalive_interval();

        let weak = Arc::downgrade(self);
        let sweeper = tokio::spawn(async move {
            let mut tick = tokio::time::interval(sweep_every);
            tick.tick().await;
            loop {
                tick.tick().await;
                let Some(svc) = weak.upgrade() else { break };
                svc.orchestrator.sweep();
            }
        });

        let keepalive = tokio::spawn(async move {
            let mut tick = tokio::time::interval(keepalive_every);
            loop {
                tick.tick().await;
                tracing::trace!("keepalive");
            }
        });

        let mut changes = self.store.subscribe();
        let live = self.settings.clone();
        let store = Arc::clone(&self.store);
        let watcher = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.key == SETTINGS_KEY => live.apply_stored(change.value),
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        tracing::debug!(missed, "store changes lagged, re-reading settings");
                        match store.get(SETTINGS_KEY).await {
                            Ok(Some(value)) => live.apply_stored(value),
                            Ok(None) => {}
                            Err(e) => tracing::warn!("could not re-read settings: {:#}", e),
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        self.maintenance.lock().extend([sweeper, keepalive, watcher]);
    }

    /// Stop background tasks. Requests still answer, status reports inactive
    /// and navigations are no longer scanned.
    pub fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
        for task in self.maintenance.lock().drain(..) {
            task.abort();
        }
        self.dispatcher.shutdown();
        tracing::info!("protection service stopped");
    }

    /// Wait for in-flight emergency alerts. Call before the runtime exits.
    pub async fn flush(&self) {
        self.dispatcher.flush_alerts().await;
    }
}
