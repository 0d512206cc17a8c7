//! MockServer - lifecycle of one mock server instance.
//!
//! A server binds a port (walking upward from the configured one while the
//! address is in use), loads its route table from the mock bundle and serves
//! until stopped. The route table sits behind an `Arc` that reload replaces
//! in a single swap, so a request sees either the old or the new table.

use super::handler::handle_mock_request;
use super::routes::RouteTable;
use super::state::StateStore;
use super::template::IdSequence;
use super::types::{ServerError, ServerStatus};
use crate::bundle::{BundleError, MockBundle};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::{Mutex, RwLock};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_ATTEMPTS: u16 = 10;

/// Startup options for a [`MockServer`].
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    /// First port tried; 0 lets the OS pick
    pub port: u16,
    /// How many consecutive ports to try while the address is in use
    pub max_attempts: u16,
    /// Mock bundle loaded at startup and on reload
    pub bundle_path: PathBuf,
    /// First value of the `{{auto}}` sequence
    pub first_id: u64,
}

impl ServerOptions {
    pub fn new(bundle_path: impl Into<PathBuf>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            bundle_path: bundle_path.into(),
            first_id: 1,
        }
    }
}

/// State shared between the server handle and its request handlers.
pub struct ServerShared {
    routes: RwLock<Arc<RouteTable>>,
    state: StateStore,
    ids: IdSequence,
}

impl ServerShared {
    pub fn new(routes: RouteTable, first_id: u64) -> Self {
        Self {
            routes: RwLock::new(Arc::new(routes)),
            state: StateStore::new(),
            ids: IdSequence::new(first_id),
        }
    }

    /// The table currently in use.
    pub fn route_table(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes.read())
    }

    /// Replace the table in one swap.
    pub fn swap_routes(&self, routes: RouteTable) {
        *self.routes.write() = Arc::new(routes);
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn ids(&self) -> &IdSequence {
        &self.ids
    }
}

/// Load the bundle for startup: absent or malformed yields an empty table.
fn load_initial_routes(path: &Path) -> RouteTable {
    if !path.exists() {
        info!("No mock bundle at {}, starting with no routes", path.display());
        return RouteTable::default();
    }
    match MockBundle::from_file(path) {
        Ok(bundle) => RouteTable::from_bundle(&bundle),
        Err(e) => {
            warn!("{}; starting with no routes", e);
            RouteTable::default()
        }
    }
}

/// Bind the first port that is not in use, starting at `start`.
async fn bind_with_fallback(
    host: &str,
    start: u16,
    attempts: u16,
) -> Result<TcpListener, ServerError> {
    for offset in 0..attempts.max(1) {
        let Some(port) = start.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                debug!("Port {} is in use, trying the next one", port);
            }
            Err(source) => return Err(ServerError::Bind { port, source }),
        }
    }
    Err(ServerError::PortsExhausted { start, attempts })
}

/// A running (or stopped) mock server.
pub struct MockServer {
    shared: Arc<ServerShared>,
    bundle_path: PathBuf,
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl MockServer {
    /// Bind and start serving.
    pub async fn start(options: ServerOptions) -> Result<Self, ServerError> {
        let listener =
            bind_with_fallback(&options.host, options.port, options.max_attempts).await?;
        let addr = listener.local_addr()?;
        info!("Mock server bound to {}:{}", options.host, addr.port());

        let routes = load_initial_routes(&options.bundle_path);
        info!("Loaded {} mock routes", routes.len());
        let shared = Arc::new(ServerShared::new(routes, options.first_id));

        let (shutdown_tx, _) = broadcast::channel(1);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&shared),
            shutdown_tx.clone(),
        ));

        Ok(Self {
            shared,
            bundle_path: options.bundle_path,
            addr,
            shutdown_tx,
            accept_task: Mutex::new(Some(accept_task)),
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn status(&self) -> ServerStatus {
        if self.accept_task.lock().is_some() {
            ServerStatus::Listening
        } else {
            ServerStatus::Stopped
        }
    }

    pub fn route_count(&self) -> usize {
        self.shared.route_table().len()
    }

    pub fn state(&self) -> &StateStore {
        self.shared.state()
    }

    /// Re-read the bundle and swap in a new route table.
    ///
    /// An absent bundle swaps in an empty table. A bundle that cannot be read
    /// or parsed leaves the current table in place and returns the error.
    /// Recorded state is kept either way.
    pub fn reload(&self) -> Result<usize, BundleError> {
        let routes = if self.bundle_path.exists() {
            RouteTable::from_bundle(&MockBundle::from_file(&self.bundle_path)?)
        } else {
            RouteTable::default()
        };
        let count = routes.len();
        self.shared.swap_routes(routes);
        info!("Mocks reloaded: {} routes", count);
        Ok(count)
    }

    /// Stop accepting connections and close the listener.
    ///
    /// Open connections finish the request they are serving. Stopping twice
    /// is a no-op.
    pub async fn stop(&self) {
        let Some(task) = self.accept_task.lock().take() else {
            return;
        };
        let _ = self.shutdown_tx.send(());
        if let Err(e) = task.await {
            error!("Accept loop on port {} ended abnormally: {}", self.port(), e);
        }
        info!("Mock server on port {} stopped", self.port());
    }
}

async fn accept_loop(
    listener: TcpListener,
    shared: Arc<ServerShared>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let shared = Arc::clone(&shared);
                        let mut conn_shutdown = shutdown_tx.subscribe();
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                handle_mock_request(req, Arc::clone(&shared))
                            });
                            let conn = http1::Builder::new().serve_connection(io, service);
                            tokio::pin!(conn);
                            tokio::select! {
                                result = conn.as_mut() => {
                                    if let Err(e) = result {
                                        debug!("Connection error from {}: {}", addr, e);
                                    }
                                }
                                _ = conn_shutdown.recv() => {
                                    conn.as_mut().graceful_shutdown();
                                    if let Err(e) = conn.as_mut().await {
                                        debug!("Connection error from {} during shutdown: {}", addr, e);
                                    }
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Accept loop shutting down");
                break;
            }
        }
    }
}
