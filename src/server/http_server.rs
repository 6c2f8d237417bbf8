use super::service::AppService;
use crate::app::App;
use may::coroutine::JoinHandle;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::info;

/// Information about a running server, reachable from the app while the
/// server is alive (see [`App::server`]).
#[derive(Debug)]
pub struct ServerInfo {
    addr: SocketAddr,
    started_at: SystemTime,
    alive: AtomicBool,
}

impl ServerInfo {
    pub(crate) fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            started_at: SystemTime::now(),
            alive: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn mark_stopped(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// HTTP transport for a warmed-up [`App`].
pub struct HttpServer {
    app: Arc<App>,
}

/// Handle to a running HTTP server.
pub struct ServerHandle {
    info: Arc<ServerInfo>,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.info.addr()
    }

    #[must_use]
    pub fn info(&self) -> &Arc<ServerInfo> {
        &self.info
    }

    /// Poll the listening address until it accepts connections.
    ///
    /// # Errors
    ///
    /// `TimedOut` if the server is not reachable within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.info.addr()).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting connections and wait for the server coroutine.
    pub fn stop(self) {
        self.info.mark_stopped();
        // SAFETY: the handle is owned here and cancelling the accept loop is
        // the intended shutdown path for may coroutines.
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
        info!(addr = %self.info.addr(), "Server stopped");
    }

    /// Block until the server coroutine exits.
    ///
    /// # Errors
    ///
    /// If the server coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        let result = self.handle.join();
        self.info.mark_stopped();
        result
    }
}

impl HttpServer {
    #[must_use]
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    /// Bind `addr` and start serving.
    ///
    /// # Errors
    ///
    /// Invalid addresses and bind failures.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle =
            may_minihttp::HttpServer(AppService::new(Arc::clone(&self.app))).start(addr)?;
        let info = Arc::new(ServerInfo::new(addr));
        self.app.attach_server(Arc::clone(&info));
        info!(addr = %addr, mode = %self.app.mode(), "Server started");
        Ok(ServerHandle { info, handle })
    }
}
