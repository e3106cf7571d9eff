//! ledgerd request service core
//!
//! A loopback TCP server carrying newline-delimited JSON envelopes
//! `{id, type, data}` where `type` is a `module/function` pair. Connections
//! are full duplex and persistent: the server greets with an `auth` prompt,
//! requires a successful `login/login` before anything but `login` is
//! dispatched, and answers every request with an envelope echoing `id` and
//! `type`. One task per connection; requests on a connection are consumed
//! and answered strictly in order.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info};

use ledgerd_core::{
    Database, IntentNotifier, Notifier, Result, Sandbox, ServiceLog, TokenManager, VersionManager,
};

mod envelope;
pub mod handlers;
mod router;

pub use envelope::Envelope;
pub use router::{dispatch, Module};

/// The fixed service port.
pub const DEFAULT_PORT: u16 = 52045;

/// Database file name inside the workspace.
pub const DB_FILE: &str = "auto_v2.db";

/// A frame larger than this is a protocol violation and drops the connection.
const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Everything a handler can reach, initialized once at worker start in
/// dependency order: storage, logger, tokens, version, sandbox, notifier.
pub struct ServiceContext {
    pub db: Arc<Database>,
    pub log: Arc<ServiceLog>,
    pub tokens: TokenManager,
    pub version: VersionManager,
    pub sandbox: Sandbox,
    pub notifier: Arc<dyn Notifier>,
}

impl ServiceContext {
    /// Bring the service up on a workspace directory. Passing no notifier
    /// wires in the production intent launcher; tests substitute a recorder.
    pub fn init(
        workspace: &Path,
        debug: bool,
        publish_root: std::path::PathBuf,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Result<Self> {
        let db = Arc::new(Database::open(&workspace.join(DB_FILE))?);
        let log = Arc::new(ServiceLog::new(db.clone(), debug));
        let tokens = TokenManager::new(db.clone(), log.clone(), publish_root);
        tokens.bootstrap(workspace);
        let version = VersionManager::load(workspace)?;
        let sandbox = Sandbox::new(log.clone());
        let notifier = notifier.unwrap_or_else(|| Arc::new(IntentNotifier::new(log.clone())));
        Ok(Self {
            db,
            log,
            tokens,
            version,
            sandbox,
            notifier,
        })
    }
}

struct ServerState {
    ctx: Arc<ServiceContext>,
    /// Connections that have passed `login/login`, by connection id.
    authenticated: Mutex<HashSet<u64>>,
    next_conn: AtomicU64,
}

impl ServerState {
    fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            authenticated: Mutex::new(HashSet::new()),
            next_conn: AtomicU64::new(1),
        }
    }

    fn is_authenticated(&self, conn: u64) -> bool {
        self.authenticated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&conn)
    }

    fn set_authenticated(&self, conn: u64) {
        self.authenticated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(conn);
    }

    fn forget(&self, conn: u64) {
        self.authenticated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&conn);
    }

    /// Turn one request line into one reply line. The bool asks the
    /// connection loop to close after sending.
    fn process(&self, conn: u64, line: &str) -> (String, bool) {
        let request: Envelope = match serde_json::from_str(line) {
            Ok(env) => env,
            Err(e) => {
                debug!("unparseable frame: {e}");
                let reply = Envelope::new("", "", Value::from(format!("invalid envelope: {e}")));
                return (reply.to_line(), false);
            }
        };

        let Some((module, function)) = request.split_kind() else {
            let reply = Envelope::new(
                request.id.clone(),
                request.kind.clone(),
                Value::from("invalid request type"),
            );
            return (reply.to_line(), false);
        };

        if module != "login" && !self.is_authenticated(conn) {
            let reply = Envelope::new(
                request.id.clone(),
                request.kind.clone(),
                Value::from("Unauthorized"),
            );
            return (reply.to_line(), true);
        }

        let result = match Module::parse(module) {
            None => Value::from(format!("unknown module: {module}")),
            Some(m) => match dispatch(&self.ctx, m, function, &request.data) {
                Ok(value) => value,
                Err(e) => {
                    self.ctx
                        .log
                        .error(&format!("{module}/{function} failed: {e}"));
                    Value::from(e.to_string())
                }
            },
        };

        if module == "login" && result.get("status").and_then(Value::as_i64) == Some(0) {
            self.set_authenticated(conn);
        }

        let reply = Envelope::new(request.id.clone(), request.kind.clone(), result);
        (reply.to_line(), false)
    }
}

/// Bind the fixed loopback port and run forever. A bind failure propagates
/// to the caller (the supervisor treats it as fatal).
pub async fn serve(ctx: Arc<ServiceContext>, port: u16) -> std::io::Result<()> {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {addr}");
    serve_on(ctx, listener).await
}

/// Accept loop over an already-bound listener (tests bind port 0).
pub async fn serve_on(ctx: Arc<ServiceContext>, listener: TcpListener) -> std::io::Result<()> {
    let state = Arc::new(ServerState::new(ctx));
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    handle_connection(state, stream, peer).await;
                });
            }
            // Out of descriptors: the process cannot serve anyone until it
            // is restarted, so surface it (EMFILE = 24, ENFILE = 23).
            Err(e) if matches!(e.raw_os_error(), Some(23) | Some(24)) => return Err(e),
            Err(e) => {
                state.ctx.log.error(&format!("accept failed: {e}"));
            }
        }
    }
}

async fn handle_connection(state: Arc<ServerState>, stream: TcpStream, peer: SocketAddr) {
    let conn = state.next_conn.fetch_add(1, Ordering::SeqCst);
    debug!("connection {conn} from {peer}");

    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_LEN));

    // The greeting tells the client to present credentials first.
    if framed.send(json!({"type": "auth"}).to_string()).await.is_err() {
        return;
    }

    while let Some(frame) = framed.next().await {
        let line = match frame {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        let (reply, close) = state.process(conn, &line);
        if framed.send(reply).await.is_err() {
            break;
        }
        if close {
            break;
        }
    }

    state.forget(conn);
    debug!("connection {conn} closed");
}
