use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::json;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, info, warn};

use super::handler::{MAX_BODY_BYTES, MalformedInputError, Reply, RequestError, handle_predict};
use super::store::ArtifactStore;
use super::{ErrorStatusMode, ServeError};
use crate::config::ServingSettings;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Single-threaded HTTP front of the predict route.
pub struct PredictServer {
    server: Server,
    route: String,
    store: ArtifactStore,
    mode: ErrorStatusMode,
}

impl PredictServer {
    /// Bind using serving settings, opening the artifact store they describe.
    pub fn bind(settings: &ServingSettings) -> Result<Self, ServeError> {
        let store = ArtifactStore::open(&settings.artifact, settings.cache_artifact)?;
        Self::with_store(&settings.bind, &settings.route, store, settings.error_status)
    }

    pub fn with_store(
        bind: &str,
        route: &str,
        store: ArtifactStore,
        mode: ErrorStatusMode,
    ) -> Result<Self, ServeError> {
        let server = Server::http(bind).map_err(|err| ServeError::Bind {
            addr: bind.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            server,
            route: route.to_string(),
            store,
            mode,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Answer requests one at a time until `shutdown` is set.
    pub fn run(&self, shutdown: &AtomicBool) -> Result<(), ServeError> {
        if let Some(addr) = self.local_addr() {
            info!("Serving POST {} on http://{addr}", self.route);
        }
        while !shutdown.load(Ordering::Relaxed) {
            if let Some(request) = self.server.recv_timeout(POLL_INTERVAL)? {
                self.handle(request);
            }
        }
        info!("Server stopped");
        Ok(())
    }

    fn handle(&self, mut request: Request) {
        let path = request.url().split('?').next().unwrap_or_default().to_string();
        debug!(method = %request.method(), path = %path, "Request");
        let reply = if path != self.route {
            Reply {
                status: 404,
                body: json!({ "error": format!("no route for {path}"), "kind": "not_found" }),
            }
        } else if *request.method() != Method::Post {
            Reply {
                status: 405,
                body: json!({ "error": "only POST is supported", "kind": "method_not_allowed" }),
            }
        } else {
            match read_body(&mut request) {
                Ok(body) => handle_predict(&body, &self.store, self.mode),
                Err(err) => {
                    warn!("Rejected predict request: {err}");
                    Reply::error(&RequestError::from(err), self.mode)
                }
            }
        };
        respond(request, reply);
    }
}

fn read_body(request: &mut Request) -> Result<Vec<u8>, MalformedInputError> {
    let mut body = Vec::new();
    request
        .as_reader()
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|err| MalformedInputError::new(format!("failed to read body: {err}")))?;
    if body.len() > MAX_BODY_BYTES {
        return Err(MalformedInputError::new(format!(
            "body exceeds {MAX_BODY_BYTES} bytes"
        )));
    }
    Ok(body)
}

fn respond(request: Request, reply: Reply) {
    let mut response = Response::from_string(reply.body.to_string()).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(header);
    }
    if let Err(err) = request.respond(response) {
        warn!("Failed to send response: {err}");
    }
}
