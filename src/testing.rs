//! Fake core services for tests: real actix-web servers on an ephemeral port
//! answering canned responses by path. Also a backbone that never acknowledges.

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::messaging::{Envelope, EventBackbone};

/// Nothing listens on port 1, connections are refused.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

struct FakeState {
    routes: HashMap<String, (u16, String)>,
    hits: Arc<AtomicUsize>,
}

pub struct FakeBackend {
    pub url: String,
    hits: Arc<AtomicUsize>,
    handle: ServerHandle,
}

#[derive(Default)]
pub struct FakeBackendBuilder {
    routes: HashMap<String, (u16, String)>,
}

impl FakeBackend {
    pub fn start() -> FakeBackendBuilder {
        FakeBackendBuilder::default()
    }

    /// Requests received so far, matched or not.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        let _ = self.handle.stop(false);
    }
}

impl FakeBackendBuilder {
    /// Answer `path` (query string ignored) with `status` and a JSON `body`.
    pub fn route(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(path.to_string(), (status, body.to_string()));
        self
    }

    pub async fn spawn(self) -> FakeBackend {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = web::Data::new(FakeState {
            routes: self.routes,
            hits: hits.clone(),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .default_service(web::to(respond))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("fake backend should bind to an ephemeral port");

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        tokio::spawn(server);

        FakeBackend {
            url: format!("http://{}", addr),
            hits,
            handle,
        }
    }
}

async fn respond(req: HttpRequest, state: web::Data<FakeState>) -> HttpResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    match state.routes.get(req.path()) {
        Some((status, body)) => HttpResponse::build(
            StatusCode::from_u16(*status).expect("fake route status should be valid"),
        )
        .content_type("application/json")
        .body(body.clone()),
        None => HttpResponse::NotFound().finish(),
    }
}

/// Backbone whose sends stay pending for an hour, like a broker that stopped
/// acknowledging.
#[derive(Debug, Default)]
pub struct StalledBackbone {
    started: AtomicUsize,
}

impl StalledBackbone {
    /// Sends that reached the backbone and are still waiting.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventBackbone for StalledBackbone {
    async fn send(&self, _topic: &str, _envelope: &Envelope) -> anyhow::Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}
