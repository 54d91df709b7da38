use std::io::Read;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::core::{History, Responder};
use crate::ui;

/// Larger request bodies are cut off before parsing.
const MAX_BODY_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    history: History,
}

#[derive(Debug, Serialize)]
struct ChatReply<'a> {
    history: History,
    mode: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ClearRequest {
    #[serde(default)]
    history: History,
}

#[derive(Debug, Serialize)]
struct ClearReply {
    history: History,
}

#[derive(Debug, Serialize)]
struct StatusReply<'a> {
    mode: &'a str,
    model: &'a str,
    topics: Vec<&'a str>,
}

/// What to send back for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body }
    }

    fn css(body: &str) -> Self {
        Self { status: 200, content_type: "text/css; charset=utf-8", body: body.to_string() }
    }

    fn text(status: u16, body: &str) -> Self {
        Self { status, content_type: "text/plain; charset=utf-8", body: body.to_string() }
    }

    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status: 200, content_type: "application/json", body },
            Err(e) => {
                log::error!("❌ Failed to encode reply: {}", e);
                Self::text(500, "Internal Server Error")
            }
        }
    }
}

/// Routes one request to the responder or the static page.
pub fn handle(responder: &mut Responder, title: &str, method: &Method, url: &str, body: &str) -> Reply {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (Method::Get, "/") | (Method::Get, "/index.html") => Reply::html(ui::index_page(title)),
        (Method::Get, "/style.css") => Reply::css(ui::STYLE_CSS),
        (Method::Get, "/health") => Reply::text(200, "OK"),
        (Method::Get, "/api/status") => Reply::json(&StatusReply {
            mode: responder.mode(),
            model: responder.backend_name(),
            topics: responder.rules().topics(),
        }),
        (Method::Post, "/api/chat") => match serde_json::from_str::<ChatRequest>(body) {
            Ok(request) => {
                log::info!("💬 Message received ({} chars)", request.message.chars().count());
                let history = responder.respond(&request.message, request.history);
                Reply::json(&ChatReply { history, mode: responder.mode() })
            }
            Err(e) => {
                log::warn!("⚠️ Bad chat request: {}", e);
                Reply::text(400, "Bad Request")
            }
        },
        (Method::Post, "/api/clear") => {
            let mut history = serde_json::from_str::<ClearRequest>(body)
                .unwrap_or_default()
                .history;
            log::info!("🗑️ Chat cleared ({} turns dropped)", history.len());
            history.clear();
            Reply::json(&ClearReply { history })
        }
        (_, "/" | "/index.html" | "/style.css" | "/health" | "/api/status" | "/api/chat" | "/api/clear") => {
            Reply::text(405, "Method Not Allowed")
        }
        _ => Reply::text(404, "Not Found"),
    }
}

/// Like [`handle`], for a raw request body; bodies that are not UTF-8 get a 400.
pub fn handle_bytes(responder: &mut Responder, title: &str, method: &Method, url: &str, body: &[u8]) -> Reply {
    match std::str::from_utf8(body) {
        Ok(body) => handle(responder, title, method, url, body),
        Err(e) => {
            log::warn!("⚠️ Request body is not UTF-8: {}", e);
            Reply::text(400, "Bad Request")
        }
    }
}

/// Local HTTP front end for the chat page.
pub struct ChatServer {
    server: Server,
    title: String,
}

impl ChatServer {
    pub fn bind(addr: &str, title: &str) -> Result<Self> {
        let server = Server::http(addr).map_err(|e| anyhow!("failed to bind {}: {}", addr, e))?;
        log::info!("🌐 Listening on http://{}", addr);
        Ok(Self {
            server,
            title: title.to_string(),
        })
    }

    /// Serves requests one at a time until the listener shuts down.
    pub fn serve(self, mut responder: Responder) {
        for request in self.server.incoming_requests() {
            if let Err(e) = self.answer(request, &mut responder) {
                log::error!("❌ Failed to answer request: {}", e);
            }
        }
    }

    fn answer(&self, mut request: Request, responder: &mut Responder) -> Result<()> {
        let mut body = Vec::new();
        if *request.method() == Method::Post {
            request
                .as_reader()
                .take(MAX_BODY_BYTES)
                .read_to_end(&mut body)?;
        }

        let method = request.method().clone();
        let url = request.url().to_string();
        let reply = handle_bytes(responder, &self.title, &method, &url, &body);
        log::debug!("{} {} -> {}", method, url, reply.status);

        let mut response = Response::from_string(reply.body).with_status_code(StatusCode(reply.status));
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            response.add_header(header);
        }
        request.respond(response)?;
        Ok(())
    }
}
