//! WebSocket endpoint for dashboard clients
//!
//! Each connection is an actor that forwards broadcast events as JSON text
//! frames and pings the client on a fixed interval. Client messages other
//! than ping/pong/close are ignored.

use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse, Resource};
use actix_web_actors::ws;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use super::RealtimeEvent;
use crate::api::AppState;
use crate::config::WebSocketConfig;

/// One connected dashboard.
pub struct ReadingSession {
    /// Last time the client showed signs of life.
    hb: Instant,
    events: Option<broadcast::Receiver<RealtimeEvent>>,
    ping_interval: Duration,
    client_timeout: Duration,
}

impl ReadingSession {
    pub fn new(events: broadcast::Receiver<RealtimeEvent>, config: &WebSocketConfig) -> Self {
        Self {
            hb: Instant::now(),
            events: Some(events),
            ping_interval: Duration::from_secs(config.ping_interval),
            client_timeout: Duration::from_secs(config.client_timeout),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.client_timeout;
        ctx.run_interval(self.ping_interval, move |session, ctx| {
            if Instant::now().duration_since(session.hb) > timeout {
                debug!("websocket client timed out, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for ReadingSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.heartbeat(ctx);
        if let Some(events) = self.events.take() {
            ctx.add_stream(BroadcastStream::new(events));
        }
        debug!("websocket client connected");
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        debug!("websocket client disconnected");
    }
}

/// Broadcast events → client.
impl StreamHandler<Result<RealtimeEvent, BroadcastStreamRecvError>> for ReadingSession {
    fn handle(
        &mut self,
        item: Result<RealtimeEvent, BroadcastStreamRecvError>,
        ctx: &mut Self::Context,
    ) {
        match item {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => ctx.text(json),
                Err(err) => warn!(error = %err, "failed to serialize realtime event"),
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "websocket client lagged, readings dropped");
            }
        }
    }
}

/// Client frames.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ReadingSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                debug!(error = %err, "websocket protocol error");
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Ping(bytes) => {
                self.hb = Instant::now();
                ctx.pong(&bytes);
            }
            ws::Message::Pong(_) => {
                self.hb = Instant::now();
            }
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Text(_) | ws::Message::Binary(_) => {
                self.hb = Instant::now();
            }
            ws::Message::Continuation(_) | ws::Message::Nop => {}
        }
    }
}

async fn stream_readings(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = ReadingSession::new(
        state.ingestor.broadcaster().subscribe(),
        &state.config.websocket,
    );
    ws::start(session, &req, stream)
}

/// `GET /ws`
pub fn websocket_route() -> Resource {
    web::resource("/ws").route(web::get().to(stream_readings))
}
