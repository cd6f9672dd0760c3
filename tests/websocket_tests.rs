//! `GET /ws` against a real listening server.

use std::time::Duration;

use actix_web::{web, App};
use awc::ws::Frame;
use futures_util::StreamExt;
use serde_json::{json, Value};

use cardio_dashboard::api::{self, middleware, AppState};
use cardio_dashboard::config::Config;
use cardio_dashboard::websocket;

fn start_server(state: web::Data<AppState>) -> actix_test::TestServer {
    actix_test::start(move || {
        App::new()
            .app_data(state.clone())
            .app_data(middleware::json_config())
            .configure(api::configure)
            .service(websocket::server::websocket_route())
    })
}

/// Next text frame, skipping control frames.
async fn next_text<S>(framed: &mut S) -> Value
where
    S: futures_util::Stream<Item = Result<Frame, awc::error::WsProtocolError>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), framed.next())
            .await
            .expect("no websocket frame within 5s")
            .expect("websocket closed")
            .expect("websocket protocol error");
        if let Frame::Text(bytes) = frame {
            return serde_json::from_slice(&bytes).unwrap();
        }
    }
}

#[actix_web::test]
async fn client_receives_new_reading_event() {
    let state = web::Data::new(AppState::new(Config::default()));
    let mut srv = start_server(state.clone());

    let mut framed = srv.ws_at("/ws").await.unwrap();
    assert_eq!(state.ingestor.broadcaster().subscriber_count(), 1);

    let mut response = srv
        .post("/api/readings")
        .send_json(&json!({"deviceId": "bed-4", "hr": 150, "sbp": 145, "dbp": 95, "spo2": 90}))
        .await
        .unwrap();
    assert!(response.status().is_success());
    let ack: Value = response.json().await.unwrap();

    let message = next_text(&mut framed).await;
    assert_eq!(message["event"], "new_reading");
    assert_eq!(message["data"]["id"], ack["data"]["id"]);
    assert_eq!(message["data"]["deviceId"], "bed-4");
    assert_eq!(message["data"]["prediction"]["riskLevel"], "High");
}

#[actix_web::test]
async fn every_connected_client_gets_each_reading_once() {
    let state = web::Data::new(AppState::new(Config::default()));
    let mut srv = start_server(state.clone());

    let mut first = srv.ws_at("/ws").await.unwrap();
    let mut second = srv.ws_at("/ws").await.unwrap();

    for hr in [70, 71] {
        srv.post("/api/readings")
            .send_json(&json!({"hr": hr}))
            .await
            .unwrap();
    }

    for framed in [&mut first, &mut second] {
        let a = next_text(framed).await;
        let b = next_text(framed).await;
        assert_eq!(a["data"]["hr"], 70.0);
        assert_eq!(b["data"]["hr"], 71.0);
    }
}
