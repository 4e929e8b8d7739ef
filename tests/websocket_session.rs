//! End-to-end sessions against a local WebSocket server.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use twister_eval::config::{AppConfig, RetryPolicy};
use twister_eval::transport::WebSocketConnector;
use twister_eval::{EvaluationError, Evaluator, Score};

const RESULT_XML: &str = r#"<xml_result><read_sentence><rec_paper><read_sentence total_score="91.5" fluency_score="88.0" is_rejected="false"><sentence><word beg_pos="0" end_pos="30" content="红" symbol="hong2" time_len="30"/></sentence></read_sentence></rec_paper></read_sentence></xml_result>"#;

enum Ending {
    Score,
    CloseWithError,
}

fn local_config(listener: &TcpListener) -> AppConfig {
    let mut config = AppConfig::default();
    config.credentials.app_id = "app".into();
    config.credentials.api_key = "key".into();
    config.credentials.api_secret = "secret".into();
    config.credentials.scheme = "ws".into();
    config.credentials.host = listener.local_addr().unwrap().to_string();
    config.audio.pacing_ms = 0;
    config.session.settle_ms = 0;
    config.session.backoff_ms = 0;
    config
}

/// Accept one session; return the request URI and every frame received.
async fn serve_one(listener: TcpListener, ending: Ending) -> (String, Vec<Value>) {
    let (stream, _) = listener.accept().await.unwrap();
    let (uri_tx, uri_rx) = std::sync::mpsc::channel();

    let mut ws = accept_hdr_async(
        stream,
        move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = uri_tx.send(req.uri().to_string());
            Ok(resp)
        },
    )
    .await
    .unwrap();

    let mut frames = Vec::new();
    while let Some(msg) = ws.next().await {
        let Message::Text(text) = msg.unwrap() else {
            continue;
        };
        let frame: Value = serde_json::from_str(text.as_str()).unwrap();
        let last = frame["data"]["status"] == 2;
        frames.push(frame);
        if last {
            break;
        }
    }

    match ending {
        Ending::Score => {
            let interim = r#"{"code":0,"message":"success","data":{"status":1}}"#;
            let done = format!(
                r#"{{"code":0,"message":"success","sid":"local","data":{{"status":2,"data":"{}"}}}}"#,
                BASE64.encode(RESULT_XML)
            );
            ws.send(Message::Text(interim.to_string().into())).await.unwrap();
            ws.send(Message::Text(done.into())).await.unwrap();
        }
        Ending::CloseWithError => {
            let _ = ws
                .close(Some(CloseFrame {
                    code: CloseCode::Error,
                    reason: "engine failure".into(),
                }))
                .await;
        }
    }

    // let the client close
    while let Some(Ok(_)) = ws.next().await {}

    (uri_rx.recv().unwrap(), frames)
}

#[tokio::test]
async fn scores_a_recording_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = local_config(&listener);
    let server = tokio::spawn(serve_one(listener, Ending::Score));

    let evaluator = Evaluator::new(config, Arc::new(WebSocketConnector));
    let pcm = vec![0x10u8; 96_000];
    let result = evaluator
        .evaluate("红鲤鱼与绿鲤鱼与驴", &pcm)
        .await
        .expect("evaluation should succeed");

    assert_eq!(result.overall, Score::Found(91.5));
    assert_eq!(result.fluency, Score::Found(88.0));
    assert_eq!(result.word_details.len(), 1);
    assert_eq!(result.word_details[0].duration_ms, 300);

    let (uri, frames) = server.await.unwrap();
    assert!(uri.starts_with("/v2/open-ise?authorization="), "{uri}");
    assert!(uri.contains("&date="), "{uri}");
    assert!(uri.contains("&host=127.0.0.1"), "{uri}");

    assert_eq!(frames.len(), 1 + 38);
    assert_eq!(frames[0]["common"]["app_id"], "app");
    assert_eq!(frames[0]["business"]["text"], "\u{FEFF}红鲤鱼与绿鲤鱼与驴");
    assert_eq!(frames[1]["business"]["aus"], 1);
    assert_eq!(frames[38]["business"]["aus"], 4);
}

#[tokio::test]
async fn server_close_without_result_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = local_config(&listener);
    config.session.max_attempts = 1;
    let server = tokio::spawn(serve_one(listener, Ending::CloseWithError));

    let evaluator = Evaluator::new(config, Arc::new(WebSocketConnector));
    let err = evaluator.evaluate("x", &[1u8; 3000]).await.unwrap_err();

    match err {
        EvaluationError::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 1);
            assert!(matches!(*last, EvaluationError::Transport(_)), "{last}");
        }
        other => panic!("expected RetryExhausted, got {other}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn unauthorized_handshake_stops_hardened_retries() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = local_config(&listener);
    config.session.retry_policy = RetryPolicy::Hardened;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ = accept_hdr_async(
            stream,
            |_req: &Request, _resp: Response| -> Result<Response, ErrorResponse> {
                let mut refusal = ErrorResponse::new(Some("HMAC signature mismatch".into()));
                *refusal.status_mut() = StatusCode::UNAUTHORIZED;
                Err(refusal)
            },
        )
        .await;
    });

    let evaluator = Evaluator::new(config, Arc::new(WebSocketConnector));
    let err = evaluator.evaluate("x", &[1u8; 3000]).await.unwrap_err();
    assert!(matches!(err, EvaluationError::Auth(_)), "{err}");
    server.await.unwrap();
}
