//! Tests for run events and completion notifiers.
//!
//! - `finish_reason_tests`: status strings and serde
//! - `channel_notifier_tests`: crossbeam delivery and disconnects
//! - `http_notifier_tests`: callback URL, body and error mapping against a
//!   one-shot local HTTP server

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;

use super::*;

// =============================================================================
// FINISH REASON
// =============================================================================

mod finish_reason_tests {
    use super::*;

    #[test]
    fn status_strings() {
        assert_eq!(FinishReason::Completed.status(), "COMPLETED");
        assert_eq!(FinishReason::Stopped.status(), "STOPPED");
        assert_eq!(FinishReason::Panicked("boom".into()).status(), "FAILED");
        assert!(FinishReason::Panicked("boom".into()).is_failure());
        assert!(!FinishReason::Stopped.is_failure());
    }

    #[test]
    fn display_includes_panic_message() {
        assert_eq!(FinishReason::Stopped.to_string(), "STOPPED");
        assert_eq!(
            FinishReason::Panicked("index out of bounds".into()).to_string(),
            "FAILED (index out of bounds)"
        );
    }

    #[test]
    fn serde_roundtrip_preserves_payload() {
        let reason = FinishReason::Panicked("env died".into());
        let json = serde_json::to_string(&reason).unwrap();
        let back: FinishReason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reason);
    }
}

// =============================================================================
// CHANNEL NOTIFIER
// =============================================================================

mod channel_notifier_tests {
    use super::*;

    #[test]
    fn delivers_finished_event() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let notifier = ChannelNotifier::new(tx);
        notifier.notify("run-1", &FinishReason::Completed).unwrap();

        match rx.try_recv().unwrap() {
            RunEvent::Finished { run_id, reason } => {
                assert_eq!(run_id, "run-1");
                assert_eq!(reason, FinishReason::Completed);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn reports_disconnect() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let notifier = ChannelNotifier::new(tx);
        assert_eq!(
            notifier.notify("run-1", &FinishReason::Stopped),
            Err(NotifyError::Disconnected)
        );
    }
}

// =============================================================================
// HTTP NOTIFIER
// =============================================================================

mod http_notifier_tests {
    use super::*;

    /// Accept one request, reply with `status_line`, return `(request line, body)`.
    fn serve_once(status_line: &'static str) -> (String, thread::JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();

            let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_line);
            stream.write_all(response.as_bytes()).unwrap();
            (request_line.trim().to_string(), String::from_utf8(body).unwrap())
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn builds_callback_url() {
        let notifier = HttpNotifier::new("http://api.local/").unwrap();
        assert_eq!(
            notifier.callback_url("abc"),
            "http://api.local/callbacks/abc/experiment-completed"
        );
    }

    #[test]
    fn posts_status_body() {
        let (base, server) = serve_once("200 OK");
        let notifier = HttpNotifier::new(base).unwrap();
        notifier.notify("run-7", &FinishReason::Stopped).unwrap();

        let (request_line, body) = server.join().unwrap();
        assert_eq!(request_line, "POST /callbacks/run-7/experiment-completed HTTP/1.1");
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "STOPPED" }));
    }

    #[test]
    fn maps_http_error_status() {
        let (base, server) = serve_once("500 Internal Server Error");
        let notifier = HttpNotifier::new(base).unwrap();
        let result = notifier.notify("run-8", &FinishReason::Panicked("x".into()));
        server.join().unwrap();
        assert_eq!(result, Err(NotifyError::Status(500)));
    }

    #[test]
    fn unreachable_server_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier = HttpNotifier::new(format!("http://{}", addr)).unwrap();
        let result = notifier.notify("run-9", &FinishReason::Completed);
        assert!(matches!(result, Err(NotifyError::Transport(_))));
    }
}
