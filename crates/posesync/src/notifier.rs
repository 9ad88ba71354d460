use std::thread;

use sequencer::{SelectionNotifier, SyncOutcome, SyncReply};
use tracing::{info, warn};

use crate::client::PoseSyncClient;

/// Runs each selection notification on its own worker thread so the stage
/// never waits for the network.
#[derive(Debug, Clone)]
pub struct ThreadedNotifier {
    client: PoseSyncClient,
}

impl ThreadedNotifier {
    pub fn new(client: PoseSyncClient) -> Self {
        Self { client }
    }
}

impl SelectionNotifier for ThreadedNotifier {
    fn dispatch(&self, reply: SyncReply) {
        let client = self.client.clone();
        let fallback = reply.clone();
        let spawned = thread::Builder::new()
            .name("posesync-notify".into())
            .spawn(move || {
                let outcome = notify_blocking(&client, reply.label());
                reply.resolve(outcome);
            });
        if let Err(err) = spawned {
            warn!(exercise = fallback.label(), %err, "failed to spawn notification worker");
            fallback.resolve(SyncOutcome::Failed(format!(
                "failed to spawn notification worker: {err}"
            )));
        }
    }
}

/// One attempt, outcome always logged.
pub fn notify_blocking(client: &PoseSyncClient, label: &str) -> SyncOutcome {
    match client.select_exercise(label) {
        Ok(()) => {
            info!(exercise = label, "pose backend notified of exercise change");
            SyncOutcome::Delivered
        }
        Err(err) => {
            let reason = format!("{err:#}");
            warn!(exercise = label, error = %reason, "pose backend notification failed");
            SyncOutcome::Failed(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    use crossbeam_channel::unbounded;
    use reqwest::Url;
    use sequencer::RequestId;

    use super::*;
    use crate::client::PoseSyncConfig;

    fn client_for(url: &str) -> PoseSyncClient {
        PoseSyncClient::new(PoseSyncConfig {
            notify_url: Url::parse(url).unwrap(),
            webcam_feed: Url::parse("http://localhost:5001/video_feed").unwrap(),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn read_request(stream: &mut std::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = stream.read(&mut chunk).unwrap();
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let content_length = text[..split]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= split + 4 + content_length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    #[test]
    fn delivers_selection_to_backend() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let body = r#"{"status":"success","message":"Request received"}"#;
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .unwrap();
            request
        });

        let notifier = ThreadedNotifier::new(client_for(&format!("http://{addr}/prompt")));
        let (tx, rx) = unbounded();
        notifier.dispatch(SyncReply::new(RequestId::new(1), "Plank".into(), tx));

        let report = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(report.request, RequestId::new(1));
        assert_eq!(report.outcome, SyncOutcome::Delivered);

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /prompt"));
        assert!(request.contains(r#"{"exercise":"Plank"}"#));
    }

    #[test]
    fn error_status_is_a_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&mut stream);
            stream
                .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
        });

        let outcome = notify_blocking(&client_for(&format!("http://{addr}/prompt")), "Squats");
        server.join().unwrap();
        assert!(matches!(outcome, SyncOutcome::Failed(reason) if reason.contains("400")));
    }

    #[test]
    fn unreachable_backend_reports_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let notifier = ThreadedNotifier::new(client_for(&format!("http://127.0.0.1:{port}/prompt")));
        let (tx, rx) = unbounded();
        notifier.dispatch(SyncReply::new(RequestId::new(7), "Pushups".into(), tx));

        let report = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(report.label, "Pushups");
        assert!(!report.outcome.is_delivered());
    }
}
