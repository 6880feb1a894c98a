//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::Request;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;

use request_audit::observability::logging::AuditLogFormat;

/// In-memory log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// A subscriber rendering audit lines into `logs`.
pub fn capturing_subscriber(logs: &CapturedLogs) -> impl Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .event_format(AuditLogFormat)
        .with_writer(logs.clone())
        .finish()
}

/// `GET http://127.0.0.1:2379/test?test=test`.
pub fn test_request() -> Request<Body> {
    Request::builder()
        .uri("http://127.0.0.1:2379/test?test=test")
        .body(Body::from("testBody"))
        .unwrap()
}

/// A unique path under the system temp dir.
pub fn temp_log_path(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("{}_{}_{}.log", prefix, std::process::id(), nanos))
}
