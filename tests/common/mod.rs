#![allow(dead_code)]

use serde_json::Value;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Child, Command};
use std::thread;
use std::time::{Duration, Instant};

pub struct Server {
    child: Child,
    pub base: String,
    db_path: PathBuf,
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.db_path);
    }
}

/// Spawns the service binary on a free port with a fresh store file.
pub fn start_server(name: &str, schema: &str) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind failed");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let db_path = std::env::temp_dir().join(format!("roadgraph_test_{}_{}.redb", name, port));
    if db_path.exists() {
        let _ = std::fs::remove_file(&db_path);
    }

    let exe = env!("CARGO_BIN_EXE_roadgraph");
    let child = Command::new(exe)
        .env("ROADGRAPH_HOST", "127.0.0.1")
        .env("ROADGRAPH_PORT", port.to_string())
        .env("ROADGRAPH_DB_PATH", &db_path)
        .env("ROADGRAPH_SCHEMA", schema)
        .spawn()
        .expect("failed to start server");
    let server = Server {
        child,
        base: format!("http://127.0.0.1:{}", port),
        db_path,
    };
    wait_for_port(SocketAddr::from(([127, 0, 0, 1], port)));
    server
}

fn wait_for_port(addr: SocketAddr) {
    let start = Instant::now();
    loop {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        if start.elapsed() > Duration::from_secs(5) {
            panic!("server did not start in time");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Sends a request and returns the status and JSON body, including for 4xx/5xx.
pub fn request_json(method: &str, url: &str, body: Option<&Value>) -> (u16, Value) {
    let builder = ureq::request(method, url);
    let result = match body {
        Some(body) => builder
            .set("content-type", "application/json")
            .send_json(body),
        None => builder.call(),
    };
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(error) => panic!("request failed: {error}"),
    };
    let status = response.status();
    let body = response.into_json().unwrap_or(Value::Null);
    (status, body)
}
