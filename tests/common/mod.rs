#![allow(dead_code)]

use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::Value;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub const PASSWORD: &str = "test-secret";

pub struct TestServer {
    pub base_url: String,
    pub data_dir: PathBuf,
    child: Child,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join("data.json")
    }

    /// Logs in with the test password and returns the session token.
    pub async fn login(&self, client: &Client) -> String {
        let body: Value = client
            .post(self.url("/api/login"))
            .json(&serde_json::json!({ "password": PASSWORD }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["success"], Value::Bool(true));
        body["token"].as_str().expect("token").to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

#[cfg(unix)]
mod cleanup {
    use super::Lazy;
    use std::sync::{Mutex, Once};

    static REGISTER: Once = Once::new();
    static PIDS: Lazy<Mutex<Vec<i32>>> = Lazy::new(|| Mutex::new(Vec::new()));

    pub fn register(pid: u32) {
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid as i32);
        }
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for pid in pids.iter().copied().filter(|pid| *pid > 0) {
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("gantt_board_http_{}_{}", std::process::id(), nanos));
    path
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/tasks")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

pub async fn spawn_server() -> TestServer {
    spawn_seeded(&[]).await
}

/// Starts the binary on a fresh data directory pre-filled with `files`
/// (file name, raw contents).
pub async fn spawn_seeded(files: &[(&str, &str)]) -> TestServer {
    let port = pick_free_port();
    let data_dir = unique_data_dir();
    std::fs::create_dir_all(&data_dir).expect("create data dir");
    for (name, contents) in files {
        std::fs::write(data_dir.join(name), contents).expect("seed data file");
    }

    let child = Command::new(env!("CARGO_BIN_EXE_gantt_board"))
        .env("PORT", port.to_string())
        .env("GANTT_DATA_DIR", &data_dir)
        .env("GANTT_ADMIN_PASSWORD", PASSWORD)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    let server = TestServer {
        base_url,
        data_dir,
        child,
    };
    wait_until_ready(&server.base_url).await;
    server
}
