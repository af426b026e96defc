//! End-to-end tests against the real binary.
//!
//! Each test starts its own `imakube-backend` process on a free port (selected
//! through the `PORT` environment variable), so a crash only takes down that
//! test's server.
//!
//! Run with: cargo test --test crash_process
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Manages one server process for the duration of a test
struct ServerProcess {
    process: Child,
    port: u16,
}

impl ServerProcess {
    /// Start the binary and wait until it accepts connections
    fn start() -> Self {
        let port = Self::free_port();

        let process = Command::new(env!("CARGO_BIN_EXE_imakube-backend"))
            .env("PORT", port.to_string())
            .env("RUST_LOG", "imakube_backend=warn")
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .expect("Failed to start server");

        let server = Self { process, port };
        server.wait_for_ready();
        server
    }

    fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind ephemeral port");
        listener.local_addr().unwrap().port()
    }

    fn is_listening(&self) -> bool {
        TcpStream::connect(("127.0.0.1", self.port)).is_ok()
    }

    /// Wait for the server to be ready to accept connections
    fn wait_for_ready(&self) {
        let max_attempts = 100;
        let delay = Duration::from_millis(50);

        for _ in 0..max_attempts {
            if self.is_listening() {
                return;
            }
            std::thread::sleep(delay);
        }

        panic!(
            "server did not start within {} seconds",
            max_attempts as f64 * delay.as_secs_f64()
        );
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Poll for process exit, returning its exit code
    fn wait_for_exit(&mut self, timeout: Duration) -> Option<i32> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(status) = self.process.try_wait().expect("Failed to poll server") {
                return status.code();
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn healthz_is_ok_before_crash() {
    let server = ServerProcess::start();
    let client = client();

    for _ in 0..5 {
        let response = client.get(server.url("/healthz")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "OK");
    }
}

#[tokio::test]
async fn crash_delivers_response_then_exits_with_failure() {
    let mut server = ServerProcess::start();
    let client = client();

    let response = client
        .get(server.url("/crash-backend"))
        .send()
        .await
        .expect("crash response must arrive, not a connection reset");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "message": "Backend will crash now" }));

    let code = server.wait_for_exit(Duration::from_secs(2));
    assert_eq!(code, Some(1), "process should exit with status 1");
}

#[tokio::test]
async fn healthz_fails_after_crash() {
    let mut server = ServerProcess::start();
    let client = client();

    let response = client.post(server.url("/crash-backend")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let _ = response.bytes().await.unwrap();

    assert!(server.wait_for_exit(Duration::from_secs(2)).is_some());

    let health = client.get(server.url("/healthz")).send().await;
    assert!(health.is_err(), "healthz after crash must fail at the connection level");
}

#[tokio::test]
async fn end_to_end_endpoints() {
    let server = ServerProcess::start();
    let client = client();

    let body: serde_json::Value = client
        .get(server.url("/iseven?number=7"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({ "is_even": false }));

    let response = client.get(server.url("/iseven")).send().await.unwrap();
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = client
        .get(server.url("/generate-load?n=5"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({ "result": 5 }));

    let response = client
        .request(reqwest::Method::OPTIONS, server.url("/iseven"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
