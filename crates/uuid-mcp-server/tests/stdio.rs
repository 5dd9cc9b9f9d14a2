use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Lines, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

struct Server {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Server {
    fn spawn() -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_uuid-mcp-server"))
            .env("RUST_LOG", "debug")
            .env("LOG_FORMAT", "compact")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to start uuid-mcp-server");
        let stdin = child.stdin.take();
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout")).lines();
        Self {
            child,
            stdin,
            stdout,
        }
    }

    fn send(&mut self, frame: Value) {
        let stdin = self.stdin.as_mut().expect("stdin open");
        writeln!(stdin, "{frame}").unwrap();
        stdin.flush().unwrap();
    }

    fn recv(&mut self) -> Value {
        let line = self
            .stdout
            .next()
            .expect("server closed stdout")
            .expect("read failed");
        serde_json::from_str(&line).expect("stdout carries only JSON frames")
    }

    fn request(&mut self, frame: Value) -> Value {
        self.send(frame);
        self.recv()
    }

    fn wait(mut self, timeout: Duration) -> std::process::ExitStatus {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait().unwrap() {
                return status;
            }
            if Instant::now() > deadline {
                let _ = self.child.kill();
                panic!("server did not exit within {timeout:?}");
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

fn initialize(server: &mut Server) {
    let response = server.request(json!({
        "jsonrpc": "2.0",
        "id": 0,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "integration", "version": "0.0.0"}
        }
    }));
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    server.send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}));
}

fn is_v4(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, &b)| match i {
            8 | 13 | 18 | 23 => b == b'-',
            14 => b == b'4',
            19 => matches!(b, b'8' | b'9' | b'a' | b'b'),
            _ => b.is_ascii_digit() || (b'a'..=b'f').contains(&b),
        })
}

#[test]
fn full_session_over_stdio() {
    let mut server = Server::spawn();
    initialize(&mut server);

    let listed = server.request(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}));
    let tools = listed["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "generate_uuid");
    assert_eq!(tools[0]["inputSchema"]["required"], json!([]));

    let first = server.request(json!({
        "jsonrpc": "2.0", "id": 2, "method": "tools/call",
        "params": {"name": "generate_uuid"}
    }));
    let second = server.request(json!({
        "jsonrpc": "2.0", "id": 3, "method": "tools/call",
        "params": {"name": "generate_uuid", "arguments": {"ignored": true}}
    }));
    let first = first["result"]["content"][0]["text"].as_str().unwrap().to_string();
    let second = second["result"]["content"][0]["text"].as_str().unwrap().to_string();
    assert!(is_v4(&first), "{first}");
    assert!(is_v4(&second), "{second}");
    assert_ne!(first, second);

    let unknown = server.request(json!({
        "jsonrpc": "2.0", "id": 4, "method": "tools/call",
        "params": {"name": "nonexistent_tool"}
    }));
    assert_eq!(unknown["id"], 4);
    assert_eq!(unknown["error"]["code"], -32601);
    assert!(
        unknown["error"]["message"]
            .as_str()
            .unwrap()
            .contains("nonexistent_tool")
    );

    // EOF on stdin ends the session cleanly.
    drop(server.stdin.take());
    let status = server.wait(Duration::from_secs(10));
    assert!(status.success(), "{status:?}");
}

#[cfg(unix)]
#[test]
fn sigint_exits_with_status_zero() {
    let mut server = Server::spawn();
    // A completed round trip guarantees the signal handlers are installed.
    initialize(&mut server);
    let pong = server.request(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}));
    assert_eq!(pong["result"], json!({}));

    let status = Command::new("kill")
        .args(["-INT", &server.child.id().to_string()])
        .status()
        .expect("failed to run kill");
    assert!(status.success());

    let status = server.wait(Duration::from_secs(10));
    assert_eq!(status.code(), Some(0), "{status:?}");
}
