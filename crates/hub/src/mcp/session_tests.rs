// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Minimal MCP responder used by most tests.
const STUB_SERVER: &str = r#"
import sys, json
for line in sys.stdin:
    line = line.strip()
    if not line:
        continue
    req = json.loads(line)
    if "id" not in req:
        continue
    m = req["method"]
    if m == "initialize":
        res = {"protocolVersion": "2024-11-05", "capabilities": {"tools": {}}, "serverInfo": {"name": "stub", "version": "1.0"}}
    elif m == "tools/list":
        res = {"tools": [{"name": "echo", "description": "Echo a message", "inputSchema": {"type": "object", "properties": {"msg": {"type": "string"}}, "required": ["msg"]}}]}
    elif m == "resources/list":
        res = {"resources": [{"uri": "stub://data", "name": "data"}]}
    elif m == "prompts/list":
        res = {"prompts": [{"name": "greeting"}]}
    elif m == "tools/call":
        res = {"content": [{"type": "text", "text": req["params"]["arguments"]["msg"]}]}
    else:
        res = {}
    sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": req["id"], "result": res}) + "\n")
    sys.stdout.flush()
"#;

fn spawn_session(script: &str, timeouts: SessionTimeouts) -> (Child, std::sync::Arc<McpSession>) {
    let mut child = Command::new("python3")
        .arg("-c")
        .arg(script)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap();
    let stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let session = McpSession::new(stdin, stdout, "test", timeouts);
    (child, session)
}

async fn finish(session: std::sync::Arc<McpSession>, mut child: Child) {
    session.close().await;
    let _ = child.wait().await;
}

mod handshake {
    use super::*;

    #[tokio::test]
    async fn initialize_completes_and_records_server_info() {
        let (child, session) = spawn_session(STUB_SERVER, SessionTimeouts::default());

        let init = session.initialize().await.unwrap();
        assert_eq!(init.protocol_version, "2024-11-05");
        assert_eq!(init.server_info.name, "stub");
        assert!(session.is_initialized());
        assert_eq!(session.server_info().unwrap().server_info.name, "stub");

        finish(session, child).await;
    }

    #[tokio::test]
    async fn initialize_twice_is_rejected() {
        let (child, session) = spawn_session(STUB_SERVER, SessionTimeouts::default());

        session.initialize().await.unwrap();
        assert!(matches!(
            session.initialize().await,
            Err(SessionError::AlreadyInitialized)
        ));

        finish(session, child).await;
    }

    #[tokio::test]
    async fn operations_require_initialization() {
        let (child, session) = spawn_session(STUB_SERVER, SessionTimeouts::default());

        assert!(matches!(
            session.list_tools().await,
            Err(SessionError::NotInitialized)
        ));
        assert!(matches!(
            session
                .call_tool("echo", serde_json::Map::new())
                .await,
            Err(SessionError::NotInitialized)
        ));

        finish(session, child).await;
    }
}

mod discovery {
    use super::*;

    #[tokio::test]
    async fn listings_return_discovered_surfaces() {
        let (child, session) = spawn_session(STUB_SERVER, SessionTimeouts::default());
        session.initialize().await.unwrap();

        let tools = session.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");

        let resources = session.list_resources().await.unwrap();
        assert_eq!(resources[0].identifier(), "data");

        let prompts = session.list_prompts().await.unwrap();
        assert_eq!(prompts[0].name, "greeting");

        finish(session, child).await;
    }
}

mod tool_calls {
    use super::*;

    #[tokio::test]
    async fn call_tool_round_trips_text() {
        let (child, session) = spawn_session(STUB_SERVER, SessionTimeouts::default());
        session.initialize().await.unwrap();

        let mut args = serde_json::Map::new();
        args.insert("msg".into(), serde_json::json!("hello"));
        let result = session.call_tool("echo", args).await.unwrap();
        assert_eq!(result.into_text(), "hello");

        finish(session, child).await;
    }

    #[tokio::test]
    async fn concurrent_calls_are_correlated_by_id() {
        // Responds to tool calls in pairs, in reverse arrival order, so
        // correlation cannot rely on ordering.
        const REVERSING_SERVER: &str = r#"
import sys, json
pending = []
for line in sys.stdin:
    req = json.loads(line.strip() or "{}")
    if "id" not in req:
        continue
    if req["method"] == "initialize":
        sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": req["id"], "result": {"protocolVersion": "2024-11-05", "capabilities": {}, "serverInfo": {"name": "stub"}}}) + "\n")
        sys.stdout.flush()
        continue
    pending.append(req)
    if len(pending) == 2:
        for r in reversed(pending):
            sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": r["id"], "result": {"content": [{"type": "text", "text": "id-%d" % r["id"]}]}}) + "\n")
        sys.stdout.flush()
        pending = []
"#;

        let (child, session) = spawn_session(REVERSING_SERVER, SessionTimeouts::default());
        session.initialize().await.unwrap();

        let first = session.call_tool("a", serde_json::Map::new());
        let second = session.call_tool("b", serde_json::Map::new());
        let (first, second) = tokio::join!(first, second);

        // initialize took id 1; the two calls take 2 and 3 in issue order.
        assert_eq!(first.unwrap().into_text(), "id-2");
        assert_eq!(second.unwrap().into_text(), "id-3");

        finish(session, child).await;
    }
}

mod robustness {
    use super::*;

    #[tokio::test]
    async fn garbage_lines_do_not_break_callers() {
        const NOISY_SERVER: &str = r#"
import sys, json
for line in sys.stdin:
    req = json.loads(line.strip() or "{}")
    if "id" not in req:
        continue
    sys.stdout.write("startup noise, definitely not json\n")
    if req["method"] == "initialize":
        res = {"protocolVersion": "2024-11-05", "capabilities": {}, "serverInfo": {"name": "noisy"}}
    else:
        res = {"tools": []}
    sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": req["id"], "result": res}) + "\n")
    sys.stdout.flush()
"#;

        let (child, session) = spawn_session(NOISY_SERVER, SessionTimeouts::default());
        session.initialize().await.unwrap();
        let tools = session.list_tools().await.unwrap();
        assert!(tools.is_empty());

        finish(session, child).await;
    }

    #[tokio::test]
    async fn unknown_response_ids_are_discarded() {
        const SPURIOUS_SERVER: &str = r#"
import sys, json
for line in sys.stdin:
    req = json.loads(line.strip() or "{}")
    if "id" not in req:
        continue
    if req["method"] == "initialize":
        res = {"protocolVersion": "2024-11-05", "capabilities": {}, "serverInfo": {"name": "spurious"}}
    else:
        sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": 999, "result": {}}) + "\n")
        res = {"tools": []}
    sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": req["id"], "result": res}) + "\n")
    sys.stdout.flush()
"#;

        let (child, session) = spawn_session(SPURIOUS_SERVER, SessionTimeouts::default());
        session.initialize().await.unwrap();
        let tools = session.list_tools().await.unwrap();
        assert!(tools.is_empty());

        finish(session, child).await;
    }

    #[tokio::test]
    async fn remote_errors_surface_without_closing_the_session() {
        const ERRORING_SERVER: &str = r#"
import sys, json
for line in sys.stdin:
    req = json.loads(line.strip() or "{}")
    if "id" not in req:
        continue
    if req["method"] == "initialize":
        sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": req["id"], "result": {"protocolVersion": "2024-11-05", "capabilities": {}, "serverInfo": {"name": "err"}}}) + "\n")
    else:
        sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": req["id"], "error": {"code": -32000, "message": "boom"}}) + "\n")
    sys.stdout.flush()
"#;

        let (child, session) = spawn_session(ERRORING_SERVER, SessionTimeouts::default());
        session.initialize().await.unwrap();

        match session.call_tool("x", serde_json::Map::new()).await {
            Err(SessionError::Remote { code, message, .. }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "boom");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
        assert!(!session.is_closed());

        finish(session, child).await;
    }
}

mod deadlines {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn silent_child_times_out_and_session_survives() {
        let timeouts = SessionTimeouts {
            initialize: Duration::from_millis(300),
            list: Duration::from_millis(300),
            call: Duration::from_millis(300),
        };
        let (child, session) = spawn_session("import time\ntime.sleep(30)\n", timeouts);

        match session.initialize().await {
            Err(SessionError::Timeout(deadline)) => {
                assert_eq!(deadline, Duration::from_millis(300));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(!session.is_closed());

        finish(session, child).await;
    }
}

mod transport_death {
    use super::*;

    #[tokio::test]
    async fn eof_fails_pending_and_subsequent_calls() {
        const ONE_SHOT_SERVER: &str = r#"
import sys, json
line = sys.stdin.readline()
req = json.loads(line)
sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": req["id"], "result": {"protocolVersion": "2024-11-05", "capabilities": {}, "serverInfo": {"name": "oneshot"}}}) + "\n")
sys.stdout.flush()
"#;

        let (child, session) = spawn_session(ONE_SHOT_SERVER, SessionTimeouts::default());
        session.initialize().await.unwrap();

        // The child has exited; the reader observes EOF and the next call
        // fails with a closed transport rather than a timeout.
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        match session.call_tool("x", serde_json::Map::new()).await {
            Err(SessionError::TransportClosed) => {}
            other => panic!("expected transport closed, got {other:?}"),
        }

        finish(session, child).await;
    }

    #[tokio::test]
    async fn close_marks_session_closed() {
        let (child, session) = spawn_session(STUB_SERVER, SessionTimeouts::default());
        session.initialize().await.unwrap();

        session.close().await;
        assert!(session.is_closed());
        assert!(matches!(
            session.call_tool("x", serde_json::Map::new()).await,
            Err(SessionError::TransportClosed)
        ));

        let mut child = child;
        let _ = child.wait().await;
    }
}
