// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::collections::BTreeMap;
use tokio::io::{AsyncBufReadExt, BufReader};

mod argv {
    use super::*;

    #[test]
    fn container_run_is_interactive_auto_remove() {
        let args = container_run_args("mcp-registry-sq", &BTreeMap::new(), "docker.io/mcp/sqlite");
        assert_eq!(
            args,
            vec![
                "run",
                "-i",
                "--rm",
                "--name",
                "mcp-registry-sq",
                "docker.io/mcp/sqlite"
            ]
        );
    }

    #[test]
    fn environment_becomes_flag_pairs_in_key_order() {
        let mut env = BTreeMap::new();
        env.insert("MCP_B".to_string(), "2".to_string());
        env.insert("MCP_A".to_string(), "1".to_string());
        let args = container_run_args("n", &env, "img/x");
        assert_eq!(
            args,
            vec!["run", "-i", "--rm", "--name", "n", "-e", "MCP_A=1", "-e", "MCP_B=2", "img/x"]
        );
    }

    #[test]
    fn no_volume_or_port_flags_ever() {
        let mut env = BTreeMap::new();
        env.insert("MCP_X".to_string(), "y".to_string());
        let args = container_run_args("n", &env, "img/x");
        assert!(!args.iter().any(|a| a == "-v" || a == "-p" || a == "--privileged"));
    }
}

mod handles {
    use super::*;

    #[test]
    fn display_forms() {
        let container = ChildHandle::Container { name: "mcp-registry-fs".into() };
        let process = ChildHandle::Process { pid: 4242 };
        assert_eq!(container.to_string(), "container:mcp-registry-fs");
        assert_eq!(process.to_string(), "pid:4242");
    }

    #[test]
    fn serde_tags() {
        let handle = ChildHandle::Container { name: "x".into() };
        let json = serde_json::to_string(&handle).unwrap();
        assert!(json.contains(r#""kind":"container""#));
        let back: ChildHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }
}

mod spawning {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn command_spawn_yields_live_child_with_pid_handle() {
        let launcher = Launcher::new("podman");
        let spec = LaunchSpec::Command {
            command: "cat".into(),
            args: vec![],
        };
        let (mut child, _stdin, _stdout) =
            launcher.spawn(&spec, &BTreeMap::new()).await.unwrap();

        match child.handle() {
            ChildHandle::Process { pid } => assert!(*pid > 0),
            other => panic!("expected process handle, got {other:?}"),
        }
        assert!(child.is_running());

        child.teardown(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn spawn_fails_for_missing_command() {
        let launcher = Launcher::new("podman");
        let spec = LaunchSpec::Command {
            command: "definitely-not-a-command-12345".into(),
            args: vec![],
        };
        let result = launcher.spawn(&spec, &BTreeMap::new()).await;
        assert!(matches!(result, Err(LaunchError::Spawn(_))));
    }

    #[tokio::test]
    async fn immediately_exiting_child_fails_the_spawn() {
        let launcher = Launcher::new("podman");
        let spec = LaunchSpec::Command {
            command: "true".into(),
            args: vec![],
        };
        let result = launcher.spawn(&spec, &BTreeMap::new()).await;
        assert!(matches!(result, Err(LaunchError::Spawn(_))));
    }

    #[tokio::test]
    async fn caller_environment_reaches_the_child() {
        let launcher = Launcher::new("podman");
        let spec = LaunchSpec::Command {
            command: "sh".into(),
            args: vec!["-c".into(), "read _; printf '%s\\n' \"$MCP_TEST\"".into()],
        };
        let mut env = BTreeMap::new();
        env.insert("MCP_TEST".to_string(), "hello".to_string());

        let (child, stdin, stdout) = launcher.spawn(&spec, &env).await.unwrap();

        // Wake the child, then read its answer.
        {
            use tokio::io::AsyncWriteExt;
            let mut stdin = stdin;
            stdin.write_all(b"go\n").await.unwrap();
            stdin.flush().await.unwrap();
        }
        let mut lines = BufReader::new(stdout).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, "hello");

        child.teardown(Duration::from_millis(500)).await;
    }

    #[tokio::test]
    async fn teardown_force_kills_a_lingering_child() {
        let launcher = Launcher::new("podman");
        let spec = LaunchSpec::Command {
            command: "sleep".into(),
            args: vec!["30".into()],
        };
        let (child, _stdin, _stdout) = launcher.spawn(&spec, &BTreeMap::new()).await.unwrap();

        let started = std::time::Instant::now();
        child.teardown(Duration::from_millis(200)).await;
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}

mod engine {
    use super::*;

    #[tokio::test]
    async fn missing_engine_is_classified() {
        let launcher = Launcher::new("definitely-not-an-engine-12345");
        let result = launcher.pull("docker.io/mcp/sqlite").await;
        assert!(matches!(result, Err(LaunchError::EngineMissing(_))));
    }
}
