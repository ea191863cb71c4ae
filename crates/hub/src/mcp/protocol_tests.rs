// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

mod rpc_frames {
    use super::*;

    #[test]
    fn request_serializes_with_id_and_version() {
        let req = RpcRequest::new(1, "tools/list", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""method":"tools/list""#));
        assert!(!json.contains("params"));
    }

    #[test]
    fn request_includes_params_when_present() {
        let req = RpcRequest::new(7, "tools/call", Some(serde_json::json!({"name": "echo"})));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""params":{"name":"echo"}"#));
    }

    #[test]
    fn notification_has_no_id() {
        let notif = RpcNotification::new("notifications/initialized", None);
        let json = serde_json::to_string(&notif).unwrap();
        assert!(!json.contains("id"));
        assert!(json.contains(r#""method":"notifications/initialized""#));
    }

    #[test]
    fn response_parses_success() {
        let json = r#"{"jsonrpc":"2.0","id":3,"result":{"ok":true}}"#;
        let resp: RpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.id, 3);
        assert_eq!(resp.into_result().unwrap()["ok"], true);
    }

    #[test]
    fn response_parses_error() {
        let json = r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"Method not found"}}"#;
        let resp: RpcResponse = serde_json::from_str(json).unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found");
    }

    #[test]
    fn response_with_missing_result_yields_null() {
        let json = r#"{"jsonrpc":"2.0","id":9}"#;
        let resp: RpcResponse = serde_json::from_str(json).unwrap();
        assert!(resp.into_result().unwrap().is_null());
    }
}

mod classification {
    use super::*;

    #[test]
    fn frame_with_id_is_response() {
        let value = serde_json::json!({"jsonrpc": "2.0", "id": 5, "result": {}});
        match InboundFrame::classify(value) {
            Some(InboundFrame::Response(resp)) => assert_eq!(resp.id, 5),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn frame_with_method_and_no_id_is_notification() {
        let value = serde_json::json!({"jsonrpc": "2.0", "method": "notifications/progress", "params": {"n": 1}});
        match InboundFrame::classify(value) {
            Some(InboundFrame::Notification { method, params }) => {
                assert_eq!(method, "notifications/progress");
                assert_eq!(params.unwrap()["n"], 1);
            }
            other => panic!("expected notification, got {other:?}"),
        }
    }

    #[test]
    fn frame_with_neither_is_unclassifiable() {
        assert!(InboundFrame::classify(serde_json::json!({"jsonrpc": "2.0"})).is_none());
        assert!(InboundFrame::classify(serde_json::json!("just a string")).is_none());
        assert!(InboundFrame::classify(serde_json::json!(42)).is_none());
    }
}

mod initialize_types {
    use super::*;

    #[test]
    fn initialize_params_carry_protocol_version_and_tools_capability() {
        let params = serde_json::to_value(InitializeParams::default()).unwrap();
        assert_eq!(params["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(params["capabilities"]["tools"], serde_json::json!({}));
        assert_eq!(params["clientInfo"]["name"], "mcphub");
    }

    #[test]
    fn initialize_result_parses_wire_shape() {
        let json = r#"{
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "sqlite", "version": "0.3.0"}
        }"#;
        let result: InitializeResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.protocol_version, "2024-11-05");
        assert_eq!(result.server_info.name, "sqlite");
        assert_eq!(result.server_info.version.as_deref(), Some("0.3.0"));
    }
}

mod discovery_types {
    use super::*;

    #[test]
    fn tools_list_parses_input_schema() {
        let json = r#"{"tools": [{"name": "read_query", "description": "Run a query", "inputSchema": {"type": "object", "properties": {}}}]}"#;
        let listed: ToolsListResult = serde_json::from_str(json).unwrap();
        assert_eq!(listed.tools.len(), 1);
        assert_eq!(listed.tools[0].name, "read_query");
        assert!(listed.tools[0].input_schema.is_some());
    }

    #[test]
    fn resource_identifier_prefers_name() {
        let with_name = ResourceInfo {
            uri: "sqlite://tables".into(),
            name: Some("tables".into()),
        };
        let without = ResourceInfo {
            uri: "sqlite://schema".into(),
            name: None,
        };
        assert_eq!(with_name.identifier(), "tables");
        assert_eq!(without.identifier(), "sqlite://schema");
    }

    #[test]
    fn empty_listings_default() {
        let resources: ResourcesListResult = serde_json::from_str("{}").unwrap();
        assert!(resources.resources.is_empty());
        let prompts: PromptsListResult = serde_json::from_str("{}").unwrap();
        assert!(prompts.prompts.is_empty());
    }
}

mod call_results {
    use super::*;

    #[test]
    fn into_text_returns_first_text_block() {
        let result = CallToolResult {
            content: vec![
                ContentBlock::Text {
                    text: r#"[{"1":1}]"#.into(),
                },
                ContentBlock::Text {
                    text: "second".into(),
                },
            ],
            is_error: false,
        };
        assert_eq!(result.into_text(), r#"[{"1":1}]"#);
    }

    #[test]
    fn into_text_falls_back_to_raw_content() {
        let result = CallToolResult {
            content: vec![ContentBlock::Image {
                data: "aGk=".into(),
                mime_type: "image/png".into(),
            }],
            is_error: false,
        };
        let raw = result.into_text();
        assert!(raw.contains("image/png"));
    }

    #[test]
    fn content_block_tags_round_trip() {
        let json = r#"{"type": "resource", "uri": "file:///tmp/x", "text": "data"}"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        match block {
            ContentBlock::Resource { uri, text } => {
                assert_eq!(uri, "file:///tmp/x");
                assert_eq!(text.as_deref(), Some("data"));
            }
            other => panic!("expected resource block, got {other:?}"),
        }
    }
}
