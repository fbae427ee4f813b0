/// Deserialization tests for the wire types using representative payloads
/// from the reasoning service's JSONL protocol.
#[cfg(test)]
mod unit {
    use crate::types::{CompletionRequest, GroundingChunk, GroundingSource, Message, ToolSpec, Turn};

    fn parse(json: &str) -> Message {
        serde_json::from_str(json).expect("failed to parse message")
    }

    #[test]
    fn parse_partial() {
        let msg = parse(r#"{"type":"partial","text":"Looking at the cell"}"#);
        let Message::Partial(p) = msg else {
            panic!("expected Partial")
        };
        assert_eq!(p.text, "Looking at the cell");
    }

    #[test]
    fn parse_final_with_tool_calls() {
        let json = r#"{
            "type": "final",
            "text": "",
            "tool_calls": [
                {"id": "t1", "name": "add_action", "args": {
                    "tool_name": "initiate_uplink_configuration_adjustment",
                    "parameters": {"enodeb_id": "X", "cell_id": "Y"},
                    "reason_to_perform": "low RSSI"
                }},
                {"id": "t2", "name": "save_analysis", "args": {"analysis": "uplink noise"}}
            ]
        }"#;
        let msg = parse(json);
        let done = msg.as_final().expect("expected Final");
        assert_eq!(done.tool_calls.len(), 2);
        assert_eq!(done.tool_calls[0].args["parameters"]["cell_id"], "Y");
        assert!(!done.is_grounded());
    }

    #[test]
    fn parse_final_minimal() {
        let msg = parse(r#"{"type":"final"}"#);
        let done = msg.as_final().unwrap();
        assert!(done.text.is_empty());
        assert!(done.tool_calls.is_empty());
        assert!(done.thoughts.is_none());
    }

    #[test]
    fn grounding_with_empty_chunks_is_not_grounded() {
        let msg = parse(
            r#"{"type":"final","text":"x","grounding":{"retrieval_queries":["q"],"grounding_chunks":[]}}"#,
        );
        assert!(!msg.as_final().unwrap().is_grounded());
    }

    #[test]
    fn parse_web_chunk() {
        let chunk: GroundingChunk =
            serde_json::from_str(r#"{"web":{"uri":"https://x.example","title":"X"}}"#).unwrap();
        assert_eq!(
            chunk,
            GroundingChunk::Web {
                uri: "https://x.example".into(),
                title: "X".into()
            }
        );
    }

    #[test]
    fn request_serializes_roles_and_grounding() {
        let req = CompletionRequest {
            model: "m".into(),
            instructions: "i".into(),
            turns: vec![
                Turn::User { text: "go".into() },
                Turn::ToolResult {
                    call_id: "c".into(),
                    name: "get_uplink_rssi_level".into(),
                    output: serde_json::json!({"rssi": "-100"}),
                },
            ],
            tools: vec![ToolSpec::new(
                "save_analysis",
                "Store the analysis",
                serde_json::json!({"type": "object"}),
            )],
            grounding: Some(GroundingSource::Datastore { id: "kb".into() }),
            include_thoughts: false,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["turns"][0]["role"], "user");
        assert_eq!(v["turns"][1]["role"], "tool_result");
        assert_eq!(v["grounding"]["type"], "datastore");
        assert_eq!(v["tools"][0]["name"], "save_analysis");
    }

    #[test]
    fn request_without_grounding_omits_field() {
        let v = serde_json::to_value(CompletionRequest::default()).unwrap();
        assert!(v.get("grounding").is_none());
    }
}
