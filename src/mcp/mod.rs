//! MCP (Model Context Protocol) server for Claude/Cursor integration.
//!
//! Exposes tools: evaluate_story, analyze_structure, improve_story.

use crate::analyzer::{EvaluationRequest, StoryEvaluator};
use crate::config::Config;
use crate::gate::RateLimiter;
use crate::reporter::MarkdownReporter;
use crate::suggestions::{AiAdvisor, ImprovedStory};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};

/// MCP JSON-RPC request
#[derive(Debug, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,
    pub id: Option<serde_json::Value>,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

/// MCP JSON-RPC response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// JSON-RPC "Method not found"
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Tool definition for MCP tools/list
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDef {
    name: &'static str,
    description: &'static str,
    input_schema: InputSchema,
}

#[derive(Debug, Serialize)]
struct InputSchema {
    #[serde(rename = "type")]
    typ: &'static str,
    properties: serde_json::Value,
    required: Vec<&'static str>,
}

fn story_only_schema() -> InputSchema {
    InputSchema {
        typ: "object",
        properties: serde_json::json!({
            "story": { "type": "string", "description": "User story text" }
        }),
        required: vec!["story"],
    }
}

/// Tools that go through the rate limiter also accept a caller identity
fn rate_limited_schema() -> InputSchema {
    InputSchema {
        typ: "object",
        properties: serde_json::json!({
            "story": { "type": "string", "description": "User story text" },
            "identity": { "type": "string", "description": "Caller identity for rate limiting (default: anonymous)" }
        }),
        required: vec!["story"],
    }
}

fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "evaluate_story",
            description: "Score a user story against the INVEST criteria with feedback and suggestions",
            input_schema: rate_limited_schema(),
        },
        ToolDef {
            name: "analyze_structure",
            description: "Extract structural signals (persona, action, value, acceptance criteria, size)",
            input_schema: story_only_schema(),
        },
        ToolDef {
            name: "improve_story",
            description: "Rewrite a user story to better meet INVEST, with acceptance criteria",
            input_schema: rate_limited_schema(),
        },
    ]
}

/// A tool result: one or more text blocks
struct ToolOutput(Vec<String>);

/// Stateful MCP server. Owns one rate limiter shared by every tool call.
pub struct McpServer {
    evaluator: StoryEvaluator,
    improver: AiAdvisor,
}

impl McpServer {
    /// Build from config: rate limits from `rateLimit`, AI commentary on
    /// `evaluate_story` only when `ai.enabled` is set.
    pub fn new(config: &Config) -> Self {
        let ai = config.ai();
        let mut evaluator =
            StoryEvaluator::new().with_rate_limiter(RateLimiter::new(&config.rate_limit()));
        if ai.enabled {
            evaluator = evaluator.with_advisor(AiAdvisor::from_config(&ai));
        }
        Self::with_parts(evaluator, AiAdvisor::from_config(&ai))
    }

    /// Build from an evaluator and the advisor used by `improve_story`
    pub fn with_parts(evaluator: StoryEvaluator, improver: AiAdvisor) -> Self {
        Self {
            evaluator,
            improver,
        }
    }

    /// Handle a single JSON-RPC request and return a response.
    pub fn handle_request(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();
        let result = match req.method.as_str() {
            "initialize" => serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "invest", "version": env!("CARGO_PKG_VERSION") }
            }),
            "tools/list" => serde_json::json!({ "tools": tool_defs() }),
            "tools/call" => self.call_tool(req.params.as_ref()),
            other => {
                tracing::debug!(method = other, "unknown method");
                return JsonRpcResponse {
                    jsonrpc: "2.0",
                    id,
                    result: None,
                    error: Some(JsonRpcError {
                        code: METHOD_NOT_FOUND,
                        message: format!("Method not found: {}", other),
                    }),
                };
            }
        };

        JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn call_tool(&self, params: Option<&serde_json::Value>) -> serde_json::Value {
        let (name, args) = params
            .and_then(|p| p.get("params").or(Some(p)))
            .map(|p| {
                let name = p.get("name").and_then(|n| n.as_str()).unwrap_or("");
                let args = p
                    .get("arguments")
                    .and_then(|a| a.as_object())
                    .cloned()
                    .unwrap_or_default();
                (name, args)
            })
            .unwrap_or(("", serde_json::Map::new()));

        let story = args
            .get("story")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let identity = args.get("identity").and_then(|v| v.as_str());

        tracing::debug!(tool = name, "tools/call");
        let result = match name {
            "evaluate_story" => self.evaluate_story(&story, identity),
            "analyze_structure" => self.analyze_structure(&story),
            "improve_story" => self.improve_story(&story, identity),
            _ => Err(anyhow::anyhow!("Unknown tool: {}", name)),
        };

        match result {
            Ok(ToolOutput(blocks)) => {
                let content: Vec<serde_json::Value> = blocks
                    .into_iter()
                    .map(|text| serde_json::json!({ "type": "text", "text": text }))
                    .collect();
                serde_json::json!({ "content": content })
            }
            Err(e) => serde_json::json!({
                "content": [{ "type": "text", "text": format!("Error: {}", e) }],
                "isError": true
            }),
        }
    }

    fn request(story: &str, identity: Option<&str>) -> EvaluationRequest {
        let mut request = EvaluationRequest::new(story);
        request.identity = identity.map(str::to_string);
        request
    }

    fn evaluate_story(&self, story: &str, identity: Option<&str>) -> anyhow::Result<ToolOutput> {
        let evaluation = self.evaluator.evaluate(&Self::request(story, identity))?;
        Ok(ToolOutput(vec![
            MarkdownReporter::report_evaluation(&evaluation),
            serde_json::to_string(&evaluation)?,
        ]))
    }

    fn analyze_structure(&self, story: &str) -> anyhow::Result<ToolOutput> {
        if story.trim().is_empty() {
            return Err(crate::analyzer::Rejection::EmptyStory.into());
        }
        let signals = crate::analyze(story);
        Ok(ToolOutput(vec![serde_json::to_string(&signals)?]))
    }

    fn improve_story(&self, story: &str, identity: Option<&str>) -> anyhow::Result<ToolOutput> {
        let evaluation = self
            .evaluator
            .evaluate_structure(&Self::request(story, identity))?;
        let improved = self
            .improver
            .improved_story(story, Some(&evaluation.report));
        let mut blocks = vec![improved.clone()];
        if let Some(parsed) = ImprovedStory::parse(&improved) {
            blocks.push(serde_json::to_string(&parsed)?);
        }
        Ok(ToolOutput(blocks))
    }
}

/// Run the MCP server loop (stdin / stdout).
pub fn run_mcp_server(config: &Config) -> anyhow::Result<()> {
    let server = McpServer::new(config);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let reader = BufReader::new(stdin.lock());

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let req: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed request");
                continue;
            }
        };

        let response = server.handle_request(&req);
        // notifications carry no id and get no reply
        if req.id.is_none() {
            continue;
        }
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AiConfig, RateLimitConfig};
    use crate::suggestions::advisor::tests::CannedBackend;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    const GOOD: &str =
        "As a customer, I want to view my order history so that I can track my purchases";

    fn make_request(method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: Some("2.0".to_string()),
            id: Some(serde_json::json!(1)),
            method: method.to_string(),
            params,
        }
    }

    fn call(name: &str, args: serde_json::Value) -> JsonRpcRequest {
        make_request(
            "tools/call",
            Some(serde_json::json!({ "name": name, "arguments": args })),
        )
    }

    fn server_with(per_minute: usize, reply: &str) -> McpServer {
        let limiter = RateLimiter::new(&RateLimitConfig {
            per_minute,
            per_hour: 100,
        });
        McpServer::with_parts(
            StoryEvaluator::new().with_rate_limiter(limiter),
            AiAdvisor::with_backend(Box::new(CannedBackend::ok(reply)), &AiConfig::default()),
        )
    }

    fn server() -> McpServer {
        server_with(10, "IMPROVED STORY:\nAs a user, I want x so that y\n\nACCEPTANCE CRITERIA:\n- Given z")
    }

    #[test]
    fn test_initialize_returns_protocol_version_and_server_info() {
        let resp = server().handle_request(&make_request("initialize", None));

        assert_eq!(resp.jsonrpc, "2.0");
        assert_eq!(resp.id, Some(serde_json::json!(1)));
        assert!(resp.error.is_none());

        let result = resp.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "invest");
        assert!(result["serverInfo"]["version"].is_string());
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_tools_list_returns_three_tools() {
        let resp = server().handle_request(&make_request("tools/list", None));

        let result = resp.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);

        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["evaluate_story", "analyze_structure", "improve_story"]);

        for tool in tools {
            let schema = &tool["inputSchema"];
            assert_eq!(schema["type"], "object");
            assert!(schema["properties"].is_object());
            let required = schema["required"].as_array().unwrap();
            assert!(required.iter().any(|r| r == "story"));
        }
    }

    #[test]
    fn test_evaluate_story_returns_markdown_and_json() {
        let resp = server().handle_request(&call("evaluate_story", serde_json::json!({ "story": GOOD })));
        let result = resp.result.unwrap();
        assert!(result.get("isError").is_none(), "got {:?}", result);

        let md = result["content"][0]["text"].as_str().unwrap();
        assert!(md.contains("Overall INVEST Score: 88.9%"));

        let json: serde_json::Value =
            serde_json::from_str(result["content"][1]["text"].as_str().unwrap()).unwrap();
        assert_eq!(json["report"]["totalScore"], 16);
    }

    #[test]
    fn test_blank_story_is_tool_error() {
        let resp = server().handle_request(&call("evaluate_story", serde_json::json!({ "story": "  " })));
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Please enter a user story to evaluate."));
    }

    #[test]
    fn test_missing_story_argument_is_tool_error() {
        let resp = server().handle_request(&call("analyze_structure", serde_json::json!({})));
        assert_eq!(resp.result.unwrap()["isError"], true);
    }

    #[test]
    fn test_rate_limit_is_shared_across_tools() {
        let server = server_with(2, "unused");
        let args = serde_json::json!({ "story": GOOD, "identity": "cursor" });
        assert!(server
            .handle_request(&call("evaluate_story", args.clone()))
            .result
            .unwrap()
            .get("isError")
            .is_none());
        assert!(server
            .handle_request(&call("improve_story", args.clone()))
            .result
            .unwrap()
            .get("isError")
            .is_none());

        let result = server
            .handle_request(&call("evaluate_story", args))
            .result
            .unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Rate limit exceeded"));

        // another identity is unaffected
        let other = server
            .handle_request(&call("evaluate_story", serde_json::json!({ "story": GOOD })))
            .result
            .unwrap();
        assert!(other.get("isError").is_none());
    }

    #[test]
    fn test_analyze_structure() {
        let resp = server().handle_request(&call("analyze_structure", serde_json::json!({ "story": GOOD })));
        let result = resp.result.unwrap();
        let signals: serde_json::Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(signals["hasPersona"], true);
        assert_eq!(signals["wordCount"], 17);
        assert_eq!(signals["sentenceCount"], 1);
    }

    #[test]
    fn test_improve_story_parses_sections() {
        let resp = server().handle_request(&call("improve_story", serde_json::json!({ "story": GOOD })));
        let result = resp.result.unwrap();
        let content = result["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert!(content[0]["text"].as_str().unwrap().starts_with("IMPROVED STORY:"));
        let parsed: serde_json::Value =
            serde_json::from_str(content[1]["text"].as_str().unwrap()).unwrap();
        assert_eq!(parsed["acceptanceCriteria"], "- Given z");
    }

    #[test]
    fn test_improve_story_fallback_is_not_an_error() {
        let server = McpServer::with_parts(
            StoryEvaluator::new(),
            AiAdvisor::with_backend(Box::new(CannedBackend::failing()), &AiConfig::default()),
        );
        let resp = server.handle_request(&call("improve_story", serde_json::json!({ "story": GOOD })));
        let result = resp.result.unwrap();
        assert!(result.get("isError").is_none());
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Story improvement unavailable"));
    }

    #[test]
    fn test_tools_call_unknown_tool_returns_error() {
        let resp = server().handle_request(&call("nonexistent_tool", serde_json::json!({ "story": "x" })));
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Unknown tool"));
    }

    #[test]
    fn test_unknown_method_returns_method_not_found() {
        let resp = server().handle_request(&make_request("nonexistent/method", None));
        assert!(resp.result.is_none());
        let error = resp.error.unwrap();
        assert_eq!(error.code, -32601);
        assert!(error.message.contains("nonexistent/method"));

        let json = serde_json::to_value(
            server().handle_request(&make_request("resources/list", None)),
        )
        .unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], -32601);
    }

    #[test]
    fn test_improve_story_makes_one_ai_call() {
        let commentary = CannedBackend::ok("unused");
        let commentary_calls = Arc::clone(&commentary.calls);
        let rewrite = CannedBackend::ok("IMPROVED STORY: As a user, I want x so that y");
        let rewrite_calls = Arc::clone(&rewrite.calls);

        let evaluator = StoryEvaluator::new()
            .with_rate_limiter(RateLimiter::new(&RateLimitConfig::default()))
            .with_advisor(AiAdvisor::with_backend(Box::new(commentary), &AiConfig::default()));
        let server = McpServer::with_parts(
            evaluator,
            AiAdvisor::with_backend(Box::new(rewrite), &AiConfig::default()),
        );

        let result = server
            .handle_request(&call("improve_story", serde_json::json!({ "story": GOOD })))
            .result
            .unwrap();
        assert!(result.get("isError").is_none());
        assert_eq!(commentary_calls.load(Ordering::SeqCst), 0);
        assert_eq!(rewrite_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rate_limited_tools_declare_identity() {
        let resp = server().handle_request(&make_request("tools/list", None));
        let result = resp.result.unwrap();
        for tool in result["tools"].as_array().unwrap() {
            let declares_identity = tool["inputSchema"]["properties"]
                .get("identity")
                .is_some();
            assert_eq!(
                declares_identity,
                tool["name"] != "analyze_structure",
                "{}",
                tool["name"]
            );
        }
    }

    #[test]
    fn test_tools_call_with_nested_params() {
        let req = make_request(
            "tools/call",
            Some(serde_json::json!({
                "params": {
                    "name": "analyze_structure",
                    "arguments": { "story": "Add login feature" }
                }
            })),
        );
        let result = server().handle_request(&req).result.unwrap();
        assert!(result.get("isError").is_none());
    }

    #[test]
    fn test_jsonrpc_request_with_string_id() {
        let json = r#"{"jsonrpc":"2.0","id":"abc-123","method":"tools/list"}"#;
        let req: JsonRpcRequest = serde_json::from_str(json).unwrap();
        let resp = server().handle_request(&req);
        assert_eq!(resp.id, Some(serde_json::json!("abc-123")));
    }
}
