//! Log Tailer: parses the line-delimited JSON event log a worker container
//! writes into canonical event shapes for log-consuming clients.
//!
//! The agent's raw log is for human observation only; the core trusts the
//! status callback, not this stream, as the authoritative task status.

use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

const RAW_TEXT_CAP: usize = 500;
const SYSTEM_TEXT_CAP: usize = 300;
const INPUT_RAW_CAP: usize = 500;
const TOOL_SUMMARY_CAP: usize = 120;
const STARTUP_POLL_SECONDS: u64 = 60;
const POLL_INTERVAL_MS: u64 = 300;

/// One canonical event shape yielded by log parsing.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    Assistant { text: String },
    ToolUse { tool: String, input: String, input_raw: String },
    Result { subtype: String, cost: Option<f64>, duration: Option<i64>, turns: Option<i64>, session_id: Option<String> },
    Error { error: String },
    System { text: String },
    Raw { text: String },
}

/// Parse an entire log file into canonical events. Returns an empty vec if
/// the file does not exist.
pub fn parse_log_file(path: &Path) -> Vec<LogEvent> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        events.extend(parse_line(line));
    }
    events
}

fn parse_line(line: &str) -> Vec<LogEvent> {
    match serde_json::from_str::<Value>(line) {
        Ok(value) => parse_event(&value),
        Err(_) => vec![LogEvent::Raw { text: truncate(line, RAW_TEXT_CAP) }],
    }
}

fn parse_event(event: &Value) -> Vec<LogEvent> {
    let event_type = event.get("type").and_then(Value::as_str).unwrap_or("");
    let mut results = Vec::new();

    match event_type {
        "assistant" => {
            let message = event.get("message");
            match message {
                Some(Value::Object(_)) => {
                    if let Some(blocks) = message.and_then(|m| m.get("content")).and_then(Value::as_array) {
                        for block in blocks {
                            match block.get("type").and_then(Value::as_str) {
                                Some("text") => {
                                    let text = block.get("text").and_then(Value::as_str).unwrap_or("");
                                    if !text.trim().is_empty() {
                                        results.push(LogEvent::Assistant { text: text.to_string() });
                                    }
                                }
                                Some("tool_use") => {
                                    let tool = block.get("name").and_then(Value::as_str).unwrap_or("unknown").to_string();
                                    let input = block.get("input").cloned().unwrap_or(Value::Null);
                                    results.push(LogEvent::ToolUse {
                                        input: summarize_tool_input(&tool, &input),
                                        input_raw: truncate(&input.to_string(), INPUT_RAW_CAP),
                                        tool,
                                    });
                                }
                                _ => {}
                            }
                        }
                    }
                }
                Some(Value::String(text)) => {
                    if !text.trim().is_empty() {
                        results.push(LogEvent::Assistant { text: text.clone() });
                    }
                }
                _ => {}
            }
        }
        "result" => {
            results.push(LogEvent::Result {
                subtype: event.get("subtype").and_then(Value::as_str).unwrap_or("").to_string(),
                cost: event.get("cost_usd").and_then(Value::as_f64),
                duration: event.get("duration_ms").and_then(Value::as_i64),
                turns: event.get("num_turns").and_then(Value::as_i64),
                session_id: event.get("session_id").and_then(Value::as_str).map(String::from),
            });
        }
        "error" => {
            let error = event
                .get("error")
                .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                .unwrap_or_else(|| "unknown error".to_string());
            results.push(LogEvent::Error { error: truncate(&error, RAW_TEXT_CAP) });
        }
        "system" => {
            let text = event
                .get("message")
                .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                .unwrap_or_default();
            if !text.trim().is_empty() {
                results.push(LogEvent::System { text: truncate(&text, SYSTEM_TEXT_CAP) });
            }
        }
        _ => {}
    }

    results
}

/// Compute a short human summary of a tool call's input, per-tool.
fn summarize_tool_input(tool: &str, input: &Value) -> String {
    if let Some(s) = input.as_str() {
        return truncate(s, TOOL_SUMMARY_CAP);
    }
    let Some(obj) = input.as_object() else {
        return truncate(&input.to_string(), TOOL_SUMMARY_CAP);
    };

    let str_field = |key: &str| obj.get(key).and_then(Value::as_str).unwrap_or("");

    match tool.to_lowercase().as_str() {
        "read" | "readfile" => {
            let path = str_field("file_path");
            if path.is_empty() { str_field("path").to_string() } else { path.to_string() }
        }
        "edit" | "editfile" => {
            let fp = str_field("file_path");
            let old: String = str_field("old_string").chars().take(40).collect();
            if old.is_empty() { fp.to_string() } else { format!("{}  {}…", fp, old) }
        }
        "write" | "writefile" => {
            let path = str_field("file_path");
            if path.is_empty() { str_field("path").to_string() } else { path.to_string() }
        }
        "bash" => truncate(str_field("command"), TOOL_SUMMARY_CAP),
        "grep" | "ripgrep" | "search" => {
            format!("/{}/ {}", str_field("pattern"), str_field("path")).trim().to_string()
        }
        "glob" => str_field("pattern").to_string(),
        "task" | "todowrite" => {
            let text = if !str_field("description").is_empty() { str_field("description") } else { str_field("prompt") };
            truncate(text, TOOL_SUMMARY_CAP)
        }
        _ => obj
            .values()
            .find_map(|v| v.as_str())
            .map(|s| truncate(s, TOOL_SUMMARY_CAP))
            .unwrap_or_else(|| truncate(&input.to_string(), TOOL_SUMMARY_CAP)),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Tail a log file indefinitely, yielding each canonical event as it
/// appears. If the file does not yet exist, polls once a second for up to
/// 60 seconds before giving up silently (the container may not have
/// started writing yet).
pub async fn tail_log(path: &Path, mut on_event: impl FnMut(LogEvent)) -> crate::error::Result<()> {
    if !path.exists() {
        let mut waited = 0;
        while !path.exists() && waited < STARTUP_POLL_SECONDS {
            tokio::time::sleep(Duration::from_secs(1)).await;
            waited += 1;
        }
        if !path.exists() {
            return Ok(());
        }
    }

    let file = tokio::fs::File::open(path).await.map_err(|e| {
        crate::error::CorralError::UserError(format!("failed to open log file '{}': {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);
    reader.seek(std::io::SeekFrom::End(0)).await.ok();

    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await.map_err(|e| {
            crate::error::CorralError::UserError(format!("failed to read log file '{}': {}", path.display(), e))
        })?;
        if bytes_read == 0 {
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        for event in parse_line(trimmed) {
            on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assistant_text_block() {
        let events = parse_line(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}]}}"#);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LogEvent::Assistant { text } if text == "hi"));
    }

    #[test]
    fn summarizes_bash_tool_use() {
        let events = parse_line(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Bash","input":{"command":"ls -la"}}]}}"#,
        );
        assert_eq!(events.len(), 1);
        match &events[0] {
            LogEvent::ToolUse { tool, input, .. } => {
                assert_eq!(tool, "Bash");
                assert_eq!(input, "ls -la");
            }
            _ => panic!("expected tool_use"),
        }
    }

    #[test]
    fn unparsable_line_yields_raw_event() {
        let events = parse_line("not json at all");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LogEvent::Raw { .. }));
    }

    #[test]
    fn parses_result_event() {
        let events = parse_line(r#"{"type":"result","subtype":"success","num_turns":3}"#);
        match &events[0] {
            LogEvent::Result { subtype, turns, .. } => {
                assert_eq!(subtype, "success");
                assert_eq!(*turns, Some(3));
            }
            _ => panic!("expected result"),
        }
    }

    #[test]
    fn parse_log_file_returns_empty_for_missing_file() {
        let events = parse_log_file(Path::new("/nonexistent/path/to.jsonl"));
        assert!(events.is_empty());
    }
}
