//! A bounded memory of tool outcomes, rendered back into the LLM's
//! instructions so later turns can see prior tool actions without relying on
//! the model's own memory of the conversation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// Well-known tool names that get a summary slot. Anything else only ever
/// lands in the ring.
const KNOWN_SLOTS: &[&str] = &["customer", "last_balance", "verification", "scheduled_demo"];

const DEFAULT_CAPACITY: usize = 10;

const HEADER: &str = "--- CURRENT CONVERSATION CONTEXT ---";
const FOOTER: &str = "--- END CONTEXT ---";

#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    pub tool_name: String,
    pub arguments: Value,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
}

/// Per-session tool-result memory: a capacity-bounded ring plus a summary
/// keyed by [`KNOWN_SLOTS`] tool names.
#[derive(Debug, Clone)]
pub struct ContextBuffer {
    capacity: usize,
    ring: VecDeque<ContextEntry>,
    summary: HashMap<String, Value>,
}

impl Default for ContextBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ContextBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ring: VecDeque::with_capacity(capacity),
            summary: HashMap::new(),
        }
    }

    /// Append a tool result. Oldest entry is evicted once the ring is at
    /// capacity. The summary slot for `tool_name` (if it is a known name) is
    /// rewritten with this result unless the result carries `success: false`
    /// — failures still enter the ring but never overwrite the summary.
    pub fn add_tool_result(&mut self, tool_name: impl Into<String>, arguments: Value, result: Value) {
        let tool_name = tool_name.into();

        let is_failure = result
            .get("success")
            .and_then(Value::as_bool)
            .map(|success| !success)
            .unwrap_or(false);

        if !is_failure && KNOWN_SLOTS.contains(&tool_name.as_str()) {
            self.summary.insert(tool_name.clone(), result.clone());
        }

        if self.ring.len() >= self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(ContextEntry {
            tool_name,
            arguments,
            result,
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.ring.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Render the populated summary slots as a delimited text block. Empty
    /// string if no tool results have been recorded at all.
    pub fn render_context_string(&self) -> String {
        if self.ring.is_empty() {
            return String::new();
        }

        let mut lines = vec![HEADER.to_string()];
        for slot in KNOWN_SLOTS {
            if let Some(value) = self.summary.get(*slot) {
                lines.push(format!("{slot}: {value}"));
            }
        }
        lines.push(FOOTER.to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_buffer_renders_empty_string() {
        let buffer = ContextBuffer::default();
        assert_eq!(buffer.render_context_string(), "");
    }

    #[test]
    fn known_tool_populates_summary_slot() {
        let mut buffer = ContextBuffer::default();
        buffer.add_tool_result("customer", json!({}), json!({"success": true, "name": "Jane"}));
        let rendered = buffer.render_context_string();
        assert!(rendered.starts_with(HEADER));
        assert!(rendered.ends_with(FOOTER));
        assert!(rendered.contains("customer:"));
    }

    #[test]
    fn unknown_tool_only_enters_ring() {
        let mut buffer = ContextBuffer::default();
        buffer.add_tool_result("weather_lookup", json!({}), json!({"success": true, "temp_f": 72}));
        assert_eq!(buffer.entries().count(), 1);
        assert_eq!(buffer.render_context_string(), format!("{HEADER}\n{FOOTER}"));
    }

    #[test]
    fn failed_result_enters_ring_but_does_not_overwrite_summary() {
        let mut buffer = ContextBuffer::default();
        buffer.add_tool_result("last_balance", json!({}), json!({"success": true, "amount": 42}));
        buffer.add_tool_result("last_balance", json!({}), json!({"success": false, "error": "timeout"}));
        assert_eq!(buffer.entries().count(), 2);
        let rendered = buffer.render_context_string();
        assert!(rendered.contains("42"));
        assert!(!rendered.contains("timeout"));
    }

    #[test]
    fn ring_evicts_oldest_entry_past_capacity() {
        let mut buffer = ContextBuffer::new(2);
        buffer.add_tool_result("a", json!({}), json!({"success": true}));
        buffer.add_tool_result("b", json!({}), json!({"success": true}));
        buffer.add_tool_result("c", json!({}), json!({"success": true}));
        let names: Vec<_> = buffer.entries().map(|e| e.tool_name.clone()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn new_result_overwrites_previous_summary_value() {
        let mut buffer = ContextBuffer::default();
        buffer.add_tool_result("verification", json!({}), json!({"success": true, "status": "pending"}));
        buffer.add_tool_result("verification", json!({}), json!({"success": true, "status": "verified"}));
        let rendered = buffer.render_context_string();
        assert!(rendered.contains("verified"));
        assert!(!rendered.contains("pending"));
    }
}
