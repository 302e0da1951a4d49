//! Jobs observed in the external scheduler queue.

use std::collections::HashMap;

use cloud::types::CandidateRequest;

/// Queue status value meaning "waiting for a worker".
pub const STATUS_IDLE: i32 = 1;

/// A value parsed out of the job description string. Only the literal
/// `true` (any case) becomes a boolean; everything else stays text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescValue {
    Bool(bool),
    Text(String),
}

impl DescValue {
    pub fn as_bool(&self) -> bool {
        match self {
            DescValue::Bool(b) => *b,
            DescValue::Text(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DescValue::Text(s) => Some(s),
            DescValue::Bool(_) => None,
        }
    }
}

/// Parse a comma-separated `key=value` description string.
pub fn parse_description(raw: &str) -> HashMap<String, DescValue> {
    let mut map = HashMap::new();
    for item in raw.trim_matches('"').split(',') {
        let Some((key, value)) = item.split_once('=') else {
            continue;
        };
        let parsed = if value.eq_ignore_ascii_case("true") {
            DescValue::Bool(true)
        } else {
            DescValue::Text(value.to_string())
        };
        map.insert(key.to_string(), parsed);
    }
    map
}

/// One queued job, tagged with its owning tenant's queue address.
///
/// `fulfilled` and `launch` are mutable tick state: the reconciler marks
/// fulfilment, the selector assigns at most one launch per tick.
#[derive(Debug, Clone)]
pub struct Job {
    pub tenant_address: String,
    pub id: i64,
    pub status: i32,
    /// Epoch seconds at which the job entered the queue.
    pub req_time: i64,
    pub req_cpus: i32,
    /// Requested memory in GB.
    pub req_mem: f64,
    /// Requested disk in GB.
    pub req_disk: f64,

    /// Whether the job demands fixed-price capacity. Seeded from the
    /// description, may be escalated by the selector during a tick.
    pub ondemand: bool,
    pub tool: Option<String>,
    pub version: Option<String>,
    pub description: HashMap<String, DescValue>,

    pub fulfilled: bool,
    pub launch: Option<CandidateRequest>,
}

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_address: String,
        id: i64,
        status: i32,
        req_time: i64,
        req_cpus: i32,
        req_mem: f64,
        req_disk: f64,
        description: HashMap<String, DescValue>,
    ) -> Self {
        let ondemand = description
            .get("ondemand")
            .map(DescValue::as_bool)
            .unwrap_or(false);
        let tool = description
            .get("tool")
            .and_then(DescValue::as_text)
            .map(str::to_string);
        let version = description
            .get("version")
            .and_then(DescValue::as_text)
            .map(str::to_string);

        Self {
            tenant_address,
            id,
            status,
            req_time,
            req_cpus,
            req_mem,
            req_disk,
            ondemand,
            tool,
            version,
            description,
            fulfilled: false,
            launch: None,
        }
    }
}
