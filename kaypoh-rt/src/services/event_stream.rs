//! Line-oriented decoder for the classifier's result stream
//!
//! The result body is newline-delimited. Lines starting with `data: ` carry a
//! JSON record; every other line (`event: ...`, blanks, heartbeats) is
//! ignorable. The first data line that parses as JSON is the result.

use serde_json::Value;

const DATA_PREFIX: &str = "data: ";

/// One decoded line of the result stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A data line whose payload parsed as JSON
    Data(Value),
    /// A data line whose payload did not parse
    Malformed(String),
    /// Anything else
    Ignorable,
}

/// Decode a single line
pub fn decode_line(line: &str) -> StreamEvent {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return StreamEvent::Ignorable;
    };
    match serde_json::from_str(payload) {
        Ok(value) => StreamEvent::Data(value),
        Err(e) => StreamEvent::Malformed(e.to_string()),
    }
}

/// Decode a whole body into typed events
pub fn decode(body: &str) -> impl Iterator<Item = StreamEvent> + '_ {
    body.split('\n').map(decode_line)
}

/// First parseable data record, unwrapped from its array envelope
///
/// A non-empty array yields its first element; any other value is returned
/// as is. Malformed data lines are skipped.
pub fn first_data(body: &str) -> Option<Value> {
    decode(body).find_map(|event| match event {
        StreamEvent::Data(Value::Array(mut items)) if !items.is_empty() => {
            Some(items.swap_remove(0))
        }
        StreamEvent::Data(value) => Some(value),
        StreamEvent::Malformed(e) => {
            tracing::warn!(error = %e, "Skipping unparsable data line");
            None
        }
        StreamEvent::Ignorable => None,
    })
}
