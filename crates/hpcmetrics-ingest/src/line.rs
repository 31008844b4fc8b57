// SPDX-License-Identifier: Apache-2.0

//! The line-protocol wire format:
//! `metric,cluster=<c>,hostname=<h>,type=<t>[,type-id=<i>] value=<float> <unix-seconds>`

use hpcmetrics_store::{MetricPath, Scope};

/// A single parsed sample, ready to be written into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSample {
    /// Metric name.
    pub metric: String,
    /// Destination path.
    pub path: MetricPath,
    /// Sample value.
    pub value: f32,
    /// Sample timestamp, unix seconds.
    pub timestamp: i64,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    /// The line has no tag/field section at all.
    #[error("malformed line")]
    Malformed,
    /// A mandatory tag (`cluster`, `hostname`, or `type`) is missing.
    #[error("missing mandatory tag: {0}")]
    MissingTag(&'static str),
    /// The `type` tag's value is not a recognised scope.
    #[error("unknown scope: {0}")]
    UnknownScope(String),
    /// The `value` field is not a valid float.
    #[error("invalid value")]
    InvalidValue,
    /// The trailing timestamp is not a valid integer.
    #[error("invalid timestamp")]
    InvalidTimestamp,
}

/// Parses one line of the wire format. Unknown tags are ignored; recognised tags may appear in
/// any order.
pub fn parse_line(line: &str) -> Result<ParsedSample, LineError> {
    let line = line.trim();
    let (head, rest) = line.split_once(' ').ok_or(LineError::Malformed)?;
    let (value_str, timestamp_str) = rest.trim().rsplit_once(' ').ok_or(LineError::Malformed)?;

    let mut parts = head.split(',');
    let metric = parts.next().ok_or(LineError::Malformed)?.to_owned();

    let mut cluster = None;
    let mut hostname = None;
    let mut scope_str = None;
    let mut type_id = None;

    for tag in parts {
        let Some((key, value)) = tag.split_once('=') else { continue };
        match key {
            "cluster" => cluster = Some(value.to_owned()),
            "hostname" => hostname = Some(value.to_owned()),
            "type" => scope_str = Some(value.to_owned()),
            "type-id" => type_id = Some(value.to_owned()),
            _ => {}
        }
    }

    let cluster = cluster.ok_or(LineError::MissingTag("cluster"))?;
    let hostname = hostname.ok_or(LineError::MissingTag("hostname"))?;
    let scope_str = scope_str.ok_or(LineError::MissingTag("type"))?;
    let scope: Scope = scope_str.parse().map_err(|_| LineError::UnknownScope(scope_str))?;

    let value_str = value_str
        .strip_prefix("value=")
        .ok_or(LineError::Malformed)?;
    let value: f32 = value_str.parse().map_err(|_| LineError::InvalidValue)?;
    let timestamp: i64 = timestamp_str.parse().map_err(|_| LineError::InvalidTimestamp)?;

    let mut path = MetricPath::node(cluster, hostname);
    if scope != Scope::Node {
        path = path.with_segment(scope, type_id.unwrap_or_default());
    }

    Ok(ParsedSample { metric, path, value, timestamp })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_node_scope_line() {
        let sample = parse_line("flops_any,cluster=fritz,hostname=f0001,type=node value=1.23 1700000000").unwrap();
        assert_eq!(sample.metric, "flops_any");
        assert_eq!(sample.path.cluster, "fritz");
        assert_eq!(sample.value, 1.23);
        assert_eq!(sample.timestamp, 1_700_000_000);
    }

    #[test]
    fn parses_a_socket_scope_line_with_type_id() {
        let sample =
            parse_line("mem_used,cluster=fritz,hostname=f0001,type=socket,type-id=0 value=2 1700000000").unwrap();
        assert_eq!(sample.path.segments.len(), 1);
        assert_eq!(sample.path.segments[0].type_id.as_deref(), Some("0"));
    }

    #[test]
    fn unknown_tags_are_ignored() {
        let sample = parse_line(
            "flops_any,cluster=fritz,hostname=f0001,type=node,unused=x value=1 1700000000",
        )
        .unwrap();
        assert_eq!(sample.metric, "flops_any");
    }

    #[test]
    fn missing_mandatory_tag_is_an_error() {
        let err = parse_line("flops_any,cluster=fritz,type=node value=1 1700000000").unwrap_err();
        assert_eq!(err, LineError::MissingTag("hostname"));
    }

    #[test]
    fn invalid_value_is_an_error() {
        let err = parse_line("flops_any,cluster=fritz,hostname=f0001,type=node value=abc 1700000000").unwrap_err();
        assert_eq!(err, LineError::InvalidValue);
    }
}
