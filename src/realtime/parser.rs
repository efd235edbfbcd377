//! Block notification parsing.

use serde_json::Value;

use crate::realtime::types::{RealTimeTelemetryPayload, RealtimeError};

/// Parse a `0x`-prefixed (or bare) hex quantity.
pub fn parse_hex_u64(value: &str) -> Result<u64, RealtimeError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u64::from_str_radix(digits, 16)
        .map_err(|e| RealtimeError::Parse(format!("'{}' is not a hex quantity: {}", value, e)))
}

fn hex_field(result: &Value, name: &str) -> Result<u64, RealtimeError> {
    let raw = result
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| RealtimeError::Parse(format!("block field '{}' missing", name)))?;
    parse_hex_u64(raw)
}

fn signed_field(result: &Value, name: &str) -> Result<i64, RealtimeError> {
    let value = hex_field(result, name)?;
    i64::try_from(value).map_err(|_| RealtimeError::Parse(format!("block field '{}' out of range", name)))
}

/// Build a sample from a subscription notification.
///
/// Returns `Ok(None)` when the message carries no `params.result` object
/// (subscription acks, errors, anything else the node sends).
pub fn parse_block_notification(
    message: &str,
    client: &str,
    num_peers: u16,
    received_at: i64,
) -> Result<Option<RealTimeTelemetryPayload>, RealtimeError> {
    let json: Value = serde_json::from_str(message.trim())
        .map_err(|e| RealtimeError::Parse(format!("notification is not JSON: {}", e)))?;

    let Some(result) = json.pointer("/params/result").filter(|r| r.is_object()) else {
        return Ok(None);
    };

    let block_hash = result
        .get("hash")
        .and_then(Value::as_str)
        .ok_or_else(|| RealtimeError::Parse("block field 'hash' missing".into()))?
        .to_string();

    let tx_count = result
        .get("transactions")
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or_else(|| RealtimeError::Parse("block field 'transactions' missing".into()))?;

    Ok(Some(RealTimeTelemetryPayload {
        client: client.to_string(),
        block_num: hex_field(result, "number")?,
        block_hash,
        block_ts: signed_field(result, "timestamp")?,
        block_received: received_at,
        num_peers,
        num_tx_in_block: u16::try_from(tx_count)
            .map_err(|_| RealtimeError::Parse(format!("{} transactions do not fit a u16", tx_count)))?,
        gas_limit: signed_field(result, "gasLimit")?,
        gas_used: signed_field(result, "gasUsed")?,
    }))
}
