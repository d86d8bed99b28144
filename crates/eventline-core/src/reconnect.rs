//! Reconnect advice for clients of an event stream.
//!
//! The parser only records the `retry` value a server sends. Waiting and
//! reconnecting belong to whoever owns the connection; this module turns
//! the recorded value into the delay they should use.

/// Bounds applied to the reconnection time a stream advertises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay in milliseconds when the stream never sent a usable `retry` field.
    pub default_delay_ms: u64,
    /// Upper bound in milliseconds for any server-advised delay.
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: 3000,
            max_delay_ms: 60_000,
        }
    }
}

/// Milliseconds to wait before reconnecting, given the parser's
/// [`reconnection_time`](crate::EventParser::reconnection_time).
///
/// The `-1` sentinel, and any other negative value, means the server gave no
/// advice and `default_delay_ms` applies. The result never exceeds
/// `max_delay_ms`.
pub fn reconnect_delay(config: &ReconnectConfig, reconnection_time_ms: i64) -> u64 {
    u64::try_from(reconnection_time_ms)
        .unwrap_or(config.default_delay_ms)
        .min(config.max_delay_ms)
}
