use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = duet_common::id::prefixed_ulid("room");
/// assert!(id.starts_with("room_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known ID prefixes.
pub mod prefix {
    /// Anonymous visitor session tokens.
    pub const SESSION: &str = "ses";
    pub const ROOM: &str = "room";
    /// Chat and system events published on a room topic.
    pub const EVENT: &str = "evt";
    /// Gateway WebSocket connections.
    pub const GATEWAY: &str = "gw";
}
