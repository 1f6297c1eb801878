/// Type alias for WAMP integers.
pub type Integer = u64;

/// A WAMP value, carried opaquely through the router.
///
/// Application payloads (`arguments`, `arguments_keyword`) and option dictionaries are routed
/// without interpretation beyond the keys the router itself reads.
pub type Value = serde_json::Value;

/// An ordered list of WAMP values.
pub type List = Vec<Value>;

/// An unordered mapping of strings to WAMP values.
pub type Dictionary = serde_json::Map<String, Value>;
