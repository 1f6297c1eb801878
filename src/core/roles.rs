use crate::core::{
    hash::HashSet,
    types::{
        Dictionary,
        Value,
    },
};

/// A role taken by a peer within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PeerRole {
    // Calls RPC endpoints.
    Caller,
    // Registers RPC endpoints.
    Callee,
    // Publishes events to topics.
    Publisher,
    // Subscribes to events for topics.
    Subscriber,
}

impl PeerRole {
    pub fn key_for_details(&self) -> &str {
        match self {
            Self::Caller => "caller",
            Self::Callee => "callee",
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
        }
    }
}

impl TryFrom<&str> for PeerRole {
    type Error = ();
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "caller" => Ok(Self::Caller),
            "callee" => Ok(Self::Callee),
            "publisher" => Ok(Self::Publisher),
            "subscriber" => Ok(Self::Subscriber),
            _ => Err(()),
        }
    }
}

/// A role taken by the router.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouterRole {
    // Supports RPC calls.
    Dealer,
    // Supports pub/sub.
    Broker,
}

impl RouterRole {
    pub fn key_for_details(&self) -> &str {
        match self {
            Self::Dealer => "dealer",
            Self::Broker => "broker",
        }
    }
}

/// Reads the set of peer roles out of a validated HELLO `details.roles` dictionary.
pub fn peer_roles_from_details(details: &Dictionary) -> HashSet<PeerRole> {
    match details.get("roles") {
        Some(Value::Object(roles)) => roles
            .keys()
            .filter_map(|key| PeerRole::try_from(key.as_str()).ok())
            .collect(),
        _ => HashSet::default(),
    }
}

/// Builds the `roles` dictionary advertised by the router in WELCOME.
pub fn router_roles_details<I>(roles: I) -> Dictionary
where
    I: IntoIterator<Item = RouterRole>,
{
    roles
        .into_iter()
        .map(|role| {
            (
                role.key_for_details().to_owned(),
                Value::Object(Dictionary::default()),
            )
        })
        .collect()
}
