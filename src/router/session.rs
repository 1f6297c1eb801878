use crate::core::{
    hash::HashSet,
    id::{
        Id,
        SequentialIdAllocator,
    },
    roles::PeerRole,
    uri::Uri,
};

/// The router end of an open WAMP session.
///
/// A connection holds at most one open session. The record lives from WELCOME until GOODBYE or
/// disconnect; everything the session owns in its realm is released when the record is dropped.
pub struct SessionRecord {
    /// The session ID, reported out to the peer.
    pub id: Id,
    /// The realm the session is scoped to.
    pub realm: Uri,
    /// Roles announced in HELLO.
    pub roles: HashSet<PeerRole>,
    /// Allocator for INVOCATION request IDs minted in this session's scope.
    pub invocation_ids: SequentialIdAllocator,
}

impl SessionRecord {
    pub fn new(id: Id, realm: Uri, roles: HashSet<PeerRole>) -> Self {
        Self {
            id,
            realm,
            roles,
            invocation_ids: SequentialIdAllocator::default(),
        }
    }
}
