use crate::{
    core::{
        hash::{
            HashMap,
            HashSet,
        },
        id::Id,
        uri::Uri,
    },
    router::{
        procedure::ProcedureManager,
        topic::TopicManager,
    },
};

/// Configuration of a realm available on the router at startup.
///
/// Depending on router policy, realms may also come into existence when a peer first says HELLO
/// to them.
#[derive(Debug, Clone)]
pub struct RealmConfig {
    pub name: String,
    pub uri: Uri,
}

/// A routing namespace.
///
/// Sessions are scoped to one realm; subscriptions and registrations do not cross realms.
pub struct Realm {
    uri: Uri,
    pub topic_manager: TopicManager,
    pub procedure_manager: ProcedureManager,
}

impl Realm {
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            topic_manager: TopicManager::default(),
            procedure_manager: ProcedureManager::default(),
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

/// The directory of realms owned by the router.
#[derive(Default)]
pub struct RealmManager {
    realms: HashMap<Uri, Realm>,
}

impl RealmManager {
    pub fn get_mut(&mut self, uri: &Uri) -> Option<&mut Realm> {
        self.realms.get_mut(uri)
    }

    pub fn contains(&self, uri: &Uri) -> bool {
        self.realms.contains_key(uri)
    }

    pub fn insert(&mut self, realm: Realm) {
        let uri = realm.uri().clone();
        self.realms.insert(uri, realm);
    }

    /// All subscription and registration IDs live anywhere in the router.
    ///
    /// This is the in-use set for the router ID scope.
    pub fn router_scope_ids(&self) -> HashSet<Id> {
        self.realms
            .values()
            .flat_map(|realm| {
                realm
                    .topic_manager
                    .subscription_ids()
                    .chain(realm.procedure_manager.registration_ids())
            })
            .collect()
    }
}
