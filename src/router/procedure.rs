use crate::core::{
    error::InteractionError,
    hash::HashMap,
    id::Id,
    uri::Uri,
};

/// A procedure registration held by a single callee.
#[derive(Debug)]
pub struct Registration {
    /// The procedure peers call.
    pub procedure: Uri,
    /// The session ID of the callee.
    pub callee: Id,
}

/// An in-flight call, alive from the moment its INVOCATION is dispatched until a terminal YIELD
/// or ERROR returns, or either party disconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    /// The caller's CALL request ID, used to correlate the result back.
    pub call_request: Id,
    /// The session ID of the caller.
    pub caller: Id,
    /// The registration the call was routed through.
    pub registration: Id,
}

/// A manager for all procedures owned by a realm.
///
/// Registrations are indexed both ways: by registration ID and by procedure. A procedure has at
/// most one callee. Pending calls are keyed by the callee session and the INVOCATION request ID
/// minted in that session's scope.
#[derive(Default)]
pub struct ProcedureManager {
    registrations: HashMap<Id, Registration>,
    procedures: HashMap<Uri, Id>,
    pending_calls: HashMap<(Id, Id), PendingCall>,
}

impl ProcedureManager {
    /// Registers a procedure for a callee.
    pub fn register(
        &mut self,
        callee: Id,
        procedure: Uri,
        fresh_id: Id,
    ) -> Result<Id, InteractionError> {
        if self.procedures.contains_key(&procedure) {
            return Err(InteractionError::ProcedureAlreadyExists);
        }
        self.procedures.insert(procedure.clone(), fresh_id);
        self.registrations
            .insert(fresh_id, Registration { procedure, callee });
        Ok(fresh_id)
    }

    /// Unregisters a procedure.
    ///
    /// Pending calls routed through the registration are drained and returned, so the router can
    /// fail them back to their callers.
    pub fn unregister(
        &mut self,
        callee: Id,
        registration_id: Id,
    ) -> Result<Vec<PendingCall>, InteractionError> {
        match self.registrations.get(&registration_id) {
            Some(registration) if registration.callee == callee => (),
            _ => return Err(InteractionError::NoSuchRegistration),
        }
        let registration = self
            .registrations
            .remove(&registration_id)
            .ok_or(InteractionError::NoSuchRegistration)?;
        self.procedures.remove(&registration.procedure);
        Ok(self.drain_pending_calls(|pending| pending.registration == registration_id))
    }

    /// Looks up the registration for a procedure.
    pub fn registration_for_procedure(&self, procedure: &Uri) -> Option<(Id, &Registration)> {
        let registration_id = *self.procedures.get(procedure)?;
        self.registrations
            .get(&registration_id)
            .map(|registration| (registration_id, registration))
    }

    /// Records an in-flight call toward a callee.
    pub fn add_pending_call(&mut self, callee: Id, invocation_request: Id, pending: PendingCall) {
        self.pending_calls
            .insert((callee, invocation_request), pending);
    }

    /// Takes the pending call correlated to a YIELD or invocation ERROR from the callee.
    pub fn take_pending_call(
        &mut self,
        callee: Id,
        invocation_request: Id,
    ) -> Option<PendingCall> {
        self.pending_calls.remove(&(callee, invocation_request))
    }

    /// Releases everything owned by a disconnecting callee session.
    ///
    /// Its registrations are removed and all in-flight calls toward it are drained and returned,
    /// so the router can fail them back to their callers.
    pub fn release_callee(&mut self, session: Id) -> Vec<PendingCall> {
        let released = self
            .registrations
            .iter()
            .filter(|(_, registration)| registration.callee == session)
            .map(|(&registration_id, registration)| {
                (registration_id, registration.procedure.clone())
            })
            .collect::<Vec<_>>();
        for (registration_id, procedure) in released {
            self.registrations.remove(&registration_id);
            self.procedures.remove(&procedure);
        }
        self.drain_pending_calls_by_key(|&(callee, _)| callee == session)
    }

    /// Discards pending calls originated by a disconnecting caller session.
    ///
    /// The callee is not notified; its eventual YIELD is dropped for lack of a pending entry.
    pub fn discard_caller(&mut self, session: Id) {
        self.pending_calls
            .retain(|_, pending| pending.caller != session);
    }

    /// All live registration IDs.
    pub fn registration_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.registrations.keys().cloned()
    }

    fn drain_pending_calls<F>(&mut self, mut filter: F) -> Vec<PendingCall>
    where
        F: FnMut(&PendingCall) -> bool,
    {
        let keys = self
            .pending_calls
            .iter()
            .filter(|(_, pending)| filter(pending))
            .map(|(&key, _)| key)
            .collect::<Vec<_>>();
        keys.into_iter()
            .filter_map(|key| self.pending_calls.remove(&key))
            .collect()
    }

    fn drain_pending_calls_by_key<F>(&mut self, mut filter: F) -> Vec<PendingCall>
    where
        F: FnMut(&(Id, Id)) -> bool,
    {
        let keys = self
            .pending_calls
            .keys()
            .filter(|key| filter(key))
            .cloned()
            .collect::<Vec<_>>();
        keys.into_iter()
            .filter_map(|key| self.pending_calls.remove(&key))
            .collect()
    }
}

#[cfg(test)]
mod procedure_manager_test {
    use crate::{
        core::{
            error::InteractionError,
            id::Id,
            uri::Uri,
        },
        router::procedure::{
            PendingCall,
            ProcedureManager,
        },
    };

    fn id(value: u64) -> Id {
        Id::try_from(value).unwrap()
    }

    #[test]
    fn rejects_duplicate_procedure() {
        let mut manager = ProcedureManager::default();
        let procedure = Uri::try_from("myapp.echo").unwrap();
        assert_matches::assert_matches!(manager.register(id(101), procedure.clone(), id(1)), Ok(_));
        assert_matches::assert_matches!(
            manager.register(id(102), procedure, id(2)),
            Err(InteractionError::ProcedureAlreadyExists)
        );
    }

    #[test]
    fn register_then_unregister_restores_pre_state() {
        let mut manager = ProcedureManager::default();
        let procedure = Uri::try_from("myapp.echo").unwrap();
        let registration = manager.register(id(101), procedure.clone(), id(1)).unwrap();
        assert_matches::assert_matches!(manager.unregister(id(101), registration), Ok(pending) => {
            assert!(pending.is_empty());
        });
        assert_matches::assert_matches!(manager.registration_for_procedure(&procedure), None);
        assert_eq!(manager.registration_ids().count(), 0);
    }

    #[test]
    fn fails_unregister_for_wrong_callee() {
        let mut manager = ProcedureManager::default();
        let registration = manager
            .register(id(101), Uri::try_from("myapp.echo").unwrap(), id(1))
            .unwrap();
        assert_matches::assert_matches!(
            manager.unregister(id(102), registration),
            Err(InteractionError::NoSuchRegistration)
        );
    }

    #[test]
    fn unregister_drains_pending_calls() {
        let mut manager = ProcedureManager::default();
        let registration = manager
            .register(id(101), Uri::try_from("myapp.echo").unwrap(), id(1))
            .unwrap();
        let pending = PendingCall {
            call_request: id(7),
            caller: id(102),
            registration,
        };
        manager.add_pending_call(id(101), id(1), pending.clone());
        assert_matches::assert_matches!(manager.unregister(id(101), registration), Ok(drained) => {
            assert_eq!(drained, vec![pending]);
        });
        assert_matches::assert_matches!(manager.take_pending_call(id(101), id(1)), None);
    }

    #[test]
    fn releases_callee_registrations_and_pending_calls() {
        let mut manager = ProcedureManager::default();
        let registration = manager
            .register(id(101), Uri::try_from("myapp.echo").unwrap(), id(1))
            .unwrap();
        manager
            .register(id(103), Uri::try_from("myapp.other").unwrap(), id(2))
            .unwrap();
        manager.add_pending_call(
            id(101),
            id(1),
            PendingCall {
                call_request: id(7),
                caller: id(102),
                registration,
            },
        );
        let drained = manager.release_callee(id(101));
        assert_eq!(drained.len(), 1);
        assert_matches::assert_matches!(
            manager.registration_for_procedure(&Uri::try_from("myapp.echo").unwrap()),
            None
        );
        assert_matches::assert_matches!(
            manager.registration_for_procedure(&Uri::try_from("myapp.other").unwrap()),
            Some(_)
        );
    }

    #[test]
    fn discards_pending_calls_for_caller() {
        let mut manager = ProcedureManager::default();
        let registration = manager
            .register(id(101), Uri::try_from("myapp.echo").unwrap(), id(1))
            .unwrap();
        manager.add_pending_call(
            id(101),
            id(1),
            PendingCall {
                call_request: id(7),
                caller: id(102),
                registration,
            },
        );
        manager.discard_caller(id(102));
        assert_matches::assert_matches!(manager.take_pending_call(id(101), id(1)), None);
    }
}
