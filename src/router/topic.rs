use crate::core::{
    error::InteractionError,
    hash::{
        HashMap,
        HashSet,
    },
    id::Id,
    uri::Uri,
};

/// A subscription to a topic, shared by every session subscribed to it.
#[derive(Debug)]
pub struct Subscription {
    /// The topic events are routed by.
    pub topic: Uri,
    /// Session IDs of all subscribers.
    pub subscribers: HashSet<Id>,
}

/// A manager for all subscriptions owned by a realm.
///
/// Subscriptions are indexed both ways: by subscription ID and by topic. A topic has at most one
/// subscription, shared by all of its subscribers.
#[derive(Default)]
pub struct TopicManager {
    subscriptions: HashMap<Id, Subscription>,
    topics: HashMap<Uri, Id>,
}

impl TopicManager {
    /// Subscribes the session to a topic.
    ///
    /// If the topic already has a subscription, its ID is reused (including when the session is
    /// already a subscriber); otherwise `fresh_id` indexes a new subscription.
    pub fn subscribe(&mut self, session: Id, topic: Uri, fresh_id: Id) -> Id {
        match self.topics.get(&topic) {
            Some(&subscription_id) => {
                self.subscriptions
                    .get_mut(&subscription_id)
                    .map(|subscription| subscription.subscribers.insert(session));
                subscription_id
            }
            None => {
                self.topics.insert(topic.clone(), fresh_id);
                self.subscriptions.insert(
                    fresh_id,
                    Subscription {
                        topic,
                        subscribers: HashSet::from_iter([session]),
                    },
                );
                fresh_id
            }
        }
    }

    /// Unsubscribes the session from a subscription.
    ///
    /// The subscription is deleted once its last subscriber leaves.
    pub fn unsubscribe(&mut self, session: Id, subscription_id: Id) -> Result<(), InteractionError> {
        let subscription = self
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or(InteractionError::NoSuchSubscription)?;
        if !subscription.subscribers.remove(&session) {
            return Err(InteractionError::NoSuchSubscription);
        }
        if subscription.subscribers.is_empty() {
            let topic = subscription.topic.clone();
            self.subscriptions.remove(&subscription_id);
            self.topics.remove(&topic);
        }
        Ok(())
    }

    /// Looks up the subscription for a topic.
    pub fn subscription_for_topic(&self, topic: &Uri) -> Option<(Id, &Subscription)> {
        let subscription_id = *self.topics.get(topic)?;
        self.subscriptions
            .get(&subscription_id)
            .map(|subscription| (subscription_id, subscription))
    }

    /// Removes the session from every subscription it holds.
    pub fn release_session(&mut self, session: Id) {
        let emptied = self
            .subscriptions
            .iter_mut()
            .filter_map(|(&subscription_id, subscription)| {
                subscription.subscribers.remove(&session);
                subscription
                    .subscribers
                    .is_empty()
                    .then(|| (subscription_id, subscription.topic.clone()))
            })
            .collect::<Vec<_>>();
        for (subscription_id, topic) in emptied {
            self.subscriptions.remove(&subscription_id);
            self.topics.remove(&topic);
        }
    }

    /// All live subscription IDs.
    pub fn subscription_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.subscriptions.keys().cloned()
    }
}
