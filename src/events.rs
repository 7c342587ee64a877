use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
	Created,
	Updated,
	Removed,
}

/// Emitted by a service after one of its entities was created, updated or removed.
#[derive(Clone, Debug)]
pub struct EntityChanged {
	/// Name of the emitting service, e.g. `stories`.
	pub service: &'static str,
	pub change: Change,
	pub id: Uuid,
}

pub trait Listener: Send + Sync {
	fn entity_changed(&self, event: &EntityChanged);
}

/// Delivers entity-changed events to every subscribed listener, in
/// subscription order, before `emit` returns.
#[derive(Default)]
pub struct EventBus {
	listeners: RwLock<Vec<Arc<dyn Listener>>>,
}

impl EventBus {
	pub fn subscribe(&self, listener: Arc<dyn Listener>) {
		self.listeners.write().push(listener);
	}

	pub fn emit(&self, service: &'static str, change: Change, id: Uuid) {
		let event = EntityChanged {
			service,
			change,
			id,
		};

		tracing::debug!(service, ?change, %id, "entity changed");

		for listener in self.listeners.read().iter() {
			listener.entity_changed(&event);
		}
	}
}
