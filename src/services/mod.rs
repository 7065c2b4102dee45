pub mod event_log;
pub mod identity_service;

pub use event_log::{EventLog, EventLogError, EventType, IdentityEvent, InMemoryEventLog};
pub use identity_service::{IdentityError, IdentityRecord, IdentityService, InMemoryIdentityStore, NewIdentity};
