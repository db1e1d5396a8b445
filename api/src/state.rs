use std::sync::Arc;

use sea_orm::DatabaseConnection;
use services::{AttendanceRecorder, CheckInPolicy, DemoSessionStore, SessionRegistry};

/// Everything the handlers share, built once at startup and cloned into each
/// request.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    registry: SessionRegistry,
    recorder: AttendanceRecorder,
    policy: Arc<CheckInPolicy>,
}

impl AppState {
    /// Wires the registry and the recorder to one shared demo store.
    pub fn new(db: DatabaseConnection, policy: CheckInPolicy) -> Self {
        let demo = DemoSessionStore::new();
        Self {
            registry: SessionRegistry::new(db.clone(), demo.clone()),
            recorder: AttendanceRecorder::new(db.clone(), demo),
            policy: Arc::new(policy),
            db,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn recorder(&self) -> &AttendanceRecorder {
        &self.recorder
    }

    pub fn policy(&self) -> &CheckInPolicy {
        &self.policy
    }
}
