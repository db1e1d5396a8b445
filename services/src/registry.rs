//! Resolves session ids to session state.
//!
//! The registry is an ordinary value built once at startup and handed to the
//! HTTP layer through `AppState`; tests build their own instances.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use db::models::class_session;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::checkin::SessionSnapshot;
use crate::demo_store::DemoSessionStore;

/// Where a session lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    Persistent,
    Demo,
}

#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub snapshot: SessionSnapshot,
    pub origin: SessionOrigin,
}

#[derive(Clone, Debug)]
pub struct SessionRegistry {
    db: DatabaseConnection,
    demo: DemoSessionStore,
}

impl SessionRegistry {
    pub fn new(db: DatabaseConnection, demo: DemoSessionStore) -> Self {
        Self { db, demo }
    }

    pub fn demo(&self) -> &DemoSessionStore {
        &self.demo
    }

    /// Database first, then the demo store.
    pub async fn lookup(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ResolvedSession>, DbErr> {
        if let Some(model) = class_session::Entity::find_by_id(id).one(&self.db).await? {
            return Ok(Some(ResolvedSession {
                snapshot: model.into(),
                origin: SessionOrigin::Persistent,
            }));
        }

        Ok(self.demo.get(id, now).await.map(|snapshot| ResolvedSession {
            snapshot,
            origin: SessionOrigin::Demo,
        }))
    }

    /// Marks an active session inactive once `now` is past its window.
    pub async fn expire_if_past(
        &self,
        mut resolved: ResolvedSession,
        now: DateTime<Utc>,
    ) -> Result<ResolvedSession, DbErr> {
        if !resolved.snapshot.active || now <= resolved.snapshot.ends_at {
            return Ok(resolved);
        }

        match resolved.origin {
            SessionOrigin::Persistent => {
                class_session::Entity::update_many()
                    .col_expr(class_session::Column::Active, Expr::value(false))
                    .col_expr(class_session::Column::UpdatedAt, Expr::value(now))
                    .filter(class_session::Column::Id.eq(resolved.snapshot.id))
                    .filter(class_session::Column::Active.eq(true))
                    .exec(&self.db)
                    .await?;
                tracing::info!(session_id = %resolved.snapshot.id, "Attendance session expired");
            }
            SessionOrigin::Demo => {
                self.demo.deactivate(resolved.snapshot.id, now).await;
            }
        }

        resolved.snapshot.active = false;
        Ok(resolved)
    }

    /// Manually closes a persistent session of `course_id`.
    ///
    /// Returns `None` when no such session exists in that course.
    pub async fn close(
        &self,
        course_id: i64,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<class_session::Model>, DbErr> {
        let Some(model) = class_session::Model::find_in_course(&self.db, course_id, id).await?
        else {
            return Ok(None);
        };
        if model.closed_at.is_some() {
            return Ok(Some(model));
        }
        model.deactivate(&self.db, Some(now)).await.map(Some)
    }

    /// Runs [`DemoSessionStore::sweep`] every `interval` until the task is aborted.
    pub fn spawn_demo_sweeper(
        &self,
        interval: StdDuration,
        idle: Duration,
        retention: Duration,
    ) -> JoinHandle<()> {
        let demo = self.demo.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = demo.sweep(Utc::now(), idle, retention).await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept idle demo sessions");
                }
            }
        })
    }
}
