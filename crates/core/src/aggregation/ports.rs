//! Port interfaces for appointment storage and project lookups

use async_trait::async_trait;
use focusledger_domain::{Project, Result, TimeEntry};

/// Persistence for per-(user, project) time entries.
#[async_trait]
pub trait TimeEntryRepository: Send + Sync {
    async fn find_entry(&self, user_id: &str, project_id: &str) -> Result<Option<TimeEntry>>;

    /// Insert or replace the entry keyed by `(user_id, project_id)`.
    async fn upsert_entry(&self, entry: &TimeEntry) -> Result<()>;

    /// Entries holding at least one appointment for the normalized app key.
    async fn entries_with_app(&self, app_key: &str) -> Result<Vec<TimeEntry>>;

    async fn entries_for_user(&self, user_id: &str) -> Result<Vec<TimeEntry>>;

    async fn entries_for_project(&self, project_id: &str) -> Result<Vec<TimeEntry>>;
}

/// Read access to projects, their members and billable flags.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Current billable flag. Unknown projects are not billable.
    async fn is_project_billable(&self, project_id: &str) -> Result<bool>;

    async fn project_name(&self, project_id: &str) -> Result<Option<String>>;

    /// User ids of the project's members.
    async fn project_members(&self, project_id: &str) -> Result<Vec<String>>;

    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Every user that belongs to at least one project.
    async fn list_users(&self) -> Result<Vec<String>>;
}
