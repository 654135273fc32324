use std::collections::BTreeMap;

use anyhow::Result;

use super::{clamp_progress, DbClient, ProjectRecord, ProjectUpdate, ReminderRecipient};

type ProjectRow = (String, String, String, i64, bool);

fn project_from_row((id, owner_username, name, progress, reminder_enabled): ProjectRow) -> ProjectRecord {
    ProjectRecord {
        id,
        owner_username,
        name,
        progress: clamp_progress(progress),
        reminder_enabled,
    }
}

impl DbClient {
    /// Lists every project owned by `owner_username`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_projects_for_owner(&self, owner_username: &str) -> Result<Vec<ProjectRecord>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            "SELECT id, owner_username, name, progress, reminder_enabled FROM projects WHERE owner_username = ?1 ORDER BY name ASC, id ASC",
        )
        .bind(owner_username)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(project_from_row).collect())
    }

    /// Fetches one project for its owner.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_project(
        &self,
        owner_username: &str,
        project_id: &str,
    ) -> Result<Option<ProjectRecord>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            "SELECT id, owner_username, name, progress, reminder_enabled FROM projects WHERE owner_username = ?1 AND id = ?2",
        )
        .bind(owner_username)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(project_from_row))
    }

    /// Inserts the batch inside one transaction, skipping rows whose
    /// `(owner_username, id)` already exists. Returns the number of rows written.
    ///
    /// # Errors
    /// Returns an error if any insert or the commit fails; nothing from the batch is kept.
    pub async fn insert_projects_if_absent(&self, records: &[ProjectRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut transaction = self.pool.begin().await?;
        let mut inserted = 0;

        for record in records {
            let result = sqlx::query(
                "INSERT INTO projects (id, owner_username, name, progress, reminder_enabled) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(owner_username, id) DO NOTHING",
            )
            .bind(&record.id)
            .bind(&record.owner_username)
            .bind(&record.name)
            .bind(i64::from(record.progress))
            .bind(record.reminder_enabled)
            .execute(&mut *transaction)
            .await?;

            inserted += result.rows_affected();
        }

        transaction.commit().await?;
        Ok(inserted)
    }

    /// Applies the set fields of `update`. Returns `false` when the owner has no such project.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn update_project(
        &self,
        owner_username: &str,
        project_id: &str,
        update: ProjectUpdate,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE projects SET progress = COALESCE(?3, progress), reminder_enabled = COALESCE(?4, reminder_enabled), updated_at = CURRENT_TIMESTAMP WHERE owner_username = ?1 AND id = ?2",
        )
        .bind(owner_username)
        .bind(project_id)
        .bind(update.progress.map(i64::from))
        .bind(update.reminder_enabled)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flips the reminder flag in place and returns its new value.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn toggle_project_reminder(
        &self,
        owner_username: &str,
        project_id: &str,
    ) -> Result<Option<bool>> {
        let enabled = sqlx::query_scalar::<_, bool>(
            "UPDATE projects SET reminder_enabled = NOT reminder_enabled, updated_at = CURRENT_TIMESTAMP WHERE owner_username = ?1 AND id = ?2 RETURNING reminder_enabled",
        )
        .bind(owner_username)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enabled)
    }

    /// Users with an email address, each with their reminder-enabled projects.
    /// Users without any such project are left out.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_reminder_recipients(&self) -> Result<Vec<ReminderRecipient>> {
        let rows = sqlx::query_as::<_, (String, String, String, String, i64, bool)>(
            "SELECT u.github_login, u.email, p.id, p.name, p.progress, p.reminder_enabled FROM users u JOIN projects p ON p.owner_username = u.github_login WHERE u.email IS NOT NULL AND TRIM(u.email) <> '' AND p.reminder_enabled = 1 ORDER BY u.github_login ASC, p.name ASC, p.id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut recipients: BTreeMap<String, ReminderRecipient> = BTreeMap::new();
        for (github_login, email, id, name, progress, reminder_enabled) in rows {
            let recipient = recipients
                .entry(github_login.clone())
                .or_insert_with(|| ReminderRecipient {
                    github_login: github_login.clone(),
                    email,
                    projects: Vec::new(),
                });

            recipient.projects.push(project_from_row((
                id,
                github_login,
                name,
                progress,
                reminder_enabled,
            )));
        }

        Ok(recipients.into_values().collect())
    }
}
