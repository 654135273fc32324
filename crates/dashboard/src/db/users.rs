use anyhow::Result;

use super::{DbClient, NewUser, UserRecord};

#[allow(clippy::missing_errors_doc)]
impl DbClient {
    /// Creates the user on first sign-in; later sign-ins refresh the GitHub profile
    /// fields and leave the collected email alone.
    pub async fn upsert_user(&self, user: &NewUser) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (github_login, github_user_id, display_name) VALUES (?1, ?2, ?3) ON CONFLICT(github_login) DO UPDATE SET github_user_id = excluded.github_user_id, display_name = excluded.display_name, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(&user.github_login)
        .bind(user.github_user_id)
        .bind(user.display_name.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_user(&self, github_login: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, (String, Option<i64>, Option<String>, Option<String>)>(
            "SELECT github_login, github_user_id, display_name, email FROM users WHERE github_login = ?1",
        )
        .bind(github_login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(github_login, github_user_id, display_name, email)| UserRecord {
                github_login,
                github_user_id,
                display_name,
                email,
            },
        ))
    }

    /// Returns `false` when no user with that login exists.
    pub async fn set_user_email(&self, github_login: &str, email: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET email = ?2, updated_at = CURRENT_TIMESTAMP WHERE github_login = ?1",
        )
        .bind(github_login)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
