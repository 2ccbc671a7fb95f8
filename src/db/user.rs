use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;
use uuid::Uuid;

use super::DBClient;
use crate::models::{User, UserRole};
use crate::utils::blob::MediaBlob;

/// User database operations trait.
pub trait UserExt {
    /// Single user by id or email, whichever is supplied first.
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn save_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: Option<&str>,
    ) -> Result<User, sqlx::Error>;

    /// Admin listing with name/email search and role/active filters.
    async fn get_users(
        &self,
        search: Option<&str>,
        role: Option<UserRole>,
        is_active: Option<bool>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<User>, sqlx::Error>;

    async fn count_users(
        &self,
        search: Option<&str>,
        role: Option<UserRole>,
        is_active: Option<bool>,
    ) -> Result<i64, sqlx::Error>;

    /// Accounts created within the last `days` days.
    async fn count_recent_users(&self, days: i64) -> Result<i64, sqlx::Error>;

    /// Partial profile update; the picture argument distinguishes "leave
    /// untouched" (None) from "replace or clear" (Some).
    async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        phone: Option<String>,
        picture: Option<Option<MediaBlob>>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn update_last_login(&self, user_id: Uuid) -> Result<(), sqlx::Error>;

    /// Store a one-time code with its expiry.
    async fn set_otp(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;

    /// Set a new password hash and consume any pending one-time code.
    async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), sqlx::Error>;
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        if let Some(user_id) = user_id {
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
        } else if let Some(email) = email {
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
        } else {
            Ok(None)
        }
    }

    async fn save_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_users(
        &self,
        search: Option<&str>,
        role: Option<UserRole>,
        is_active: Option<bool>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let mut qb = QueryBuilder::new("SELECT * FROM users WHERE TRUE");
        push_user_filters(&mut qb, search, role, is_active);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1) * limit);

        qb.build_query_as::<User>().fetch_all(&self.pool).await
    }

    async fn count_users(
        &self,
        search: Option<&str>,
        role: Option<UserRole>,
        is_active: Option<bool>,
    ) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_user_filters(&mut qb, search, role, is_active);

        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    async fn count_recent_users(&self, days: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE created_at >= NOW() - ($1 * INTERVAL '1 day')",
        )
        .bind(days)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        phone: Option<String>,
        picture: Option<Option<MediaBlob>>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut qb = QueryBuilder::new("UPDATE users SET updated_at = NOW()");
        if let Some(name) = name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(phone) = phone {
            qb.push(", phone = ").push_bind(phone);
        }
        if let Some(picture) = picture {
            let blob = picture.unwrap_or_default();
            qb.push(", picture_data = ").push_bind(blob.data);
            qb.push(", picture_content_type = ").push_bind(blob.content_type);
            qb.push(", picture_name = ").push_bind(blob.original_name);
            qb.push(", picture_size = ").push_bind(blob.size);
            qb.push(", picture_uploaded_at = ").push_bind(blob.uploaded_at);
            qb.push(", picture_url = ").push_bind(blob.url);
        }
        qb.push(" WHERE id = ").push_bind(user_id).push(" RETURNING *");

        qb.build_query_as::<User>().fetch_optional(&self.pool).await
    }

    async fn update_last_login(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_otp(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET otp_code = $2, otp_expires_at = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password = $2, otp_code = NULL, otp_expires_at = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(password)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn push_user_filters(
    qb: &mut QueryBuilder<'_, sqlx::Postgres>,
    search: Option<&str>,
    role: Option<UserRole>,
    is_active: Option<bool>,
) {
    if let Some(search) = search {
        if !search.is_empty() {
            let pattern = format!("%{}%", search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
    if let Some(role) = role {
        qb.push(" AND role = ").push_bind(role);
    }
    if let Some(is_active) = is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}
