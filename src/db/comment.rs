use uuid::Uuid;

use super::DBClient;
use crate::models::CommentRecord;

/// Comment database operations trait.
pub trait CommentExt {
    /// Comments of a content item in insertion order, with author names.
    async fn get_comments_for(
        &self,
        content_id: Uuid,
    ) -> Result<Vec<CommentRecord>, sqlx::Error>;

    /// Append a comment and return it joined with the author display name.
    async fn add_comment(
        &self,
        content_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<CommentRecord, sqlx::Error>;
}

impl CommentExt for DBClient {
    async fn get_comments_for(
        &self,
        content_id: Uuid,
    ) -> Result<Vec<CommentRecord>, sqlx::Error> {
        sqlx::query_as::<_, CommentRecord>(
            r#"
            SELECT m.*, u.name AS author_name
            FROM comments m
            INNER JOIN users u ON m.user_id = u.id
            WHERE m.content_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn add_comment(
        &self,
        content_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<CommentRecord, sqlx::Error> {
        sqlx::query_as::<_, CommentRecord>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (content_id, user_id, content)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT i.*, u.name AS author_name
            FROM inserted i
            INNER JOIN users u ON i.user_id = u.id
            "#,
        )
        .bind(content_id)
        .bind(user_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
    }
}
