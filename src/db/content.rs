use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::DBClient;
use crate::dtos::{ContentQueryDto, CreateContentDto, UpdateContentDto};
use crate::models::{ContentItem, ContentKind, ContentRecord};
use crate::utils::blob::MediaBlob;

const RECORD_COLUMNS: &str = "c.*, u.name AS author_name, u.email AS author_email, \
     cat.name AS category_name, cat.slug AS category_slug";

const RECORD_JOINS: &str = "FROM content_items c \
     INNER JOIN users u ON c.author_id = u.id \
     INNER JOIN categories cat ON c.category_id = cat.id";

/// Content item database operations, shared by all three kinds.
pub trait ContentExt {
    /// Paginated, filtered listing with author/category display fields.
    async fn list_content(
        &self,
        kind: ContentKind,
        filter: &ContentQueryDto,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ContentRecord>, sqlx::Error>;

    /// Total matching the same filters as `list_content`.
    async fn count_filtered(
        &self,
        kind: ContentKind,
        filter: &ContentQueryDto,
    ) -> Result<i64, sqlx::Error>;

    /// Single item with joined display fields.
    async fn get_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentRecord>, sqlx::Error>;

    /// Bare row without joins, for authorization checks and counter reads.
    async fn get_content_item(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentItem>, sqlx::Error>;

    async fn save_content(
        &self,
        kind: ContentKind,
        author_id: Uuid,
        dto: &CreateContentDto,
        image: Option<MediaBlob>,
    ) -> Result<ContentItem, sqlx::Error>;

    /// Partial update; absent fields keep their stored values. The author
    /// column is never touched.
    async fn update_content(
        &self,
        kind: ContentKind,
        id: Uuid,
        dto: &UpdateContentDto,
        image: Option<Option<MediaBlob>>,
    ) -> Result<Option<ContentItem>, sqlx::Error>;

    /// Hard delete; returns the deleted row so the caller can refresh the
    /// category count.
    async fn delete_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentItem>, sqlx::Error>;

    /// Increment and persist the view counter, returning the new value.
    async fn increment_views(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<i64>, sqlx::Error>;

    /// Overwrite the like counter (toggle semantics computed by the caller).
    async fn set_likes(
        &self,
        kind: ContentKind,
        id: Uuid,
        likes: i64,
    ) -> Result<Option<i64>, sqlx::Error>;

    async fn increment_shares(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<i64>, sqlx::Error>;

    /// Unfiltered total for one kind.
    async fn count_content(&self, kind: ContentKind) -> Result<i64, sqlx::Error>;

    async fn count_published(&self, kind: ContentKind) -> Result<i64, sqlx::Error>;

    /// Items of one kind created within the last `days` days.
    async fn count_recent(&self, kind: ContentKind, days: i64) -> Result<i64, sqlx::Error>;
}

/// Append the WHERE clause shared by listing and counting.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, kind: ContentKind, filter: &ContentQueryDto) {
    qb.push(" WHERE c.kind = ").push_bind(kind);
    if let Some(category) = filter.category {
        qb.push(" AND c.category_id = ").push_bind(category);
    }
    if let Some(published) = filter.published {
        qb.push(" AND c.is_published = ").push_bind(published);
    }
    if let Some(search) = filter.search.as_deref() {
        if !search.is_empty() {
            let pattern = format!("%{}%", search);
            qb.push(" AND (c.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.subtitle ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Whitelisted sort columns; anything else falls back to publish date.
fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("createdAt") => "created_at",
        Some("updatedAt") => "updated_at",
        Some("views") => "views",
        Some("likes") => "likes",
        Some("title") => "title",
        _ => "publish_date",
    }
}

impl ContentExt for DBClient {
    async fn list_content(
        &self,
        kind: ContentKind,
        filter: &ContentQueryDto,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ContentRecord>, sqlx::Error> {
        let ascending = filter.sort_order.as_deref() == Some("asc");

        let mut qb = QueryBuilder::new(format!("SELECT {} {}", RECORD_COLUMNS, RECORD_JOINS));
        push_filters(&mut qb, kind, filter);
        qb.push(" ORDER BY c.")
            .push(sort_column(filter.sort_by.as_deref()))
            .push(if ascending { " ASC" } else { " DESC" });
        qb.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1) * limit);

        qb.build_query_as::<ContentRecord>()
            .fetch_all(&self.pool)
            .await
    }

    async fn count_filtered(
        &self,
        kind: ContentKind,
        filter: &ContentQueryDto,
    ) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM content_items c");
        push_filters(&mut qb, kind, filter);

        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    async fn get_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {} {} WHERE c.kind = $1 AND c.id = $2",
            RECORD_COLUMNS, RECORD_JOINS
        );

        sqlx::query_as::<_, ContentRecord>(&query)
            .bind(kind)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_content_item(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentItem>, sqlx::Error> {
        sqlx::query_as::<_, ContentItem>(
            "SELECT * FROM content_items WHERE kind = $1 AND id = $2",
        )
        .bind(kind)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn save_content(
        &self,
        kind: ContentKind,
        author_id: Uuid,
        dto: &CreateContentDto,
        image: Option<MediaBlob>,
    ) -> Result<ContentItem, sqlx::Error> {
        let image = image.unwrap_or_default();

        sqlx::query_as::<_, ContentItem>(
            r#"
            INSERT INTO content_items
                (kind, category_id, title, subtitle, author_id, html_data,
                 publish_date, is_published, tags, read_time, refs,
                 seo_keywords, seo_description,
                 image_data, image_content_type, image_name, image_size,
                 image_uploaded_at, image_url)
            VALUES
                ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()), $8, $9, $10,
                 $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(kind)
        .bind(dto.category)
        .bind(&dto.title)
        .bind(&dto.subtitle)
        .bind(author_id)
        .bind(&dto.html_data)
        .bind(dto.publish_date)
        .bind(dto.is_published.unwrap_or(false))
        .bind(dto.tags.clone().unwrap_or_default())
        .bind(dto.read_time.unwrap_or(0))
        .bind(dto.refs.clone().unwrap_or_default())
        .bind(dto.seo_keywords.clone().unwrap_or_default())
        .bind(&dto.seo_description)
        .bind(image.data)
        .bind(image.content_type)
        .bind(image.original_name)
        .bind(image.size)
        .bind(image.uploaded_at)
        .bind(image.url)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_content(
        &self,
        kind: ContentKind,
        id: Uuid,
        dto: &UpdateContentDto,
        image: Option<Option<MediaBlob>>,
    ) -> Result<Option<ContentItem>, sqlx::Error> {
        let mut qb = QueryBuilder::new("UPDATE content_items SET updated_at = NOW()");

        if let Some(category) = dto.category {
            qb.push(", category_id = ").push_bind(category);
        }
        if let Some(title) = &dto.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(subtitle) = &dto.subtitle {
            qb.push(", subtitle = ").push_bind(subtitle.clone());
        }
        if let Some(html_data) = &dto.html_data {
            qb.push(", html_data = ").push_bind(html_data.clone());
        }
        if let Some(publish_date) = dto.publish_date {
            qb.push(", publish_date = ").push_bind(publish_date);
        }
        if let Some(is_published) = dto.is_published {
            qb.push(", is_published = ").push_bind(is_published);
        }
        if let Some(tags) = &dto.tags {
            qb.push(", tags = ").push_bind(tags.clone());
        }
        if let Some(read_time) = dto.read_time {
            qb.push(", read_time = ").push_bind(read_time);
        }
        if let Some(refs) = &dto.refs {
            qb.push(", refs = ").push_bind(refs.clone());
        }
        if let Some(seo_keywords) = &dto.seo_keywords {
            qb.push(", seo_keywords = ").push_bind(seo_keywords.clone());
        }
        if let Some(seo_description) = &dto.seo_description {
            qb.push(", seo_description = ").push_bind(seo_description.clone());
        }
        if let Some(image) = image {
            // Explicit null clears the whole embedded blob.
            let blob = image.unwrap_or_default();
            qb.push(", image_data = ").push_bind(blob.data);
            qb.push(", image_content_type = ").push_bind(blob.content_type);
            qb.push(", image_name = ").push_bind(blob.original_name);
            qb.push(", image_size = ").push_bind(blob.size);
            qb.push(", image_uploaded_at = ").push_bind(blob.uploaded_at);
            qb.push(", image_url = ").push_bind(blob.url);
        }

        qb.push(" WHERE kind = ")
            .push_bind(kind)
            .push(" AND id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<ContentItem>()
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentItem>, sqlx::Error> {
        sqlx::query_as::<_, ContentItem>(
            "DELETE FROM content_items WHERE kind = $1 AND id = $2 RETURNING *",
        )
        .bind(kind)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn increment_views(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE content_items SET views = views + 1 WHERE kind = $1 AND id = $2 RETURNING views",
        )
        .bind(kind)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_likes(
        &self,
        kind: ContentKind,
        id: Uuid,
        likes: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE content_items SET likes = GREATEST($3, 0) WHERE kind = $1 AND id = $2 RETURNING likes",
        )
        .bind(kind)
        .bind(id)
        .bind(likes)
        .fetch_optional(&self.pool)
        .await
    }

    async fn increment_shares(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE content_items SET shares = shares + 1 WHERE kind = $1 AND id = $2 RETURNING shares",
        )
        .bind(kind)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_content(&self, kind: ContentKind) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM content_items WHERE kind = $1")
            .bind(kind)
            .fetch_one(&self.pool)
            .await
    }

    async fn count_published(&self, kind: ContentKind) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM content_items WHERE kind = $1 AND is_published = TRUE",
        )
        .bind(kind)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_recent(&self, kind: ContentKind, days: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM content_items WHERE kind = $1 AND created_at >= NOW() - ($2 * INTERVAL '1 day')",
        )
        .bind(kind)
        .bind(days)
        .fetch_one(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::sort_column;

    #[test]
    fn sort_whitelist_falls_back_to_publish_date() {
        assert_eq!(sort_column(Some("views")), "views");
        assert_eq!(sort_column(Some("createdAt")), "created_at");
        assert_eq!(sort_column(Some("title")), "title");
        // Unknown fields must not reach the ORDER BY clause verbatim.
        assert_eq!(sort_column(Some("id; DROP TABLE users")), "publish_date");
        assert_eq!(sort_column(None), "publish_date");
    }
}
