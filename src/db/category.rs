use sqlx::QueryBuilder;
use uuid::Uuid;

use super::DBClient;
use crate::models::{Category, ContentRecord};

/// Category database operations trait.
pub trait CategoryExt {
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error>;

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error>;

    /// Filtered listing, always sorted by name ascending.
    async fn list_categories(
        &self,
        is_active: Option<bool>,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Category>, sqlx::Error>;

    async fn count_filtered_categories(
        &self,
        is_active: Option<bool>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error>;

    /// Existing category with the same name or slug, excluding `exclude_id`
    /// when checking against a category being updated.
    async fn find_category_conflict(
        &self,
        name: &str,
        slug: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<Option<Category>, sqlx::Error>;

    async fn save_category(
        &self,
        created_by: Uuid,
        name: &str,
        slug: &str,
        description: Option<&str>,
        color: Option<&str>,
        icon: Option<&str>,
        is_active: bool,
    ) -> Result<Category, sqlx::Error>;

    /// Partial update; absent fields keep their stored values.
    async fn update_category(
        &self,
        id: Uuid,
        name: Option<String>,
        slug: Option<String>,
        description: Option<Option<String>>,
        color: Option<String>,
        icon: Option<String>,
        is_active: Option<bool>,
    ) -> Result<Option<Category>, sqlx::Error>;

    async fn delete_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error>;

    /// Live count of content items referencing the category, any kind.
    async fn count_items_in(&self, category_id: Uuid) -> Result<i64, sqlx::Error>;

    /// Recompute the denormalized `item_count` from the live count.
    async fn refresh_item_count(&self, category_id: Uuid) -> Result<(), sqlx::Error>;

    /// Paginated content of any kind within one category, newest first.
    async fn items_in_category(
        &self,
        category_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ContentRecord>, sqlx::Error>;

    async fn count_categories(&self) -> Result<i64, sqlx::Error>;
}

impl CategoryExt for DBClient {
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_categories(
        &self,
        is_active: Option<bool>,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let mut qb = QueryBuilder::new("SELECT * FROM categories WHERE TRUE");
        if let Some(is_active) = is_active {
            qb.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(search) = search {
            if !search.is_empty() {
                let pattern = format!("%{}%", search);
                qb.push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR description ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }
        qb.push(" ORDER BY name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1) * limit);

        qb.build_query_as::<Category>().fetch_all(&self.pool).await
    }

    async fn count_filtered_categories(
        &self,
        is_active: Option<bool>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM categories WHERE TRUE");
        if let Some(is_active) = is_active {
            qb.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(search) = search {
            if !search.is_empty() {
                let pattern = format!("%{}%", search);
                qb.push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR description ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    async fn find_category_conflict(
        &self,
        name: &str,
        slug: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE (name = $1 OR slug = $2)
              AND ($3::uuid IS NULL OR id <> $3)
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn save_category(
        &self,
        created_by: Uuid,
        name: &str,
        slug: &str,
        description: Option<&str>,
        color: Option<&str>,
        icon: Option<&str>,
        is_active: bool,
    ) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, slug, description, color, icon, is_active, created_by)
            VALUES ($1, $2, $3, COALESCE($4, '#3B82F6'), COALESCE($5, 'folder'), $6, $7)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(color)
        .bind(icon)
        .bind(is_active)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_category(
        &self,
        id: Uuid,
        name: Option<String>,
        slug: Option<String>,
        description: Option<Option<String>>,
        color: Option<String>,
        icon: Option<String>,
        is_active: Option<bool>,
    ) -> Result<Option<Category>, sqlx::Error> {
        let mut qb = QueryBuilder::new("UPDATE categories SET updated_at = NOW()");
        if let Some(name) = name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(slug) = slug {
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(description) = description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(color) = color {
            qb.push(", color = ").push_bind(color);
        }
        if let Some(icon) = icon {
            qb.push(", icon = ").push_bind(icon);
        }
        if let Some(is_active) = is_active {
            qb.push(", is_active = ").push_bind(is_active);
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        qb.build_query_as::<Category>()
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("DELETE FROM categories WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn count_items_in(&self, category_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM content_items WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn refresh_item_count(&self, category_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE categories
            SET item_count = (SELECT COUNT(*) FROM content_items WHERE category_id = $1),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(category_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn items_in_category(
        &self,
        category_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ContentRecord>, sqlx::Error> {
        sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT c.*, u.name AS author_name, u.email AS author_email,
                   cat.name AS category_name, cat.slug AS category_slug
            FROM content_items c
            INNER JOIN users u ON c.author_id = u.id
            INNER JOIN categories cat ON c.category_id = cat.id
            WHERE c.category_id = $1
            ORDER BY c.publish_date DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(category_id)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_categories(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await
    }
}
