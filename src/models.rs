use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::blob::MediaBlob;

/// User role for role-based access control.
///
/// Stored as the PostgreSQL ENUM type `user_role`; variants map to their
/// lowercase form in the database.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

/// The three publishable content kinds.
///
/// News, blogs and articles share one schema and one behavioral contract;
/// the kind only selects which collection a request addresses. Stored as the
/// PostgreSQL ENUM type `content_kind`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "content_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    News,
    Blog,
    Article,
}

impl ContentKind {
    pub fn to_str(&self) -> &str {
        match self {
            ContentKind::News => "news",
            ContentKind::Blog => "blog",
            ContentKind::Article => "article",
        }
    }

    /// Singular display name used in response messages ("Blog post created
    /// successfully", "Article not found", ...).
    pub fn display(&self) -> &str {
        match self {
            ContentKind::News => "News",
            ContentKind::Blog => "Blog post",
            ContentKind::Article => "Article",
        }
    }

    /// Plural URL segment the kind is mounted under ("/api/news", ...).
    pub fn path(&self) -> &str {
        match self {
            ContentKind::News => "news",
            ContentKind::Blog => "blogs",
            ContentKind::Article => "articles",
        }
    }
}

/// User row. `password` holds the argon2 hash and is stripped before any
/// response leaves the service (see `FilterUserDto`).
///
/// `otp_code`/`otp_expires_at` carry the one-time-code state for the
/// forgot-password flow; both are cleared once the code is consumed.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub picture_data: Option<Vec<u8>>,
    pub picture_content_type: Option<String>,
    pub picture_name: Option<String>,
    pub picture_size: Option<i64>,
    pub picture_uploaded_at: Option<DateTime<Utc>>,
    pub picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category row. `name` is stored lowercased and unique; `slug` is derived
/// from the name when the client does not supply one. `item_count` is a
/// denormalized aggregate recomputed after every content write in the
/// category - display-only, eventually consistent.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub is_active: bool,
    pub created_by: Uuid,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generic content item backing news, blogs and articles.
///
/// `author_id` is set once at creation from the authenticated caller and is
/// never touched by updates. `views`/`likes`/`shares` are server-maintained;
/// `likes` never goes below zero. The `image_*` columns embed the optional
/// featured-image media blob (`image_data` stays NULL for the external-URL
/// variant). Article-only extensions (`read_time`, `refs`, `seo_keywords`,
/// `seo_description`) default to empty on the other kinds.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ContentItem {
    pub id: Uuid,
    pub kind: ContentKind,
    pub category_id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub author_id: Uuid,
    pub html_data: String,
    pub publish_date: DateTime<Utc>,
    pub is_published: bool,
    pub views: i64,
    pub likes: i64,
    pub shares: i64,
    pub tags: Vec<String>,
    pub read_time: i64,
    pub refs: Vec<String>,
    pub seo_keywords: Vec<String>,
    pub seo_description: Option<String>,
    pub image_data: Option<Vec<u8>>,
    pub image_content_type: Option<String>,
    pub image_name: Option<String>,
    pub image_size: Option<i64>,
    pub image_uploaded_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Reassemble the featured-image blob from its flattened columns.
    /// `None` when the item carries neither embedded bytes nor an external URL.
    pub fn featured_image(&self) -> Option<MediaBlob> {
        if self.image_data.is_none() && self.image_url.is_none() {
            return None;
        }
        Some(MediaBlob {
            data: self.image_data.clone(),
            content_type: self.image_content_type.clone(),
            original_name: self.image_name.clone(),
            size: self.image_size,
            uploaded_at: self.image_uploaded_at,
            url: self.image_url.clone(),
        })
    }
}

impl User {
    pub fn profile_picture(&self) -> Option<MediaBlob> {
        if self.picture_data.is_none() && self.picture_url.is_none() {
            return None;
        }
        Some(MediaBlob {
            data: self.picture_data.clone(),
            content_type: self.picture_content_type.clone(),
            original_name: self.picture_name.clone(),
            size: self.picture_size,
            uploaded_at: self.picture_uploaded_at,
            url: self.picture_url.clone(),
        })
    }
}

/// Comment on a content item. Append-only: no edit or delete surface exists.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Comment {
    pub id: Uuid,
    pub content_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Content item joined with its author and category display fields.
/// Read model for list/detail queries.
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct ContentRecord {
    #[sqlx(flatten)]
    pub item: ContentItem,
    pub author_name: String,
    pub author_email: String,
    pub category_name: String,
    pub category_slug: String,
}

/// Comment joined with its author display name.
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct CommentRecord {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_name: String,
}
