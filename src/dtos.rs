use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Category, CommentRecord, ContentItem, ContentRecord, User};
use crate::utils::blob::{self, MediaBlobDto, MediaInput};
use crate::utils::text;

// DTOs define the structure of data exchanged with clients.
// They are separate from database models to control exactly what is exposed.

// ============================================================================
// Response envelope
// ============================================================================

/// Uniform response envelope. Error responses use the same shape with
/// `success: false` (see `error::ErrorResponse`).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationDto>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn paginated(message: impl Into<String>, data: T, pagination: PaginationDto) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
            pagination: Some(pagination),
        }
    }
}

impl ApiResponse<()> {
    /// Acknowledgment without a payload (logout, delete, ...).
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: None,
            pagination: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl PaginationDto {
    /// `total_pages` rounds up; a page past the end is reported as-is and the
    /// caller returns an empty list alongside it.
    pub fn new(page: i64, limit: i64, total_items: i64) -> Self {
        PaginationDto {
            current_page: page,
            total_pages: (total_items + limit - 1) / limit,
            total_items,
            items_per_page: limit,
        }
    }
}

/// Distinguishes an absent JSON field (`None`) from an explicit `null`
/// (`Some(None)`) on partial updates. Use with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// ============================================================================
// Authentication DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub phone: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct VerifyOtpDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Validate, Debug, Default, Clone, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,

    pub phone: Option<String>,

    #[serde(rename = "profilePicture", default, deserialize_with = "double_option")]
    pub profile_picture: Option<Option<MediaInput>>,
}

// ============================================================================
// User response DTOs
// ============================================================================

/// Client-safe user projection; never carries the password hash or OTP state.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FilterUserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<MediaBlobDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        let picture_url = format!("/api/users/{}/profile-picture", user.id);
        FilterUserDto {
            id: user.id,
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            phone: user.phone.to_owned(),
            role: user.role.to_str().to_string(),
            is_active: user.is_active,
            last_login: user.last_login,
            profile_picture: user
                .profile_picture()
                .as_ref()
                .map(|picture| blob::encode(picture, &picture_url)),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct LoginDataDto {
    pub token: String,
    pub user: FilterUserDto,
}

#[derive(Validate, Debug, Default, Deserialize)]
pub struct UserListQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,

    pub search: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

/// Admin dashboard statistics.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsDto {
    pub total_users: i64,
    pub active_users: i64,
    pub total_categories: i64,
    pub total_news: i64,
    pub published_news: i64,
    pub total_blogs: i64,
    pub published_blogs: i64,
    pub total_articles: i64,
    pub published_articles: i64,
    pub recent_activity: RecentActivityDto,
    pub published_percentage: PublishedPercentageDto,
}

/// Rows created within the last seven days, per series.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivityDto {
    pub new_users: i64,
    pub new_news: i64,
    pub new_blogs: i64,
    pub new_articles: i64,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPercentageDto {
    pub news: f64,
    pub blogs: f64,
    pub articles: f64,
}

impl PublishedPercentageDto {
    /// Percentage rounded to two decimal places; zero totals yield 0.
    pub fn ratio(published: i64, total: i64) -> f64 {
        if total == 0 {
            0.0
        } else {
            (published as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
        }
    }
}

// ============================================================================
// Content DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Deserialize)]
pub struct CreateContentDto {
    pub category: Uuid,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 500, message = "Subtitle must be at most 500 characters"))]
    pub subtitle: Option<String>,

    #[validate(length(min = 1, message = "Content is required"))]
    #[serde(rename = "htmlData")]
    pub html_data: String,

    #[serde(rename = "publishDate")]
    pub publish_date: Option<DateTime<Utc>>,

    #[serde(rename = "isPublished")]
    pub is_published: Option<bool>,

    pub tags: Option<Vec<String>>,

    #[serde(rename = "readTime")]
    pub read_time: Option<i64>,

    #[serde(rename = "references")]
    pub refs: Option<Vec<String>>,

    #[serde(rename = "seoKeywords")]
    pub seo_keywords: Option<Vec<String>>,

    #[serde(rename = "seoDescription")]
    pub seo_description: Option<String>,

    #[serde(rename = "featuredImage")]
    pub featured_image: Option<MediaInput>,
}

/// Partial update: absent fields stay untouched; the double-option fields
/// additionally accept an explicit `null` to clear the stored value.
#[derive(Validate, Debug, Default, Clone, Deserialize)]
pub struct UpdateContentDto {
    pub category: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub subtitle: Option<Option<String>>,

    #[validate(length(min = 1, message = "Content cannot be empty"))]
    #[serde(rename = "htmlData")]
    pub html_data: Option<String>,

    #[serde(rename = "publishDate")]
    pub publish_date: Option<DateTime<Utc>>,

    #[serde(rename = "isPublished")]
    pub is_published: Option<bool>,

    pub tags: Option<Vec<String>>,

    #[serde(rename = "readTime")]
    pub read_time: Option<i64>,

    #[serde(rename = "references")]
    pub refs: Option<Vec<String>>,

    #[serde(rename = "seoKeywords")]
    pub seo_keywords: Option<Vec<String>>,

    #[serde(rename = "seoDescription", default, deserialize_with = "double_option")]
    pub seo_description: Option<Option<String>>,

    #[serde(rename = "featuredImage", default, deserialize_with = "double_option")]
    pub featured_image: Option<Option<MediaInput>>,
}

#[derive(Validate, Debug, Default, Deserialize)]
pub struct ContentQueryDto {
    pub category: Option<Uuid>,

    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,

    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,

    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,

    pub search: Option<String>,
    pub published: Option<bool>,
}

#[derive(Validate, Debug, Default, Clone, Deserialize)]
pub struct AddCommentDto {
    #[validate(length(min = 1, message = "Comment text is required"))]
    pub text: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct AuthorDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct CategoryRefDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: Uuid,
    pub author: Uuid,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl CommentDto {
    pub fn from_record(record: &CommentRecord) -> Self {
        CommentDto {
            id: record.comment.id,
            author: record.comment.user_id,
            author_name: record.author_name.to_owned(),
            text: record.comment.content.to_owned(),
            created_at: record.comment.created_at,
        }
    }

    pub fn from_records(records: &[CommentRecord]) -> Vec<CommentDto> {
        records.iter().map(CommentDto::from_record).collect()
    }
}

/// Full detail projection, including the markup body and comments.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetailDto {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub html_data: String,
    pub author: AuthorDto,
    pub category: CategoryRefDto,
    pub publish_date: DateTime<Utc>,
    pub is_published: bool,
    pub views: i64,
    pub likes: i64,
    pub shares: i64,
    pub tags: Vec<String>,
    pub read_time: i64,
    #[serde(rename = "references")]
    pub refs: Vec<String>,
    pub seo_keywords: Vec<String>,
    pub seo_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<MediaBlobDto>,
    pub comments: Vec<CommentDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List projection: everything but the markup body and comments.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummaryDto {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: AuthorDto,
    pub category: CategoryRefDto,
    pub publish_date: DateTime<Utc>,
    pub is_published: bool,
    pub views: i64,
    pub likes: i64,
    pub shares: i64,
    pub tags: Vec<String>,
    pub read_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<MediaBlobDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact feed projection: the list fields minus tags and shares, with the
/// derived brief-content excerpt in place of the markup body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefContentDto {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub brief_content: String,
    pub author: AuthorDto,
    pub category: CategoryRefDto,
    pub publish_date: DateTime<Utc>,
    pub views: i64,
    pub likes: i64,
    pub read_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<MediaBlobDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn author_of(record: &ContentRecord) -> AuthorDto {
    AuthorDto {
        id: record.item.author_id,
        name: record.author_name.to_owned(),
        email: record.author_email.to_owned(),
    }
}

fn category_of(record: &ContentRecord) -> CategoryRefDto {
    CategoryRefDto {
        id: record.item.category_id,
        name: record.category_name.to_owned(),
        slug: record.category_slug.to_owned(),
    }
}

fn featured_image_of(item: &ContentItem) -> Option<MediaBlobDto> {
    let url = format!("/api/{}/{}/featured-image", item.kind.path(), item.id);
    item.featured_image()
        .as_ref()
        .map(|image| blob::encode(image, &url))
}

impl ContentDetailDto {
    pub fn from_record(record: &ContentRecord, comments: Vec<CommentDto>) -> Self {
        let item = &record.item;
        ContentDetailDto {
            id: item.id,
            title: item.title.to_owned(),
            subtitle: item.subtitle.to_owned(),
            html_data: item.html_data.to_owned(),
            author: author_of(record),
            category: category_of(record),
            publish_date: item.publish_date,
            is_published: item.is_published,
            views: item.views,
            likes: item.likes,
            shares: item.shares,
            tags: item.tags.to_owned(),
            read_time: item.read_time,
            refs: item.refs.to_owned(),
            seo_keywords: item.seo_keywords.to_owned(),
            seo_description: item.seo_description.to_owned(),
            featured_image: featured_image_of(item),
            comments,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

impl ContentSummaryDto {
    pub fn from_record(record: &ContentRecord) -> Self {
        let item = &record.item;
        ContentSummaryDto {
            id: item.id,
            title: item.title.to_owned(),
            subtitle: item.subtitle.to_owned(),
            author: author_of(record),
            category: category_of(record),
            publish_date: item.publish_date,
            is_published: item.is_published,
            views: item.views,
            likes: item.likes,
            shares: item.shares,
            tags: item.tags.to_owned(),
            read_time: item.read_time,
            featured_image: featured_image_of(item),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }

    pub fn from_records(records: &[ContentRecord]) -> Vec<ContentSummaryDto> {
        records.iter().map(ContentSummaryDto::from_record).collect()
    }
}

impl BriefContentDto {
    pub fn from_record(record: &ContentRecord) -> Self {
        let item = &record.item;
        BriefContentDto {
            id: item.id,
            title: item.title.to_owned(),
            subtitle: item.subtitle.to_owned(),
            brief_content: text::brief_content(&item.html_data),
            author: author_of(record),
            category: category_of(record),
            publish_date: item.publish_date,
            views: item.views,
            likes: item.likes,
            read_time: item.read_time,
            featured_image: featured_image_of(item),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }

    pub fn from_records(records: &[ContentRecord]) -> Vec<BriefContentDto> {
        records.iter().map(BriefContentDto::from_record).collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStateDto {
    pub likes: i64,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct CountDto {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct SharesDto {
    pub shares: i64,
}

// ============================================================================
// Category DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Deserialize)]
pub struct CreateCategoryDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    pub slug: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,

    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

#[derive(Validate, Debug, Default, Clone, Deserialize)]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub slug: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub color: Option<String>,
    pub icon: Option<String>,

    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

#[derive(Validate, Debug, Default, Deserialize)]
pub struct CategoryQueryDto {
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,

    pub search: Option<String>,

    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
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

impl CategoryDto {
    pub fn from_model(category: &Category) -> Self {
        CategoryDto {
            id: category.id,
            name: category.name.to_owned(),
            slug: category.slug.to_owned(),
            description: category.description.to_owned(),
            color: category.color.to_owned(),
            icon: category.icon.to_owned(),
            is_active: category.is_active,
            created_by: category.created_by,
            item_count: category.item_count,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }

    pub fn from_models(categories: &[Category]) -> Vec<CategoryDto> {
        categories.iter().map(CategoryDto::from_model).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentKind;

    fn sample_record() -> ContentRecord {
        ContentRecord {
            item: ContentItem {
                id: Uuid::new_v4(),
                kind: ContentKind::Blog,
                category_id: Uuid::new_v4(),
                title: "On wires".to_string(),
                subtitle: None,
                author_id: Uuid::new_v4(),
                html_data: "<p>Copper has opinions.</p>".to_string(),
                publish_date: Utc::now(),
                is_published: true,
                views: 3,
                likes: 1,
                shares: 0,
                tags: vec![],
                read_time: 4,
                refs: vec![],
                seo_keywords: vec![],
                seo_description: None,
                image_data: Some(vec![1, 2, 3]),
                image_content_type: Some("image/png".to_string()),
                image_name: Some("cover.png".to_string()),
                image_size: Some(3),
                image_uploaded_at: None,
                image_url: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            category_name: "tech".to_string(),
            category_slug: "tech".to_string(),
        }
    }

    #[test]
    fn brief_projection_carries_author_image_and_read_time() {
        let record = sample_record();
        let brief = serde_json::to_value(BriefContentDto::from_record(&record)).unwrap();

        assert_eq!(brief["author"]["name"], "Ada");
        assert_eq!(brief["readTime"], 4);
        assert!(brief.get("featuredImage").is_some());
        assert_eq!(brief["briefContent"], "Copper has opinions.");
        // The markup body itself stays out of the compact feed.
        assert!(brief.get("htmlData").is_none());
    }

    #[test]
    fn statistics_report_recent_activity_per_series() {
        let stats = StatisticsDto {
            recent_activity: RecentActivityDto {
                new_users: 2,
                new_news: 1,
                new_blogs: 0,
                new_articles: 3,
            },
            ..Default::default()
        };
        let v = serde_json::to_value(stats).unwrap();

        assert_eq!(v["recentActivity"]["newUsers"], 2);
        assert_eq!(v["recentActivity"]["newNews"], 1);
        assert_eq!(v["recentActivity"]["newArticles"], 3);
    }

    #[test]
    fn pagination_rounds_total_pages_up() {
        let p = PaginationDto::new(1, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.total_items, 25);
        assert_eq!(p.items_per_page, 10);

        assert_eq!(PaginationDto::new(1, 10, 30).total_pages, 3);
        assert_eq!(PaginationDto::new(1, 10, 0).total_pages, 0);
        assert_eq!(PaginationDto::new(1, 20, 1).total_pages, 1);
    }

    #[test]
    fn double_option_distinguishes_absent_from_null() {
        let absent: UpdateContentDto = serde_json::from_str(r#"{}"#).unwrap();
        assert!(absent.subtitle.is_none());

        let null: UpdateContentDto = serde_json::from_str(r#"{"subtitle":null}"#).unwrap();
        assert_eq!(null.subtitle, Some(None));

        let value: UpdateContentDto =
            serde_json::from_str(r#"{"subtitle":"Down the wire"}"#).unwrap();
        assert_eq!(value.subtitle, Some(Some("Down the wire".to_string())));
    }

    #[test]
    fn published_percentage_handles_zero_total() {
        assert_eq!(PublishedPercentageDto::ratio(0, 0), 0.0);
        assert_eq!(PublishedPercentageDto::ratio(1, 3), 33.33);
        assert_eq!(PublishedPercentageDto::ratio(2, 2), 100.0);
    }

    #[test]
    fn envelope_skips_empty_sections() {
        let ack = serde_json::to_value(ApiResponse::message("Logged out successfully")).unwrap();
        assert_eq!(ack["success"], true);
        assert!(ack.get("data").is_none());
        assert!(ack.get("pagination").is_none());

        let with_data = serde_json::to_value(ApiResponse::ok("ok", vec![1, 2, 3])).unwrap();
        assert_eq!(with_data["data"], serde_json::json!([1, 2, 3]));
    }
}
