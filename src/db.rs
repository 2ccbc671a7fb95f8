use sqlx::{Pool, Postgres};

mod category;
pub use category::CategoryExt;

mod comment;
pub use comment::CommentExt;

mod content;
pub use content::ContentExt;

mod user;
pub use user::UserExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
