use serde::{Deserialize, Serialize};

use crate::domain::moderation::ModerationState;

/// The authenticated principal of a request, resolved once from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub created_at: String,
    pub last_login_time: Option<String>,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor { id: self.id, is_admin: self.is_admin }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendedTag {
    pub id: i64,
    pub user_id: i64,
    pub suggested_by: String,
    pub name: String,
    pub created_at: String,
}

/// A row of the `posts` table, tags still packed into their mask.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub tags: i64,
    pub state: ModerationState,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// A post as handed to the client: author resolved, tags decoded, ratings aggregated.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub user_id: i64,
    pub author: String,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub tags: Vec<Tag>,
    pub tag_mask: i64,
    pub status: ModerationState,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub review_count: i64,
    pub average_rating: Option<f64>,
}

/// Post row joined with its author name and review aggregate.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub post: Post,
    pub author: String,
    pub review_count: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub author: String,
    pub post_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct PostReviews {
    pub post_id: i64,
    pub average_rating: Option<f64>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Serialize)]
pub struct Forum {
    pub id: i64,
    pub user_id: i64,
    pub author: String,
    pub title: String,
    pub body: String,
    pub created_at: String,
    pub comment_count: i64,
}

#[derive(Debug, Serialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub author: String,
    pub forum_id: i64,
    pub body: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

pub mod db_operations;
