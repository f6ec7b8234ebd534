//! Post moderation: the two-state validation flag and the permission
//! predicates every handler consults before touching user content.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Actor, Post};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationState {
    Pending,
    Validated,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Post is already validated")]
    AlreadyValidated,
}

impl ModerationState {
    /// Maps the stored `validated` column. Anything other than 1 is treated as pending.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 1 {
            ModerationState::Validated
        } else {
            ModerationState::Pending
        }
    }

    pub fn as_flag(self) -> i64 {
        match self {
            ModerationState::Pending => 0,
            ModerationState::Validated => 1,
        }
    }

    pub fn validate(self) -> Result<Self, TransitionError> {
        match self {
            ModerationState::Pending => Ok(ModerationState::Validated),
            ModerationState::Validated => Err(TransitionError::AlreadyValidated),
        }
    }

    /// Any content edit sends the post back to the queue.
    pub fn after_edit(self) -> Self {
        ModerationState::Pending
    }
}

/// What an actor wants to do with content it may or may not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentAction {
    Edit,
    Delete,
}

/// Ownership rule shared by posts, forums, comments and reviews:
/// only the author edits, the author or an admin deletes.
pub fn may_modify(owner_id: i64, actor: &Actor, action: ContentAction) -> bool {
    let is_owner = owner_id == actor.id;
    match action {
        ContentAction::Edit => is_owner,
        ContentAction::Delete => is_owner || actor.is_admin,
    }
}

pub fn can_validate(post: &Post, actor: &Actor) -> bool {
    actor.is_admin && post.state == ModerationState::Pending
}

pub fn is_visible(post: &Post, actor: Option<&Actor>) -> bool {
    if post.state == ModerationState::Validated {
        return true;
    }
    match actor {
        Some(actor) => actor.is_admin || actor.id == post.user_id,
        None => false,
    }
}

pub fn can_edit(post: &Post, actor: &Actor) -> bool {
    may_modify(post.user_id, actor, ContentAction::Edit)
}

pub fn can_delete(post: &Post, actor: &Actor) -> bool {
    may_modify(post.user_id, actor, ContentAction::Delete)
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReviewDenial {
    #[error("You cannot review your own post.")]
    OwnPost,
    #[error("Only validated posts can be reviewed.")]
    NotValidated,
    #[error("You have already reviewed this post.")]
    AlreadyReviewed,
}

/// Checks run in order: ownership, moderation state, then prior reviews.
pub fn review_eligibility(post: &Post, actor: &Actor, already_reviewed: bool) -> Result<(), ReviewDenial> {
    if post.user_id == actor.id {
        return Err(ReviewDenial::OwnPost);
    }
    if post.state != ModerationState::Validated {
        return Err(ReviewDenial::NotValidated);
    }
    if already_reviewed {
        return Err(ReviewDenial::AlreadyReviewed);
    }
    Ok(())
}

pub fn can_review(post: &Post, actor: &Actor, already_reviewed: bool) -> bool {
    review_eligibility(post, actor, already_reviewed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(owner: i64, state: ModerationState) -> Post {
        Post {
            id: 1,
            user_id: owner,
            title: "On Lattices".to_string(),
            body: "body".to_string(),
            image: None,
            tags: 0,
            state,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            updated_at: None,
        }
    }

    fn user(id: i64) -> Actor {
        Actor { id, is_admin: false }
    }

    fn admin(id: i64) -> Actor {
        Actor { id, is_admin: true }
    }

    #[test]
    fn flag_mapping() {
        assert_eq!(ModerationState::from_flag(0), ModerationState::Pending);
        assert_eq!(ModerationState::from_flag(1), ModerationState::Validated);
        assert_eq!(ModerationState::Validated.as_flag(), 1);
        assert_eq!(ModerationState::Pending.as_flag(), 0);
    }

    #[test]
    fn validate_then_edit_cycle() {
        let state = ModerationState::Pending;
        let state = state.validate().unwrap();
        assert_eq!(state, ModerationState::Validated);
        assert_eq!(state.validate(), Err(TransitionError::AlreadyValidated));
        let state = state.after_edit();
        assert_eq!(state, ModerationState::Pending);
        assert_eq!(state.validate().unwrap(), ModerationState::Validated);
    }

    #[test]
    fn only_admins_validate_pending_posts() {
        let pending = post(1, ModerationState::Pending);
        assert!(can_validate(&pending, &admin(9)));
        assert!(!can_validate(&pending, &user(1)));
        assert!(!can_validate(&post(1, ModerationState::Validated), &admin(9)));
    }

    #[test]
    fn pending_posts_are_hidden_from_strangers() {
        let pending = post(1, ModerationState::Pending);
        assert!(!is_visible(&pending, None));
        assert!(!is_visible(&pending, Some(&user(2))));
        assert!(is_visible(&pending, Some(&user(1))));
        assert!(is_visible(&pending, Some(&admin(3))));
        assert!(is_visible(&post(1, ModerationState::Validated), None));
    }

    #[test]
    fn edit_is_owner_only_but_admins_may_delete() {
        let p = post(1, ModerationState::Validated);
        assert!(can_edit(&p, &user(1)));
        assert!(!can_edit(&p, &admin(2)));
        assert!(can_delete(&p, &admin(2)));
        assert!(!can_delete(&p, &user(2)));
    }

    #[test]
    fn review_rules() {
        let validated = post(1, ModerationState::Validated);
        assert_eq!(review_eligibility(&validated, &user(1), false), Err(ReviewDenial::OwnPost));
        assert_eq!(
            review_eligibility(&post(1, ModerationState::Pending), &user(2), false),
            Err(ReviewDenial::NotValidated)
        );
        assert_eq!(review_eligibility(&validated, &user(2), true), Err(ReviewDenial::AlreadyReviewed));
        assert!(can_review(&validated, &user(2), false));
    }
}
