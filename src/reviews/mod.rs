use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    crud::Controller,
    error::AppError,
    state::AppState,
    store::{Repository, Resource},
    validate::{self, Required},
};

mod repo;

pub use repo::{NewReview, PgReviews, Review, ReviewFilter, ReviewPatch};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub user_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

pub struct Reviews;

impl Resource for Reviews {
    const NAME: &'static str = "Review";
    type Entity = Review;
    type New = NewReview;
    type Patch = ReviewPatch;
    type Filter = ReviewFilter;
}

fn rating(value: i32) -> Result<i32, AppError> {
    if (1..=5).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::InvalidInput("rating must be between 1 and 5".into()))
    }
}

#[async_trait]
impl Controller for Reviews {
    const PATH: &'static str = "/reviews";

    type CreateBody = CreateReviewRequest;
    type UpdateBody = UpdateReviewRequest;

    fn repo(state: &AppState) -> &Arc<dyn Repository<Self>> {
        &state.repos.reviews
    }

    fn id_of(review: &Review) -> Uuid {
        review.id
    }

    async fn prepare_create(body: CreateReviewRequest) -> Result<NewReview, AppError> {
        let mut required = Required::default();
        let user_id = required.value("userId", body.user_id);
        let property_id = required.value("propertyId", body.property_id);
        let score = required.value("rating", body.rating);
        let comment = required.text("comment", body.comment);
        required.finish()?;

        Ok(NewReview {
            user_id,
            property_id,
            rating: rating(score)?,
            comment,
        })
    }

    async fn prepare_update(body: UpdateReviewRequest) -> Result<ReviewPatch, AppError> {
        Ok(ReviewPatch {
            rating: body.rating.map(rating).transpose()?,
            comment: validate::non_blank("comment", body.comment)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn rating_is_bounded() {
        for bad in [0, 6, -3] {
            let res = Reviews::prepare_update(UpdateReviewRequest {
                rating: Some(bad),
                comment: None,
            })
            .await;
            assert!(res.is_err(), "rating {bad} should be rejected");
        }
        let ok = Reviews::prepare_update(UpdateReviewRequest {
            rating: Some(5),
            comment: Some(" Lovely ".into()),
        })
        .await
        .unwrap();
        assert_eq!(ok.rating, Some(5));
        assert_eq!(ok.comment.as_deref(), Some("Lovely"));
    }

    #[test]
    fn update_cannot_move_a_review() {
        let parsed = serde_json::from_value::<UpdateReviewRequest>(json!({
            "propertyId": Uuid::new_v4()
        }));
        assert!(parsed.is_err());
    }
}
