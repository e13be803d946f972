use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    auth::{dto::Credentials, password::hash_in_background},
    crud::Controller,
    error::AppError,
    state::AppState,
    store::{Repository, Resource},
    validate::{self, Required},
};

mod dto;
mod repo;

pub use dto::{CreateUserRequest, UpdateUserRequest};
pub use repo::{NewUser, PgUsers, User, UserFilter, UserPatch};

pub struct Users;

impl Resource for Users {
    const NAME: &'static str = "User";
    type Entity = User;
    type New = NewUser;
    type Patch = UserPatch;
    type Filter = UserFilter;
}

#[async_trait]
impl Controller for Users {
    const PATH: &'static str = "/users";
    const CONFLICT: &'static str = "Username or email already exists";

    type CreateBody = CreateUserRequest;
    type UpdateBody = UpdateUserRequest;

    fn repo(state: &AppState) -> &Arc<dyn Repository<Self>> {
        &state.repos.users
    }

    fn id_of(user: &User) -> Uuid {
        user.id
    }

    async fn prepare_create(body: CreateUserRequest) -> Result<NewUser, AppError> {
        let mut required = Required::default();
        let username = required.text("username", body.username);
        let password = required.secret("password", body.password);
        let name = required.text("name", body.name);
        let email = required.text("email", body.email);
        let phone_number = required.text("phoneNumber", body.phone_number);
        required.finish()?;
        validate::email(&email)?;

        Ok(NewUser {
            username,
            password_hash: hash_in_background(password).await?,
            name,
            email,
            phone_number,
            picture_url: validate::trimmed(body.picture_url),
        })
    }

    async fn prepare_update(body: UpdateUserRequest) -> Result<UserPatch, AppError> {
        let email = validate::non_blank("email", body.email)?;
        if let Some(email) = &email {
            validate::email(email)?;
        }
        let password_hash = match body.password.filter(|p| !p.is_empty()) {
            Some(p) => Some(hash_in_background(p).await?),
            None => None,
        };

        Ok(UserPatch {
            username: validate::non_blank("username", body.username)?,
            password_hash,
            name: validate::non_blank("name", body.name)?,
            email,
            phone_number: validate::non_blank("phoneNumber", body.phone_number)?,
            picture_url: validate::trimmed(body.picture_url),
        })
    }
}

impl From<User> for Credentials {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            password_hash: u.password_hash,
        }
    }
}
