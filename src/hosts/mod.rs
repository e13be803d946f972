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

pub use dto::{CreateHostRequest, UpdateHostRequest};
pub use repo::{Host, HostFilter, HostPatch, NewHost, PgHosts};

pub struct Hosts;

impl Resource for Hosts {
    const NAME: &'static str = "Host";
    type Entity = Host;
    type New = NewHost;
    type Patch = HostPatch;
    type Filter = HostFilter;
}

#[async_trait]
impl Controller for Hosts {
    const PATH: &'static str = "/hosts";
    const CONFLICT: &'static str = "Username or email already exists";

    type CreateBody = CreateHostRequest;
    type UpdateBody = UpdateHostRequest;

    fn repo(state: &AppState) -> &Arc<dyn Repository<Self>> {
        &state.repos.hosts
    }

    fn id_of(host: &Host) -> Uuid {
        host.id
    }

    async fn prepare_create(body: CreateHostRequest) -> Result<NewHost, AppError> {
        let mut required = Required::default();
        let username = required.text("username", body.username);
        let password = required.secret("password", body.password);
        let name = required.text("name", body.name);
        let email = required.text("email", body.email);
        let phone_number = required.text("phoneNumber", body.phone_number);
        required.finish()?;
        validate::email(&email)?;

        Ok(NewHost {
            username,
            password_hash: hash_in_background(password).await?,
            name,
            email,
            phone_number,
            picture_url: validate::trimmed(body.picture_url),
            about_me: validate::trimmed(body.about_me),
        })
    }

    async fn prepare_update(body: UpdateHostRequest) -> Result<HostPatch, AppError> {
        let email = validate::non_blank("email", body.email)?;
        if let Some(email) = &email {
            validate::email(email)?;
        }
        let password_hash = match body.password.filter(|p| !p.is_empty()) {
            Some(p) => Some(hash_in_background(p).await?),
            None => None,
        };

        Ok(HostPatch {
            username: validate::non_blank("username", body.username)?,
            password_hash,
            name: validate::non_blank("name", body.name)?,
            email,
            phone_number: validate::non_blank("phoneNumber", body.phone_number)?,
            picture_url: validate::trimmed(body.picture_url),
            about_me: validate::trimmed(body.about_me),
        })
    }
}

impl From<Host> for Credentials {
    fn from(h: Host) -> Self {
        Self {
            id: h.id,
            username: h.username,
            password_hash: h.password_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_rehashes_a_new_password() {
        let patch = Hosts::prepare_update(UpdateHostRequest {
            password: Some("new-pw".into()),
            ..Default::default()
        })
        .await
        .unwrap();
        let hash = patch.password_hash.expect("password should be hashed");
        assert_ne!(hash, "new-pw");
        assert!(patch.name.is_none());
    }

    #[tokio::test]
    async fn update_rejects_blank_username_and_bad_email() {
        let blank = Hosts::prepare_update(UpdateHostRequest {
            username: Some("   ".into()),
            ..Default::default()
        })
        .await;
        assert!(matches!(blank, Err(AppError::InvalidInput(_))));

        let bad = Hosts::prepare_update(UpdateHostRequest {
            email: Some("nope".into()),
            ..Default::default()
        })
        .await;
        assert!(matches!(bad, Err(AppError::InvalidInput(ref m)) if m == "Invalid email"));
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut host = NewHost {
            username: "jdoe".into(),
            password_hash: "hash".into(),
            name: "Jane".into(),
            email: "jdoe@x.com".into(),
            phone_number: "555-0100".into(),
            picture_url: Some("p.png".into()),
            about_me: None,
        }
        .into_host(Uuid::new_v4());

        host.apply(HostPatch {
            name: Some("X".into()),
            ..Default::default()
        });
        assert_eq!(host.name, "X");
        assert_eq!(host.username, "jdoe");
        assert_eq!(host.password_hash, "hash");
        assert_eq!(host.picture_url.as_deref(), Some("p.png"));
    }

    #[test]
    fn filter_matches_on_every_present_field() {
        let host = NewHost {
            username: "jdoe".into(),
            password_hash: "hash".into(),
            name: "Jane".into(),
            email: "jdoe@x.com".into(),
            phone_number: "555-0100".into(),
            picture_url: None,
            about_me: None,
        }
        .into_host(Uuid::new_v4());

        assert!(HostFilter::default().matches(&host));
        let by_name = HostFilter {
            name: Some("Jane".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&host));
        let mismatch = HostFilter {
            name: Some("Jane".into()),
            email: Some("other@x.com".into()),
            ..Default::default()
        };
        assert!(!mismatch.matches(&host));
    }
}
