use std::any::Any;
use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::error::GENERIC_SERVER_ERROR;
use crate::state::AppState;
use crate::{auth, bookings, crud, hosts::Hosts, properties::Properties, reviews::Reviews, users::Users};

pub fn build_app(state: AppState) -> Router {
    let app = Router::new()
        .route(
            "/",
            get(|| async { "StayLink booking API is running" }).fallback(route_not_found),
        )
        .route("/health", get(|| async { "ok" }).fallback(route_not_found))
        .merge(auth::router())
        .merge(crud::routes::<Users>(&state))
        .merge(crud::routes::<Hosts>(&state))
        .merge(crud::routes::<Properties>(&state))
        .merge(crud::routes::<Reviews>(&state))
        .merge(bookings::routes(&state))
        .fallback(route_not_found)
        .with_state(state);

    with_ambient_layers(app)
}

pub async fn route_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Route not found" })))
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": GENERIC_SERVER_ERROR })),
    )
        .into_response()
}

fn with_ambient_layers(app: Router) -> Router {
    app.layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{tests::expired_token, Role};
    use axum::{
        body::Body,
        http::{header, Method, Request},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct TestApp {
        app: Router,
        state: AppState,
        token: String,
    }

    impl TestApp {
        fn new() -> Self {
            Self::with_state(AppState::fake())
        }

        fn with_state(state: AppState) -> Self {
            let token = state
                .keys
                .issue(Uuid::new_v4(), "tester", Role::User)
                .unwrap();
            Self {
                app: build_app(state.clone()),
                state,
                token,
            }
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            body: Option<Value>,
            token: Option<&str>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(t) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
            }
            let req = match body {
                Some(v) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(v.to_string()))
                    .unwrap(),
                None => req.body(Body::empty()).unwrap(),
            };
            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            (status, json)
        }

        async fn get(&self, uri: &str) -> (StatusCode, Value) {
            self.call(Method::GET, uri, None, None).await
        }

        async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
            self.call(Method::POST, uri, Some(body), Some(&self.token)).await
        }

        async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
            self.call(Method::PUT, uri, Some(body), Some(&self.token)).await
        }

        async fn delete(&self, uri: &str) -> (StatusCode, Value) {
            self.call(Method::DELETE, uri, None, Some(&self.token)).await
        }

        async fn host(&self, username: &str) -> Value {
            let (status, body) = self
                .post(
                    "/hosts",
                    json!({
                        "username": username,
                        "password": "secret1",
                        "name": "Ada Host",
                        "email": format!("{username}@example.com"),
                        "phoneNumber": "555-0100",
                        "aboutMe": "I host"
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body
        }

        async fn user(&self, username: &str) -> Value {
            let (status, body) = self
                .post(
                    "/users",
                    json!({
                        "username": username,
                        "password": "secret1",
                        "name": "Jo Guest",
                        "email": format!("{username}@example.com"),
                        "phoneNumber": "555-0101"
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body
        }

        async fn property(&self, host_id: &Value, location: &str) -> Value {
            let (status, body) = self
                .post(
                    "/properties",
                    json!({
                        "hostId": host_id,
                        "title": "Seaside flat",
                        "description": "Close to the beach",
                        "location": location,
                        "pricePerNight": 120.5,
                        "bedroomCount": 2,
                        "bathRoomCount": 1,
                        "maxGuestCount": 4
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body
        }
    }

    #[tokio::test]
    async fn liveness_routes_answer() {
        let t = TestApp::new();
        let (status, body) = t.get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_str().unwrap().contains("running"));
        let (status, body) = t.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let t = TestApp::new();
        let (status, body) = t.get("/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found");
    }

    #[tokio::test]
    async fn unrouted_method_on_known_path_is_json_404() {
        let t = TestApp::new();
        let id = Uuid::new_v4();
        let cases = [
            (Method::PATCH, format!("/users/{id}")),
            (Method::DELETE, "/properties".to_string()),
            (Method::PUT, "/users".to_string()),
            (Method::POST, "/health".to_string()),
            (Method::GET, "/login".to_string()),
        ];
        for (method, uri) in cases {
            for token in [Some(t.token.as_str()), None] {
                let (status, body) = t
                    .call(method.clone(), &uri, Some(json!({})), token)
                    .await;
                assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
                assert_eq!(body["error"], "Route not found", "{method} {uri}");
            }
        }
    }

    #[tokio::test]
    async fn mutation_without_token_is_401() {
        let t = TestApp::new();
        let (status, body) = t
            .call(Method::POST, "/properties", Some(json!({})), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Token missing");

        let (status, _) = t.get("/properties").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_or_expired_token_is_403() {
        let t = TestApp::new();
        let expired = expired_token(&t.state.keys);
        for token in ["not-a-jwt", expired.as_str()] {
            let (status, body) = t
                .call(Method::DELETE, "/users/anything", None, Some(token))
                .await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["error"], "Invalid token");
        }

        let mut tampered = t.token.clone();
        tampered.push('x');
        let (status, _) = t
            .call(Method::DELETE, "/users/anything", None, Some(&tampered))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn host_create_hides_password_and_sets_location() {
        let t = TestApp::new();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/hosts")
            .header(header::AUTHORIZATION, format!("Bearer {}", t.token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "username": "ada",
                    "password": "secret1",
                    "name": "Ada",
                    "email": "ada@example.com",
                    "phoneNumber": "555"
                })
                .to_string(),
            ))
            .unwrap();
        let res = t.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let location = res.headers()[header::LOCATION].to_str().unwrap().to_string();
        let body: Value =
            serde_json::from_slice(&res.into_body().collect().await.unwrap().to_bytes()).unwrap();
        assert_eq!(location, format!("/hosts/{}", body["id"].as_str().unwrap()));
        assert!(body.get("password").is_none());
        assert!(body.get("passwordHash").is_none());
        assert_eq!(body["username"], "ada");

        let (status, fetched) = t.get(&location).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let t = TestApp::new();
        t.user("jdoe").await;
        let (status, body) = t
            .post(
                "/users",
                json!({
                    "username": "jdoe",
                    "password": "pw",
                    "name": "Other",
                    "email": "other@example.com",
                    "phoneNumber": "1"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Username or email already exists");
    }

    #[tokio::test]
    async fn concurrent_duplicates_admit_exactly_one() {
        let t = TestApp::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let app = t.app.clone();
            let token = t.token.clone();
            handles.push(tokio::spawn(async move {
                let req = Request::builder()
                    .method(Method::POST)
                    .uri("/users")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "username": "racer",
                            "password": "pw",
                            "name": "Racer",
                            "email": format!("racer{i}@example.com"),
                            "phoneNumber": "1"
                        })
                        .to_string(),
                    ))
                    .unwrap();
                app.oneshot(req).await.unwrap().status()
            }));
        }
        let mut created = 0;
        for h in handles {
            match h.await.unwrap() {
                StatusCode::CREATED => created += 1,
                StatusCode::BAD_REQUEST => {}
                other => panic!("unexpected status {other}"),
            }
        }
        assert_eq!(created, 1);

        let (_, list) = t.get("/users?username=racer").await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_are_listed() {
        let t = TestApp::new();
        let (status, body) = t
            .post("/users", json!({ "username": "x", "password": "pw" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Missing required fields: name, email, phoneNumber"
        );
    }

    #[tokio::test]
    async fn missing_rows_are_404() {
        let t = TestApp::new();
        let (status, body) = t.delete("/properties/does-not-exist").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Property not found");

        let (status, body) = t.get(&format!("/reviews/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Review not found");

        let (status, _) = t
            .put(&format!("/hosts/{}", Uuid::new_v4()), json!({ "name": "x" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_is_partial_and_rejects_unknown_fields() {
        let t = TestApp::new();
        let host = t.host("ada").await;
        let property = t.property(&host["id"], "Lisbon").await;
        let uri = format!("/properties/{}", property["id"].as_str().unwrap());

        let (status, body) = t.put(&uri, json!({ "pricePerNight": 99.0 })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["pricePerNight"], 99.0);
        assert_eq!(body["title"], "Seaside flat");
        assert_eq!(body["location"], "Lisbon");

        let (status, _) = t.put(&uri, json!({ "owner": "me" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn property_needs_an_existing_host() {
        let t = TestApp::new();
        let (status, body) = t
            .post(
                "/properties",
                json!({
                    "hostId": Uuid::new_v4(),
                    "title": "Ghost house",
                    "description": "Empty",
                    "location": "Nowhere",
                    "pricePerNight": 10.0,
                    "bedroomCount": 1,
                    "bathRoomCount": 1,
                    "maxGuestCount": 1
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    #[tokio::test]
    async fn login_issues_a_working_token() {
        let t = TestApp::new();
        let user = t.user("jdoe").await;

        let (status, body) = t
            .call(
                Method::POST,
                "/login",
                Some(json!({ "username": "jdoe", "password": "secret1" })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["identity"]["id"], user["id"]);
        assert_eq!(body["identity"]["role"], "user");
        let token = body["token"].as_str().unwrap().to_string();

        let uri = format!("/users/{}", user["id"].as_str().unwrap());
        let (status, body) = t
            .call(Method::PUT, &uri, Some(json!({ "name": "Jo Renamed" })), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Jo Renamed");

        let (status, body) = t
            .call(
                Method::POST,
                "/login",
                Some(json!({ "username": "jdoe", "password": "wrong" })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, body) = t
            .call(
                Method::POST,
                "/login",
                Some(json!({ "username": "nobody", "password": "secret1" })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        // Users cannot log in as hosts.
        let (status, _) = t
            .call(
                Method::POST,
                "/login",
                Some(json!({ "username": "jdoe", "password": "secret1", "role": "host" })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bookings_flow_and_date_order() {
        let t = TestApp::new();
        let user = t.user("guest").await;
        let host = t.host("owner").await;
        let property = t.property(&host["id"], "Porto").await;

        let (status, body) = t
            .post(
                "/bookings",
                json!({
                    "userId": user["id"],
                    "propertyId": property["id"],
                    "checkinDate": "2024-03-04T10:00:00Z",
                    "checkoutDate": "2024-03-01T15:00:00Z",
                    "numberOfGuests": 2,
                    "totalPrice": 300.0
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "checkoutDate must be after checkinDate");

        let (status, booking) = t
            .post(
                "/bookings",
                json!({
                    "userId": user["id"],
                    "propertyId": property["id"],
                    "checkinDate": "2024-03-01T15:00:00Z",
                    "checkoutDate": "2024-03-04T10:00:00Z",
                    "numberOfGuests": 2,
                    "totalPrice": 300.0
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{booking}");
        assert_eq!(booking["bookingStatus"], "pending");

        // Moving checkout before the stored checkin trips the table constraint.
        let uri = format!("/bookings/{}", booking["id"].as_str().unwrap());
        let (status, _) = t
            .put(&uri, json!({ "checkoutDate": "2024-02-01T00:00:00Z" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, list) = t
            .get(&format!("/bookings/user/{}", user["id"].as_str().unwrap()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (_, none) = t.get("/bookings/user/not-a-uuid").await;
        assert_eq!(none, json!([]));

        // Deleting the property takes its bookings with it.
        let (status, body) = t
            .delete(&format!("/properties/{}", property["id"].as_str().unwrap()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Property deleted");
        let (status, _) = t.get(&uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_filters_by_query() {
        let t = TestApp::new();
        let host = t.host("owner").await;
        t.property(&host["id"], "Lisbon").await;
        t.property(&host["id"], "Porto").await;

        let (status, list) = t.get("/properties?location=Porto").await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["location"], "Porto");

        let (status, _) = t.get("/properties?pricePerNight=cheap").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Empty values do not filter.
        let (status, all) = t.get("/properties?location=&hostId=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 2);
        let (_, hosts) = t.get("/hosts?username=").await;
        assert_eq!(hosts.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn auth_can_be_switched_off() {
        let t = TestApp::with_state(AppState::fake_with(false));
        let (status, body) = t
            .call(
                Method::POST,
                "/hosts",
                Some(json!({
                    "username": "open",
                    "password": "pw",
                    "name": "Open",
                    "email": "open@example.com",
                    "phoneNumber": "1"
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    #[tokio::test]
    async fn panics_become_generic_500() {
        async fn boom() -> &'static str {
            panic!("kaboom")
        }
        let app = with_ambient_layers(Router::new().route("/boom", get(boom)));
        let res = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value =
            serde_json::from_slice(&res.into_body().collect().await.unwrap().to_bytes()).unwrap();
        assert_eq!(body["error"], GENERIC_SERVER_ERROR);
    }
}
