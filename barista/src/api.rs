//! The catalog's HTTP routes
//!
//! | method | path | permission |
//! |---|---|---|
//! | GET | `/drinks` | none |
//! | GET | `/drinks-detail` | `get:drinks-detail` |
//! | POST | `/drinks` | `post:drinks` |
//! | PATCH | `/drinks/:id` | `patch:drinks` |
//! | DELETE | `/drinks/:id` | `delete:drinks` |
//!
//! Protected handlers take their permission guard as the first argument, so
//! a refused request is answered before its body is read.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, FromRef, Path, State},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use barista_auth::AuthMiddleware;
use barista_jose::jwt::CoreClaims;
use serde::Serialize;

use crate::{
    error::ApiError,
    model::{Drink, DrinkId, DrinkPatch, NewDrink},
    store::DrinkStore,
};

mod permission {
    barista_axum::permission_guards! {
        pub permission DrinksDetail = "get:drinks-detail";
        pub permission PostDrinks = "post:drinks";
        pub permission PatchDrinks = "patch:drinks";
        pub permission DeleteDrinks = "delete:drinks";
    }
}

/// Shared state of the catalog service
#[derive(Clone, Debug)]
pub struct AppState {
    auth: AuthMiddleware,
    drinks: Arc<dyn DrinkStore>,
}

impl AppState {
    /// Serves `drinks`, guarding changes with `auth`
    pub fn new(auth: AuthMiddleware, drinks: impl DrinkStore + 'static) -> Self {
        Self {
            auth,
            drinks: Arc::new(drinks),
        }
    }
}

impl FromRef<AppState> for AuthMiddleware {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Builds the catalog's router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/drinks", get(list_drinks).post(create_drink))
        .route("/drinks-detail", get(drink_details))
        .route("/drinks/:id", patch(update_drink).delete(delete_drink))
        .fallback(no_route)
        .with_state(state)
}

#[derive(Serialize)]
struct DrinksBody<T> {
    success: bool,
    drinks: Vec<T>,
}

#[derive(Serialize)]
struct DeleteBody {
    success: bool,
    delete: DrinkId,
}

fn drinks_response<T: Serialize>(drinks: impl IntoIterator<Item = T>) -> Response {
    Json(DrinksBody {
        success: true,
        drinks: drinks.into_iter().collect(),
    })
    .into_response()
}

fn drink_id(id: Result<Path<u64>, PathRejection>) -> Result<DrinkId, ApiError> {
    match id {
        Ok(Path(0)) => Err(ApiError::InvalidId),
        Ok(Path(id)) => Ok(DrinkId(id)),
        Err(_) => Err(ApiError::NoRoute),
    }
}

async fn list_drinks(State(state): State<AppState>) -> Response {
    let drinks = state.drinks.list().await;
    drinks_response(drinks.iter().map(Drink::short))
}

async fn drink_details(
    permission::DrinksDetail(claims): permission::DrinksDetail,
    State(state): State<AppState>,
) -> Response {
    tracing::debug!(subject = ?claims.sub(), "listing drink details");

    let drinks = state.drinks.list().await;
    drinks_response(drinks.iter().map(Drink::long))
}

async fn create_drink(
    _: permission::PostDrinks,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let new: NewDrink = serde_json::from_slice(&body).map_err(ApiError::MalformedBody)?;
    let (title, recipe) = new.validate()?;

    let drink = state.drinks.insert(title, recipe).await?;
    tracing::info!(id = %drink.id, title = %drink.title, "drink created");

    Ok(drinks_response([drink.long()]))
}

async fn update_drink(
    _: permission::PatchDrinks,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = drink_id(id)?;

    if body.is_empty() {
        return Err(ApiError::EmptyChanges);
    }
    let patch: DrinkPatch = serde_json::from_slice(&body).map_err(ApiError::MalformedBody)?;
    if patch.is_empty() {
        return Err(ApiError::EmptyChanges);
    }
    let changes = patch.validate()?;

    let drink = state.drinks.update(id, changes).await?;
    tracing::info!(%id, title = %drink.title, "drink updated");

    Ok(drinks_response([drink.long()]))
}

async fn delete_drink(
    _: permission::DeleteDrinks,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<DeleteBody>, ApiError> {
    let id = drink_id(id)?;

    state.drinks.delete(id).await?;
    tracing::info!(%id, "drink deleted");

    Ok(Json(DeleteBody {
        success: true,
        delete: id,
    }))
}

async fn no_route() -> ApiError {
    ApiError::NoRoute
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use barista_auth::{resolver::StaticKeyResolver, AuthConfig, Authority, Claims};
    use barista_clock::{TestClock, UnixTime};
    use barista_jose::{
        jwa,
        jwt::BasicHeaders,
        test_util::{self, TestKey},
        Jwks,
    };
    use color_eyre::Result;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use super::*;
    use crate::store::MemoryDrinkStore;

    const NOW: UnixTime = UnixTime(1_700_000_000);

    fn app() -> Result<Router> {
        let jwks: Jwks = serde_json::from_str(test_util::JWKS)?;
        let validator = AuthConfig::new("barista.eu.auth0.com", "coffee").validator();
        let authority =
            Authority::new(StaticKeyResolver::new(jwks), validator).with_clock(TestClock::new(NOW));

        Ok(router(AppState::new(
            AuthMiddleware::new(authority),
            MemoryDrinkStore::new(),
        )))
    }

    fn claims(permissions: &str) -> Result<Claims> {
        Ok(Claims::new()
            .with_audience("coffee")
            .with_issuer("https://barista.eu.auth0.com/")
            .with_subject("auth0|barista")
            .with_expiration(NOW.saturating_add(3600))
            .with_permissions(permissions.parse()?))
    }

    fn bearer(permissions: &str) -> Result<String> {
        let headers = BasicHeaders::with_key_id(jwa::Algorithm::RS256, test_util::PRIMARY_KEY_ID);
        let token = test_util::sign(&headers, &claims(permissions)?, TestKey::Primary);
        Ok(format!("Bearer {}", token.as_str()))
    }

    fn request(
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> Result<Request<Body>> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }

        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        Ok(builder.body(body)?)
    }

    async fn send(app: &Router, req: Request<Body>) -> Result<(StatusCode, Value)> {
        let resp = app.clone().oneshot(req).await?;
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    fn espresso() -> Value {
        json!({
            "title": "Espresso",
            "recipe": [{ "name": "coffee", "color": "black", "parts": 1 }],
        })
    }

    async fn create_espresso(app: &Router) -> Result<()> {
        let (status, _) = send(
            app,
            request(Method::POST, "/drinks", Some(&bearer("post:drinks")?), Some(espresso()))?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn missing_authorization_header_is_refused() -> Result<()> {
        let app = app()?;

        let (status, body) = send(&app, request(Method::GET, "/drinks-detail", None, None)?).await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({ "success": false, "error": 401, "message": "no_auth_in_header" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn basic_authorization_is_refused() -> Result<()> {
        let app = app()?;

        let (status, body) = send(
            &app,
            request(Method::GET, "/drinks-detail", Some("Basic abc123"), None)?,
        )
        .await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "no_bearer_tag");
        Ok(())
    }

    #[tokio::test]
    async fn permitted_token_reaches_handler() -> Result<()> {
        let app = app()?;

        let (status, body) = send(
            &app,
            request(
                Method::GET,
                "/drinks-detail",
                Some(&bearer("get:drinks-detail")?),
                None,
            )?,
        )
        .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "drinks": [] }));
        Ok(())
    }

    #[tokio::test]
    async fn token_without_required_permission_is_unauthorized() -> Result<()> {
        let app = app()?;

        let (status, body) = send(
            &app,
            request(
                Method::DELETE,
                "/drinks/1",
                Some(&bearer("get:drinks-detail")?),
                None,
            )?,
        )
        .await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({ "success": false, "error": 401, "message": "unauthorized" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn token_signed_by_unknown_key_is_invalid_header() -> Result<()> {
        let app = app()?;
        let headers = BasicHeaders::with_key_id(jwa::Algorithm::RS256, test_util::ROGUE_KEY_ID);
        let token = test_util::sign(&headers, &claims("get:drinks-detail")?, TestKey::Rogue);

        let (status, body) = send(
            &app,
            request(
                Method::GET,
                "/drinks-detail",
                Some(&format!("Bearer {}", token.as_str())),
                None,
            )?,
        )
        .await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "success": false, "error": 400, "message": "invalid_header" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn authorization_is_checked_before_body() -> Result<()> {
        let app = app()?;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/drinks")
            .body(Body::from("not json"))?;
        let (status, body) = send(&app, req).await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "no_auth_in_header");
        Ok(())
    }

    #[tokio::test]
    async fn catalog_round_trip() -> Result<()> {
        let app = app()?;

        let (status, body) = send(
            &app,
            request(Method::POST, "/drinks", Some(&bearer("post:drinks")?), Some(espresso()))?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "drinks": [{
                    "id": 1,
                    "title": "Espresso",
                    "recipe": [{ "name": "coffee", "color": "black", "parts": 1 }],
                }],
            })
        );

        let (status, body) = send(&app, request(Method::GET, "/drinks", None, None)?).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "drinks": [{
                    "id": 1,
                    "title": "Espresso",
                    "recipe": [{ "color": "black", "parts": 1 }],
                }],
            })
        );

        let (status, body) = send(
            &app,
            request(
                Method::PATCH,
                "/drinks/1",
                Some(&bearer("patch:drinks")?),
                Some(json!({ "title": "Doppio" })),
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drinks"][0]["title"], "Doppio");
        assert_eq!(body["drinks"][0]["recipe"][0]["name"], "coffee");

        let (status, body) = send(
            &app,
            request(Method::DELETE, "/drinks/1", Some(&bearer("delete:drinks")?), None)?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "delete": 1 }));

        let (status, body) = send(
            &app,
            request(Method::DELETE, "/drinks/1", Some(&bearer("delete:drinks")?), None)?,
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "success": false, "error": 404, "message": "resource not found" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn malformed_drinks_are_bad_requests() -> Result<()> {
        let app = app()?;
        let auth = bearer("post:drinks")?;

        let (status, body) = send(
            &app,
            request(Method::POST, "/drinks", Some(&auth), Some(json!({ "title": "Water" })))?,
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "success": false, "error": 400, "message": "bad request" })
        );

        let (status, _) = send(&app, request(Method::POST, "/drinks", Some(&auth), None)?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn catalog_limits_are_unprocessable() -> Result<()> {
        let app = app()?;
        let auth = bearer("post:drinks")?;
        create_espresso(&app).await?;

        let (status, body) =
            send(&app, request(Method::POST, "/drinks", Some(&auth), Some(espresso()))?).await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({ "success": false, "error": 422, "message": "unprocessable" })
        );

        let long_title = json!({
            "title": "a".repeat(81),
            "recipe": [{ "name": "water", "color": "blue", "parts": 1 }],
        });
        let (status, _) =
            send(&app, request(Method::POST, "/drinks", Some(&auth), Some(long_title))?).await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &app,
            request(Method::DELETE, "/drinks/0", Some(&bearer("delete:drinks")?), None)?,
        )
        .await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        assert!(logs_contain("request refused"));
        Ok(())
    }

    #[tokio::test]
    async fn patch_requires_changes_and_known_drink() -> Result<()> {
        let app = app()?;
        let auth = bearer("patch:drinks")?;
        create_espresso(&app).await?;

        let (status, _) = send(
            &app,
            request(Method::PATCH, "/drinks/1", Some(&auth), Some(json!({})))?,
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            send(&app, request(Method::PATCH, "/drinks/1", Some(&auth), None)?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            request(
                Method::PATCH,
                "/drinks/42",
                Some(&auth),
                Some(json!({ "title": "Lungo" })),
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() -> Result<()> {
        let app = app()?;

        let (status, body) = send(&app, request(Method::GET, "/teapot", None, None)?).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "resource not found");

        let (status, _) = send(
            &app,
            request(Method::DELETE, "/drinks/latte", Some(&bearer("delete:drinks")?), None)?,
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }
}
