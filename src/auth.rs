use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::user::{Role, User};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

// The identity resolved by `require_auth` and handed to handlers through
// request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Internal(format!("password hash failed: {err}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn issue_token(user: &User, secret: &str, expiry_hours: i64) -> Result<String, ApiError> {
    let id = user
        .id
        .ok_or_else(|| ApiError::Internal("user record has no id".into()))?;
    let now = Utc::now();
    let claims = Claims {
        sub: id.to_hex(),
        email: user.email.clone(),
        role: user.role,
        exp: (now + Duration::hours(expiry_hours)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| ApiError::Internal(format!("token encoding failed: {err}")))
}

// Any failure here is deliberately collapsed into Unauthorized.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

// The single owner-or-admin rule shared by every booking handler.
pub fn authorize_owner(requester: &CurrentUser, owner: ObjectId) -> Result<(), ApiError> {
    if requester.role == Role::Admin || requester.id == owner {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

// Authentication gate. Verifies the bearer token, resolves the user from the
// store (the role is read fresh, not trusted from the token) and attaches the
// identity for downstream handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let claims = verify_token(token, &state.config.jwt_secret)?;
    let id = ObjectId::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)?;

    let user = state
        .users()
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(CurrentUser {
        id,
        name: user.name,
        email: user.email,
        role: user.role,
    });
    Ok(next.run(req).await)
}

// Admin gate, layered after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    match req.extensions().get::<CurrentUser>() {
        Some(user) if user.role == Role::Admin => Ok(next.run(req).await),
        Some(_) => Err(ApiError::Forbidden),
        None => Err(ApiError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn sample_user(role: Role) -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Jess".into(),
            email: "jess@example.com".into(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let user = sample_user(Role::Admin);
        let token = issue_token(&user, "secret", 1).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.email, "jess@example.com");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&sample_user(Role::User), "secret", 1).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
        assert!(verify_token("garbage.token.here", "secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Negative expiry pushes exp well past the default leeway.
        let token = issue_token(&sample_user(Role::User), "secret", -2).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn owner_or_admin_predicate() {
        let owner_id = ObjectId::new();
        let owner = CurrentUser {
            id: owner_id,
            name: "Owner".into(),
            email: "owner@example.com".into(),
            role: Role::User,
        };
        let stranger = CurrentUser {
            id: ObjectId::new(),
            name: "Stranger".into(),
            email: "stranger@example.com".into(),
            role: Role::User,
        };
        let admin = CurrentUser {
            id: ObjectId::new(),
            name: "Admin".into(),
            email: "admin@door2day.com".into(),
            role: Role::Admin,
        };

        assert!(authorize_owner(&owner, owner_id).is_ok());
        assert!(authorize_owner(&admin, owner_id).is_ok());
        assert!(matches!(
            authorize_owner(&stranger, owner_id),
            Err(ApiError::Forbidden)
        ));
    }

    mod admin_gate {
        use super::*;
        use axum::{
            body::Body,
            http::{Request as HttpRequest, StatusCode},
            middleware,
            routing::get,
            Router,
        };
        use tower::ServiceExt;

        // A route behind `require_admin`, with the identity (if any) planted
        // into request extensions the way `require_auth` would.
        fn gated_app(identity: Option<CurrentUser>) -> Router {
            let mut router = Router::new()
                .route("/admin-only", get(|| async { "ok" }))
                .route_layer(middleware::from_fn(require_admin));
            if let Some(identity) = identity {
                router = router.layer(middleware::from_fn(
                    move |mut req: Request, next: Next| {
                        let identity = identity.clone();
                        async move {
                            req.extensions_mut().insert(identity);
                            next.run(req).await
                        }
                    },
                ));
            }
            router
        }

        fn identity(role: Role) -> CurrentUser {
            CurrentUser {
                id: ObjectId::new(),
                name: "Jess".into(),
                email: "jess@example.com".into(),
                role,
            }
        }

        async fn hit(app: Router) -> StatusCode {
            let response = app
                .oneshot(
                    HttpRequest::builder()
                        .uri("/admin-only")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            response.status()
        }

        #[tokio::test]
        async fn admins_pass_through() {
            let status = hit(gated_app(Some(identity(Role::Admin)))).await;
            assert_eq!(status, StatusCode::OK);
        }

        #[tokio::test]
        async fn non_admins_get_forbidden() {
            let status = hit(gated_app(Some(identity(Role::User)))).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }

        #[tokio::test]
        async fn missing_identity_gets_unauthorized() {
            let status = hit(gated_app(None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }
}
