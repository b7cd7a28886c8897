//! Principal resolution for protected routes
//!
//! A request moves through
//! `NoHeader -> HeaderParsed -> TokenParsed -> UserLoaded -> Active`
//! and is rejected at the first stage that fails. On success the resolved
//! [`Principal`] is stored in the request extensions for handlers.

use hyper::Request;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::auth::{Role, TokenService};
use crate::db::schemas::UserDoc;
use crate::db::RecordStore;
use crate::types::{QuillError, RespCode, Result};

const BEARER_PREFIX: &str = "Bearer ";

/// The authenticated identity attached to a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resolution stage reached before a request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NoHeader,
    HeaderParsed,
    TokenParsed,
    UserLoaded,
    Active,
}

/// Extract the token from an `Authorization` header value.
/// Only the exact `Bearer <token>` form is accepted.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

/// Turns bearer credentials into a resolved principal
#[derive(Clone)]
pub struct PrincipalResolver {
    tokens: Arc<TokenService>,
    users: Arc<dyn RecordStore<UserDoc>>,
}

impl PrincipalResolver {
    pub fn new(tokens: Arc<TokenService>, users: Arc<dyn RecordStore<UserDoc>>) -> Self {
        Self { tokens, users }
    }

    /// Resolve the principal for an optional `Authorization` header value
    pub async fn resolve(&self, auth_header: Option<&str>) -> Result<Principal> {
        let header = auth_header.ok_or_else(|| reject(Stage::NoHeader, RespCode::Unauthorized))?;

        let token =
            bearer_token(header).ok_or_else(|| reject(Stage::HeaderParsed, RespCode::TokenInvalid))?;

        let claims = self
            .tokens
            .parse(token)
            .map_err(|_| reject(Stage::TokenParsed, RespCode::TokenInvalid))?;

        let user = match self.users.find_by_field("username", &claims.username.clone().into()).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(reject(Stage::UserLoaded, RespCode::UserNotExist)),
            Err(e) => {
                error!(username = %claims.username, "User lookup failed during auth: {}", e);
                return Err(e);
            }
        };

        if !user.is_active {
            debug!(username = %user.username, "Rejected at {:?}: account inactive", Stage::Active);
            return Err(QuillError::Rejected(RespCode::UserInactive));
        }

        Ok(Principal {
            user_id: user.id,
            username: user.username,
            role: user.role,
        })
    }

    /// Resolve the request's principal and attach it to the request extensions
    pub async fn authenticate<B>(&self, req: &mut Request<B>) -> Result<Principal> {
        let header = match req.headers().get(hyper::header::AUTHORIZATION) {
            None => None,
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| reject(Stage::HeaderParsed, RespCode::TokenInvalid))?,
            ),
        };

        let principal = self.resolve(header).await?;
        req.extensions_mut().insert(principal.clone());
        Ok(principal)
    }
}

/// Fetch the principal a request was authenticated as
pub fn principal_of<B>(req: &Request<B>) -> Result<&Principal> {
    req.extensions()
        .get::<Principal>()
        .ok_or(QuillError::Unauthenticated(RespCode::Unauthorized))
}

fn reject(stage: Stage, code: RespCode) -> QuillError {
    debug!("Rejected at {:?}: {}", stage, code);
    QuillError::Unauthenticated(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::db::{Filter, MemoryStore};
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Counts username lookups on top of an in-memory store
    #[derive(Default)]
    struct CountingUsers {
        inner: MemoryStore<UserDoc>,
        lookups: AtomicU32,
    }

    #[async_trait]
    impl RecordStore<UserDoc> for CountingUsers {
        async fn find_by_id(&self, id: &str) -> Result<Option<UserDoc>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_field(&self, field: &str, value: &Value) -> Result<Option<UserDoc>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_field(field, value).await
        }

        async fn exists(&self, field: &str, value: &Value, excluding_id: Option<&str>) -> Result<bool> {
            self.inner.exists(field, value, excluding_id).await
        }

        async fn create(&self, record: UserDoc) -> Result<UserDoc> {
            self.inner.create(record).await
        }

        async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<Option<UserDoc>> {
            self.inner.update(id, fields).await
        }

        async fn delete(&self, id: &str) -> Result<bool> {
            self.inner.delete(id).await
        }

        async fn count(&self, filter: &Filter) -> Result<u64> {
            self.inner.count(filter).await
        }

        async fn paginate(&self, filter: &Filter, limit: u64, offset: u64) -> Result<Vec<UserDoc>> {
            self.inner.paginate(filter, limit, offset).await
        }
    }

    async fn setup() -> (PrincipalResolver, Arc<TokenService>, Arc<MemoryStore<UserDoc>>) {
        let tokens = Arc::new(TokenService::new_dev());
        let users = Arc::new(MemoryStore::<UserDoc>::new());

        let hash = hash_password("alice-password").unwrap();
        let alice = UserDoc::new("alice", "alice@example.com", hash.clone(), Role::Member);
        users.create(alice).await.unwrap();

        let mut carol = UserDoc::new("carol", "carol@example.com", hash, Role::Member);
        carol.is_active = false;
        users.create(carol).await.unwrap();

        let resolver = PrincipalResolver::new(Arc::clone(&tokens), users.clone());
        (resolver, tokens, users)
    }

    #[test]
    fn test_bearer_token_is_strict() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("bearer abc123"), None);
        assert_eq!(bearer_token("Bearer  abc123"), Some(" abc123"));
        assert_eq!(bearer_token("abc123"), None);
        assert_eq!(bearer_token("Basic abc123"), None);
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let (resolver, _, _) = setup().await;
        let err = resolver.resolve(None).await.unwrap_err();

        assert_eq!(err.resp_code(), RespCode::Unauthorized);
        assert_eq!(err.status_code(), hyper::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejected_headers_never_reach_the_store() {
        let tokens = Arc::new(TokenService::new_dev());
        let users = Arc::new(CountingUsers::default());
        let resolver = PrincipalResolver::new(Arc::clone(&tokens), users.clone());

        let err = resolver.resolve(None).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::Unauthorized);
        for header in ["Bearer garbage", "Basic abc", "Bearer "] {
            let err = resolver.resolve(Some(header)).await.unwrap_err();
            assert_eq!(err.resp_code(), RespCode::TokenInvalid);
        }
        assert_eq!(users.lookups.load(Ordering::SeqCst), 0);

        let token = tokens.issue("ghost-id", "ghost", Role::Member).unwrap().token;
        let err = resolver.resolve(Some(&format!("Bearer {token}"))).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::UserNotExist);
        assert_eq!(users.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_garbage_token_is_token_invalid() {
        let (resolver, _, _) = setup().await;

        for header in ["Bearer garbage", "Token abc", "Bearer  spaced"] {
            let err = resolver.resolve(Some(header)).await.unwrap_err();
            assert_eq!(err.resp_code(), RespCode::TokenInvalid, "header {header:?}");
        }
    }

    #[tokio::test]
    async fn test_active_user_resolves() {
        let (resolver, tokens, users) = setup().await;
        let alice = users.find_by_field("username", &"alice".into()).await.unwrap().unwrap();
        let token = tokens.issue(&alice.id, "alice", Role::Member).unwrap().token;

        let principal = resolver.resolve(Some(&format!("Bearer {token}"))).await.unwrap();
        assert_eq!(principal.user_id, alice.id);
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, Role::Member);
    }

    #[tokio::test]
    async fn test_role_comes_from_store_not_token() {
        let (resolver, tokens, users) = setup().await;
        let alice = users.find_by_field("username", &"alice".into()).await.unwrap().unwrap();
        let token = tokens.issue(&alice.id, "alice", Role::Admin).unwrap().token;

        let principal = resolver.resolve(Some(&format!("Bearer {token}"))).await.unwrap();
        assert_eq!(principal.role, Role::Member);
    }

    #[tokio::test]
    async fn test_inactive_user_rejected() {
        let (resolver, tokens, _) = setup().await;
        let token = tokens.issue("carol-id", "carol", Role::Member).unwrap().token;

        let err = resolver.resolve(Some(&format!("Bearer {token}"))).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::UserInactive);
        assert_eq!(err.status_code(), hyper::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let (resolver, tokens, _) = setup().await;
        let token = tokens.issue("ghost-id", "ghost", Role::Admin).unwrap().token;

        let err = resolver.resolve(Some(&format!("Bearer {token}"))).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::UserNotExist);
        assert_eq!(err.status_code(), hyper::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authenticate_attaches_principal() {
        let (resolver, tokens, _) = setup().await;
        let token = tokens.issue("id", "alice", Role::Member).unwrap().token;

        let mut req = Request::builder()
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .unwrap();
        assert!(principal_of(&req).is_err());

        let principal = resolver.authenticate(&mut req).await.unwrap();
        assert_eq!(principal_of(&req).unwrap(), &principal);
    }
}
