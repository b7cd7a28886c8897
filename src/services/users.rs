//! User accounts: creation, login, profile management

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{
    authorize, hash_password, verify_password, Action, Principal, Resource, ResourceKind, Role,
    TokenService,
};
use crate::db::schemas::{now_millis, UserDoc, UserView};
use crate::db::{Filter, RecordStore};
use crate::services::{Page, Paged};
use crate::types::{QuillError, RespCode, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Input for creating a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Partial profile update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Successful login payload
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: u64,
    pub user: UserView,
}

pub struct UserService {
    users: Arc<dyn RecordStore<UserDoc>>,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(users: Arc<dyn RecordStore<UserDoc>>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Validate, hash the password, and store a new user
    ///
    /// This is the only place a password hash is produced for a new account.
    pub async fn create_user(&self, input: NewUser) -> Result<UserDoc> {
        let username = input.username.trim();
        if username.is_empty() {
            return Err(QuillError::BadRequest("username is required".into()));
        }
        validate_email(&input.email)?;
        validate_password(&input.password)?;
        let role = match input.role.as_deref() {
            None | Some("") => Role::Member,
            Some(role) => role.parse()?,
        };

        if self.users.exists("username", &json!(username), None).await? {
            return Err(QuillError::Rejected(RespCode::UsernameUsed));
        }
        if self.users.exists("email", &json!(input.email), None).await? {
            return Err(QuillError::Rejected(RespCode::EmailUsed));
        }

        let hash = hash_password(&input.password)?;
        let mut user = UserDoc::new(username, input.email, hash, role);
        if let Some(name) = input.display_name.filter(|n| !n.trim().is_empty()) {
            user.display_name = name;
        }

        let user = self.users.create(user).await.map_err(user_conflict)?;
        info!(username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// Admin-only user creation
    pub async fn add_user(&self, principal: &Principal, input: NewUser) -> Result<UserView> {
        authorize(principal, Action::Create, Resource::unowned(ResourceKind::User)).into_result()?;
        Ok(self.create_user(input).await?.view())
    }

    /// Check credentials and issue a session token
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let user = self
            .users
            .find_by_field("username", &json!(username))
            .await?
            .ok_or(QuillError::Unauthenticated(RespCode::UserNotExist))?;

        if !verify_password(password, &user.password_hash) {
            warn!(username = %username, "Login failed: wrong password");
            return Err(QuillError::Unauthenticated(RespCode::PasswordWrong));
        }

        if !user.is_active {
            warn!(username = %username, "Login refused: account inactive");
            return Err(QuillError::Rejected(RespCode::UserInactive));
        }

        let issued = self.tokens.issue(&user.id, &user.username, user.role)?;

        let mut fields = Map::new();
        fields.insert("last_login".into(), json!(now_millis()));
        let user = self.users.update(&user.id, fields).await?.unwrap_or(user);

        info!(username = %user.username, "User logged in");
        Ok(LoginOutcome {
            token: issued.token,
            expires_at: issued.expires_at,
            user: user.view(),
        })
    }

    /// Fetch a user (self or admin)
    pub async fn get_user(&self, principal: &Principal, id: &str) -> Result<UserView> {
        authorize(principal, Action::Read, Resource::owned(ResourceKind::User, id)).into_result()?;
        Ok(self.require(id).await?.view())
    }

    /// List every user (admin only)
    pub async fn list_users(&self, principal: &Principal, page: Page) -> Result<Paged<UserView>> {
        authorize(principal, Action::List, Resource::unowned(ResourceKind::User)).into_result()?;

        let filter = Filter::all();
        let total = self.users.count(&filter).await?;
        let items = self.users.paginate(&filter, page.limit(), page.offset()).await?;
        Ok(Paged { items, total }.map(|u| u.view()))
    }

    /// Apply a partial update (self or admin; role and activity need admin)
    pub async fn update_user(&self, principal: &Principal, id: &str, update: UserUpdate) -> Result<UserView> {
        authorize(principal, Action::Edit, Resource::owned(ResourceKind::User, id)).into_result()?;
        if update.role.is_some() || update.is_active.is_some() {
            authorize(principal, Action::Edit, Resource::unowned(ResourceKind::User)).into_result()?;
        }
        self.require(id).await?;

        let mut fields = Map::new();

        if let Some(email) = update.email {
            validate_email(&email)?;
            if self.users.exists("email", &json!(email), Some(id)).await? {
                return Err(QuillError::Rejected(RespCode::EmailUsed));
            }
            fields.insert("email".into(), Value::String(email));
        }
        if let Some(name) = update.display_name {
            if name.trim().is_empty() {
                return Err(QuillError::Rejected(RespCode::EmptyDisplayName));
            }
            fields.insert("display_name".into(), Value::String(name));
        }
        if let Some(bio) = update.bio {
            fields.insert("bio".into(), Value::String(bio));
        }
        if let Some(url) = update.avatar_url {
            validate_avatar_url(&url)?;
            fields.insert("avatar_url".into(), Value::String(url));
        }
        if let Some(password) = update.password {
            validate_password(&password)?;
            fields.insert("password_hash".into(), Value::String(hash_password(&password)?));
        }
        if let Some(role) = update.role {
            let role: Role = role.parse()?;
            fields.insert("role".into(), json!(role));
        }
        if let Some(active) = update.is_active {
            fields.insert("is_active".into(), Value::Bool(active));
        }

        let user = self
            .users
            .update(id, fields)
            .await
            .map_err(user_conflict)?
            .ok_or(QuillError::Rejected(RespCode::UserNotExist))?;

        info!(user_id = %id, by = %principal.username, "User updated");
        Ok(user.view())
    }

    /// Soft delete a user (self or admin)
    pub async fn delete_user(&self, principal: &Principal, id: &str) -> Result<()> {
        authorize(principal, Action::Delete, Resource::owned(ResourceKind::User, id)).into_result()?;

        if !self.users.delete(id).await? {
            return Err(QuillError::Rejected(RespCode::UserNotExist));
        }
        info!(user_id = %id, by = %principal.username, "User deleted");
        Ok(())
    }

    /// Create the bootstrap administrator unless the username is taken
    ///
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, username: &str, password: &str, email: &str) -> Result<bool> {
        if self.users.exists("username", &json!(username), None).await? {
            return Ok(false);
        }

        self.create_user(NewUser {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
            role: Some(Role::Admin.to_string()),
            display_name: None,
        })
        .await?;
        Ok(true)
    }

    async fn require(&self, id: &str) -> Result<UserDoc> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(QuillError::Rejected(RespCode::UserNotExist))
    }
}

fn user_conflict(err: QuillError) -> QuillError {
    match err {
        QuillError::Duplicate(field) if field == "username" => QuillError::Rejected(RespCode::UsernameUsed),
        QuillError::Duplicate(field) if field == "email" => QuillError::Rejected(RespCode::EmailUsed),
        other => other,
    }
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(QuillError::Rejected(RespCode::InvalidEmail)),
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(QuillError::Rejected(RespCode::PasswordTooShort));
    }
    Ok(())
}

/// Empty clears the avatar; anything else must be an http(s) URL
fn validate_avatar_url(url: &str) -> Result<()> {
    let ok = url.is_empty()
        || ["http://", "https://"]
            .iter()
            .any(|scheme| url.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()));
    if ok {
        Ok(())
    } else {
        Err(QuillError::Rejected(RespCode::InvalidAvatarUrl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::<UserDoc>::new()), Arc::new(TokenService::new_dev()))
    }

    fn new_user(name: &str, role: &str) -> NewUser {
        NewUser {
            username: name.into(),
            password: format!("{name}-password"),
            email: format!("{name}@example.com"),
            role: Some(role.into()),
            display_name: None,
        }
    }

    fn principal_for(user: &UserDoc) -> Principal {
        Principal {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let svc = service();
        let user = svc.create_user(new_user("alice", "member")).await.unwrap();

        assert_ne!(user.password_hash, "alice-password");
        assert!(verify_password("alice-password", &user.password_hash));
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.display_name, "alice");
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let svc = service();

        let mut input = new_user("alice", "member");
        input.email = "no-at-sign".into();
        assert_eq!(svc.create_user(input).await.unwrap_err().resp_code(), RespCode::InvalidEmail);

        let mut input = new_user("alice", "member");
        input.password = "12345".into();
        assert_eq!(svc.create_user(input).await.unwrap_err().resp_code(), RespCode::PasswordTooShort);

        let input = new_user("alice", "superuser");
        assert_eq!(svc.create_user(input).await.unwrap_err().resp_code(), RespCode::InvalidRole);
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let svc = service();
        svc.create_user(new_user("alice", "member")).await.unwrap();

        let mut input = new_user("alice", "member");
        input.email = "other@example.com".into();
        assert_eq!(svc.create_user(input).await.unwrap_err().resp_code(), RespCode::UsernameUsed);

        let mut input = new_user("alicia", "member");
        input.email = "alice@example.com".into();
        assert_eq!(svc.create_user(input).await.unwrap_err().resp_code(), RespCode::EmailUsed);
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let svc = service();
        let alice = svc.create_user(new_user("alice", "member")).await.unwrap();

        let outcome = svc.login("alice", "alice-password").await.unwrap();
        assert_eq!(outcome.user.id, alice.id);
        assert!(outcome.user.last_login.is_some());
        assert_eq!(svc.tokens.parse(&outcome.token).unwrap().sub, alice.id);

        let err = svc.login("alice", "wrong-password").await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::PasswordWrong);
        assert_eq!(err.status_code(), hyper::StatusCode::UNAUTHORIZED);

        let err = svc.login("nobody", "whatever").await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::UserNotExist);
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_login() {
        let svc = service();
        let admin = svc.create_user(new_user("root", "admin")).await.unwrap();
        let carol = svc.create_user(new_user("carol", "member")).await.unwrap();

        let deactivate = UserUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        svc.update_user(&principal_for(&admin), &carol.id, deactivate).await.unwrap();

        let err = svc.login("carol", "carol-password").await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::UserInactive);
        assert_eq!(err.status_code(), hyper::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_self_service_and_admin_only_fields() {
        let svc = service();
        let alice = svc.create_user(new_user("alice", "member")).await.unwrap();
        let bob = svc.create_user(new_user("bob", "member")).await.unwrap();
        let me = principal_for(&alice);

        let view = svc.get_user(&me, &alice.id).await.unwrap();
        assert_eq!(view.username, "alice");
        let err = svc.get_user(&me, &bob.id).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::NoPermission);

        let update = UserUpdate {
            bio: Some("writes things".into()),
            avatar_url: Some("https://example.com/a.png".into()),
            ..Default::default()
        };
        let view = svc.update_user(&me, &alice.id, update).await.unwrap();
        assert_eq!(view.bio, "writes things");

        let promote = UserUpdate {
            role: Some("admin".into()),
            ..Default::default()
        };
        let err = svc.update_user(&me, &alice.id, promote).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::NoPermission);

        let err = svc.list_users(&me, Page::default()).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::NoPermission);
    }

    #[tokio::test]
    async fn test_update_validation() {
        let svc = service();
        let alice = svc.create_user(new_user("alice", "member")).await.unwrap();
        svc.create_user(new_user("bob", "member")).await.unwrap();
        let me = principal_for(&alice);

        let cases = [
            (UserUpdate { email: Some("bob@example.com".into()), ..Default::default() }, RespCode::EmailUsed),
            (UserUpdate { display_name: Some("  ".into()), ..Default::default() }, RespCode::EmptyDisplayName),
            (UserUpdate { avatar_url: Some("ftp://x".into()), ..Default::default() }, RespCode::InvalidAvatarUrl),
            (UserUpdate { password: Some("123".into()), ..Default::default() }, RespCode::PasswordTooShort),
        ];
        for (update, code) in cases {
            assert_eq!(svc.update_user(&me, &alice.id, update).await.unwrap_err().resp_code(), code);
        }

        let same_email = UserUpdate {
            email: Some("alice@example.com".into()),
            ..Default::default()
        };
        assert!(svc.update_user(&me, &alice.id, same_email).await.is_ok());
    }

    #[tokio::test]
    async fn test_password_change_rehashes() {
        let svc = service();
        let alice = svc.create_user(new_user("alice", "member")).await.unwrap();
        let update = UserUpdate {
            password: Some("brand-new-secret".into()),
            ..Default::default()
        };
        svc.update_user(&principal_for(&alice), &alice.id, update).await.unwrap();

        assert!(svc.login("alice", "alice-password").await.is_err());
        assert!(svc.login("alice", "brand-new-secret").await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_lists_and_deletes() {
        let svc = service();
        let admin = svc.create_user(new_user("root", "admin")).await.unwrap();
        let alice = svc.create_user(new_user("alice", "member")).await.unwrap();
        let root = principal_for(&admin);

        let page = svc.list_users(&root, Page::default()).await.unwrap();
        assert_eq!(page.total, 2);

        svc.delete_user(&root, &alice.id).await.unwrap();
        let err = svc.delete_user(&root, &alice.id).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::UserNotExist);
        assert_eq!(svc.list_users(&root, Page::default()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_ensure_admin_once() {
        let svc = service();
        assert!(svc.ensure_admin("root", "root-password", "root@example.com").await.unwrap());
        assert!(!svc.ensure_admin("root", "root-password", "root@example.com").await.unwrap());

        let outcome = svc.login("root", "root-password").await.unwrap();
        assert_eq!(outcome.user.role, Role::Admin);
    }

    #[test]
    fn test_validators() {
        assert!(validate_email("a@b").is_ok());
        assert!(validate_email("@b").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a@b@c").is_err());
        assert!(validate_avatar_url("").is_ok());
        assert!(validate_avatar_url("http://x").is_ok());
        assert!(validate_avatar_url("https://").is_err());
        assert!(validate_avatar_url("javascript:alert(1)").is_err());
    }
}
