//! Login, sign-up and the cookie session store.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::{ApiError, BackendError};
use crate::models::{Role, User, UserStatus};
use crate::notifications::{AuthOperation, RemoteFunctions};

pub const SESSION_COOKIE: &str = "safepass_session";
pub const DEMO_PASSWORD: &str = "password";
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| ApiError::Internal("Failed to hash password".to_string()))
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Canned approved account for the username `admin`, `teacher`, `driver`, `monitor`
/// or `nurse`.
pub fn demo_user(username: &str) -> Option<User> {
    let role: Role = username.parse().ok()?;
    let index = Role::ALL.iter().position(|r| *r == role)? as u128;
    let title = {
        let name = role.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    };
    let epoch = chrono::NaiveDateTime::default();
    Some(User {
        id: Uuid::from_u128(index + 1),
        name: format!("{} User", title),
        email: format!("{}@safepass.demo", role.as_str()),
        phone: String::new(),
        role,
        status: UserStatus::Approved,
        school_id: None,
        bus_id: None,
        password_hash: String::new(),
        created_at: epoch,
        updated_at: epoch,
    })
}

fn is_demo_id(id: Uuid) -> bool {
    (1..=Role::ALL.len() as u128).contains(&id.as_u128())
}

#[derive(Clone, Debug, Deserialize)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    pub school_id: Option<String>,
    #[serde(default)]
    pub bus_id: Option<String>,
}

pub fn validate_account_fields(name: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".to_string()));
    }
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".to_string()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn email_conflict(e: BackendError) -> ApiError {
    match e {
        BackendError::Conflict(_) => {
            ApiError::Conflict("An account with this email already exists".to_string())
        }
        other => other.into(),
    }
}

/// Stores a new `pending` profile. When `forward` is set the sign-up is also sent
/// to the remote `auth-operations` function; a failure there is only logged.
pub async fn sign_up(
    backend: &dyn Backend,
    functions: &dyn RemoteFunctions,
    forward: bool,
    form: SignUpForm,
) -> Result<User, ApiError> {
    validate_account_fields(&form.name, &form.email, &form.password)?;

    let now = chrono::Utc::now().naive_utc();
    let user = User {
        id: Uuid::new_v4(),
        name: form.name.trim().to_string(),
        email: form.email.trim().to_lowercase(),
        phone: form.phone.trim().to_string(),
        role: form.role,
        status: UserStatus::Pending,
        school_id: form.school_id,
        bus_id: form.bus_id,
        password_hash: hash_password(&form.password)?,
        created_at: now,
        updated_at: now,
    };
    let user = backend.insert_user(user).await.map_err(email_conflict)?;
    crate::metrics::increment_users_total();
    info!("User {} signed up as {}, awaiting approval", user.email, user.role);

    if forward {
        let op = AuthOperation {
            action: "signUp".to_string(),
            user_data: json!({
                "id": user.id,
                "name": user.name,
                "email": user.email,
                "phone": user.phone,
                "role": user.role,
            }),
        };
        if let Err(e) = functions.auth_operation(&op).await {
            warn!("Forwarding sign-up for {} failed: {}", user.email, e);
        }
    }

    Ok(user)
}

struct Session {
    user: User,
    issued_at: Instant,
}

/// Opaque session tokens mapped to the user they were issued for. A token lives
/// for `ttl` from login; expired entries are dropped on lookup and on each login.
pub struct Sessions {
    tokens: RwLock<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl Sessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn expired(&self, session: &Session) -> bool {
        session.issued_at.elapsed() >= self.ttl
    }

    /// Sessions currently held, expired ones included until they are pruned.
    pub async fn active_count(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Verifies the credentials and opens a session. Demo accounts are only
    /// considered when `demo_logins` is on and the real lookup failed.
    pub async fn login(
        &self,
        backend: &dyn Backend,
        demo_logins: bool,
        identifier: &str,
        secret: &str,
    ) -> Result<(Uuid, User), ApiError> {
        let identifier = identifier.trim();
        let found = backend.find_user_by_email(&identifier.to_lowercase()).await?;

        let user = match found {
            Some(user) if verify_password(&user.password_hash, secret) => user,
            _ => match demo_user(identifier) {
                Some(demo) if demo_logins && secret == DEMO_PASSWORD => {
                    warn!("Demo login used for {}", demo.email);
                    demo
                }
                _ => {
                    return Err(ApiError::Unauthorized(
                        "Invalid email or password".to_string(),
                    ))
                }
            },
        };

        let token = Uuid::new_v4();
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, session| !self.expired(session));
        tokens.insert(
            token,
            Session {
                user: user.clone(),
                issued_at: Instant::now(),
            },
        );
        Ok((token, user))
    }

    pub async fn logout(&self, token: Uuid) -> bool {
        self.tokens.write().await.remove(&token).is_some()
    }

    /// The user behind `token`, re-read from the backend so role and status
    /// changes apply immediately. A deleted account or an expired token ends the
    /// session.
    pub async fn current(&self, backend: &dyn Backend, token: Uuid) -> Result<Option<User>, ApiError> {
        let cached = {
            let tokens = self.tokens.read().await;
            match tokens.get(&token) {
                None => return Ok(None),
                Some(session) if self.expired(session) => None,
                Some(session) => Some(session.user.clone()),
            }
        };
        let Some(cached) = cached else {
            self.tokens.write().await.remove(&token);
            return Ok(None);
        };
        if is_demo_id(cached.id) {
            return Ok(Some(cached));
        }

        match backend.find_user(cached.id).await? {
            Some(fresh) => {
                if let Some(session) = self.tokens.write().await.get_mut(&token) {
                    session.user = fresh.clone();
                }
                Ok(Some(fresh))
            }
            None => {
                self.tokens.write().await.remove(&token);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::notifications::FunctionsClient;

    fn form(email: &str) -> SignUpForm {
        SignUpForm {
            name: "Terry Teacher".to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
            phone: String::new(),
            role: Role::Teacher,
            school_id: None,
            bus_id: None,
        }
    }

    #[test]
    fn demo_users_cover_every_role() {
        for role in Role::ALL {
            let user = demo_user(role.as_str()).unwrap();
            assert_eq!(user.role, role);
            assert!(user.is_approved());
            assert!(is_demo_id(user.id));
        }
        assert_eq!(demo_user("admin").unwrap().name, "Admin User");
        assert!(demo_user("janitor").is_none());
    }

    #[test]
    fn hashes_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password(&hash, "secret1"));
        assert!(!verify_password(&hash, "secret2"));
        assert!(!verify_password("not-a-hash", "secret1"));
    }

    #[tokio::test]
    async fn sign_up_creates_pending_user_with_lowercase_email() {
        let backend = MemoryBackend::new();
        let functions = FunctionsClient::new(None, None);
        let user = sign_up(&backend, &functions, false, form("Terry@School.org"))
            .await
            .unwrap();
        assert_eq!(user.status, UserStatus::Pending);
        assert_eq!(user.email, "terry@school.org");

        let dup = sign_up(&backend, &functions, false, form("terry@school.org")).await;
        assert!(matches!(dup, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn sign_up_rejects_short_passwords() {
        let backend = MemoryBackend::new();
        let functions = FunctionsClient::new(None, None);
        let mut short = form("a@b.c");
        short.password = "123".to_string();
        assert!(matches!(
            sign_up(&backend, &functions, false, short).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn login_verifies_password_and_opens_session() {
        let backend = MemoryBackend::new();
        let functions = FunctionsClient::new(None, None);
        sign_up(&backend, &functions, false, form("terry@school.org"))
            .await
            .unwrap();
        let sessions = Sessions::new(Duration::from_secs(3600));

        let bad = sessions
            .login(&backend, false, "terry@school.org", "wrong")
            .await;
        assert!(matches!(bad, Err(ApiError::Unauthorized(_))));

        let (token, user) = sessions
            .login(&backend, false, "TERRY@school.org", "hunter22")
            .await
            .unwrap();
        assert_eq!(user.status, UserStatus::Pending);
        assert_eq!(
            sessions.current(&backend, token).await.unwrap().unwrap().id,
            user.id
        );

        assert!(sessions.logout(token).await);
        assert!(sessions.current(&backend, token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn demo_logins_need_the_flag() {
        let backend = MemoryBackend::new();
        let sessions = Sessions::new(Duration::from_secs(3600));
        assert!(sessions
            .login(&backend, false, "admin", DEMO_PASSWORD)
            .await
            .is_err());
        let (token, user) = sessions
            .login(&backend, true, "admin", DEMO_PASSWORD)
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(sessions.current(&backend, token).await.unwrap().is_some());
        assert!(sessions.login(&backend, true, "admin", "nope").await.is_err());
    }

    #[tokio::test]
    async fn sessions_see_status_changes() {
        let backend = MemoryBackend::new();
        let functions = FunctionsClient::new(None, None);
        let user = sign_up(&backend, &functions, false, form("terry@school.org"))
            .await
            .unwrap();
        let sessions = Sessions::new(Duration::from_secs(3600));
        let (token, _) = sessions
            .login(&backend, false, "terry@school.org", "hunter22")
            .await
            .unwrap();

        backend
            .update_user(User {
                status: UserStatus::Approved,
                ..user.clone()
            })
            .await
            .unwrap();
        let current = sessions.current(&backend, token).await.unwrap().unwrap();
        assert!(current.is_approved());

        backend.delete_user(user.id).await.unwrap();
        assert!(sessions.current(&backend, token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_tokens_resolve_to_nothing() {
        let backend = MemoryBackend::new();
        let sessions = Sessions::new(Duration::from_millis(30));
        let (old, _) = sessions
            .login(&backend, true, "nurse", DEMO_PASSWORD)
            .await
            .unwrap();
        assert!(sessions.current(&backend, old).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sessions.current(&backend, old).await.unwrap().is_none());
        assert_eq!(sessions.active_count().await, 0);
    }

    #[tokio::test]
    async fn login_prunes_expired_tokens() {
        let backend = MemoryBackend::new();
        let sessions = Sessions::new(Duration::from_millis(30));
        for _ in 0..3 {
            sessions
                .login(&backend, true, "driver", DEMO_PASSWORD)
                .await
                .unwrap();
        }
        assert_eq!(sessions.active_count().await, 3);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let (fresh, _) = sessions
            .login(&backend, true, "driver", DEMO_PASSWORD)
            .await
            .unwrap();
        assert_eq!(sessions.active_count().await, 1);
        assert!(sessions.current(&backend, fresh).await.unwrap().is_some());
    }
}
