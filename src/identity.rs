//! In-memory user and role store. Accounts live for the lifetime of the process.

use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_USER: &str = "User";
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Email '{0}' is already taken.")]
    DuplicateUser(String),
    #[error("User '{0}' does not exist.")]
    UnknownUser(String),
    #[error("Role '{0}' does not exist.")]
    UnknownRole(String),
    #[error("Passwords must be at least {} characters.", MIN_PASSWORD_LEN)]
    WeakPassword,
    #[error("'{0}' is not a valid email address.")]
    InvalidEmail(String),
    #[error("Failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub email: String,
    pub roles: BTreeSet<String>,
    password_hash: String,
}

impl UserRecord {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

#[derive(Default)]
struct Inner {
    roles: BTreeSet<String>,
    users: HashMap<String, UserRecord>,
}

pub struct UserStore {
    cost: u32,
    inner: RwLock<Inner>,
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore {
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    /// Store hashing with the given bcrypt cost factor.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            cost,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub async fn role_exists(&self, role: &str) -> bool {
        self.inner.read().await.roles.contains(role)
    }

    /// Returns true when the role was created.
    pub async fn ensure_role(&self, role: &str) -> bool {
        self.inner.write().await.roles.insert(role.to_string())
    }

    pub async fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        self.inner.read().await.users.get(&normalize(email)).cloned()
    }

    pub async fn create_user(&self, email: &str, password: &str) -> Result<UserRecord, IdentityError> {
        let email = normalize(email);
        if !is_plausible_email(&email) {
            return Err(IdentityError::InvalidEmail(email));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }
        if self.inner.read().await.users.contains_key(&email) {
            return Err(IdentityError::DuplicateUser(email));
        }
        let password_hash = bcrypt::hash(password, self.cost)?;

        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&email) {
            return Err(IdentityError::DuplicateUser(email));
        }
        let record = UserRecord {
            email: email.clone(),
            roles: BTreeSet::new(),
            password_hash,
        };
        inner.users.insert(email, record.clone());
        Ok(record)
    }

    pub async fn add_to_role(&self, email: &str, role: &str) -> Result<(), IdentityError> {
        let email = normalize(email);
        let mut inner = self.inner.write().await;
        if !inner.roles.contains(role) {
            return Err(IdentityError::UnknownRole(role.to_string()));
        }
        let user = inner
            .users
            .get_mut(&email)
            .ok_or_else(|| IdentityError::UnknownUser(email.clone()))?;
        user.roles.insert(role.to_string());
        Ok(())
    }

    pub async fn verify_credentials(&self, email: &str, password: &str) -> Option<UserRecord> {
        let email = normalize(email);
        let user = self.inner.read().await.users.get(&email).cloned()?;
        match bcrypt::verify(password, &user.password_hash) {
            Ok(true) => Some(user),
            Ok(false) => None,
            Err(e) => {
                warn!("Stored password hash for '{}' is unreadable: {}", email, e);
                None
            }
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !email.contains(' '),
        None => false,
    }
}

/// Seeds the `Admin` and `User` roles and, when a password is configured, the admin account.
/// Safe to run repeatedly; existing roles and users are left untouched.
pub async fn seed_roles_and_admin(
    store: &UserStore,
    admin_email: &str,
    admin_password: Option<&str>,
) -> Result<bool, IdentityError> {
    for role in [ROLE_ADMIN, ROLE_USER] {
        if store.ensure_role(role).await {
            info!("Created role '{}'", role);
        }
    }

    if store.find_by_email(admin_email).await.is_some() {
        return Ok(false);
    }
    let Some(password) = admin_password else {
        warn!("ADMIN_PASSWORD not set, skipping admin account bootstrap");
        return Ok(false);
    };

    store.create_user(admin_email, password).await?;
    store.add_to_role(admin_email, ROLE_ADMIN).await?;
    info!("Created admin account '{}'", normalize(admin_email));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = UserStore::with_cost(4);
        let first = seed_roles_and_admin(&store, "Admin@CineScope.com", Some("Admin@123"))
            .await
            .unwrap();
        let second = seed_roles_and_admin(&store, "admin@cinescope.com", Some("Admin@123"))
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
        assert!(store.role_exists(ROLE_ADMIN).await);
        assert!(store.role_exists(ROLE_USER).await);

        let admin = store.find_by_email("admin@cinescope.com").await.unwrap();
        assert!(admin.has_role(ROLE_ADMIN));
        assert_eq!(store.inner.read().await.users.len(), 1);
    }

    #[tokio::test]
    async fn seeding_without_password_only_creates_roles() {
        let store = UserStore::with_cost(4);
        let created = seed_roles_and_admin(&store, "admin@cinescope.com", None)
            .await
            .unwrap();
        assert!(!created);
        assert!(store.role_exists(ROLE_ADMIN).await);
        assert!(store.find_by_email("admin@cinescope.com").await.is_none());
    }

    #[tokio::test]
    async fn verifies_passwords() {
        let store = UserStore::with_cost(4);
        store.create_user("viewer@example.com", "hunter22").await.unwrap();
        assert!(store
            .verify_credentials("VIEWER@example.com", "hunter22")
            .await
            .is_some());
        assert!(store
            .verify_credentials("viewer@example.com", "hunter23")
            .await
            .is_none());
        assert!(store
            .verify_credentials("nobody@example.com", "hunter22")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn password_hashes_are_salted() {
        let first = UserStore::with_cost(4);
        let second = UserStore::with_cost(4);
        first.create_user("viewer@example.com", "hunter22").await.unwrap();
        second.create_user("viewer@example.com", "hunter22").await.unwrap();

        let a = first.find_by_email("viewer@example.com").await.unwrap();
        let b = second.find_by_email("viewer@example.com").await.unwrap();
        assert!(a.password_hash.starts_with("$2"));
        assert!(!a.password_hash.contains("hunter22"));
        assert_ne!(a.password_hash, b.password_hash);
        assert!(second
            .verify_credentials("viewer@example.com", "hunter22")
            .await
            .is_some());
    }

    #[tokio::test]
    async fn rejects_invalid_accounts() {
        let store = UserStore::with_cost(4);
        assert!(matches!(
            store.create_user("no-at-sign", "longenough").await,
            Err(IdentityError::InvalidEmail(_))
        ));
        assert!(matches!(
            store.create_user("a@b.c", "short").await,
            Err(IdentityError::WeakPassword)
        ));
        store.create_user("a@b.c", "longenough").await.unwrap();
        assert!(matches!(
            store.create_user("A@B.C", "longenough").await,
            Err(IdentityError::DuplicateUser(_))
        ));
        assert!(matches!(
            store.add_to_role("a@b.c", "Critic").await,
            Err(IdentityError::UnknownRole(_))
        ));
    }
}
