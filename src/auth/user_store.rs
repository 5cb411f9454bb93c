//! Account storage and credential checks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::db::Db;
use crate::db::schema::{UserCreate, UserRecord};
use crate::error::{ApiError, ApiResult};
use crate::types::{Role, UserId};

/// Answer for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid Credentials";

const MIN_NAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 50;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .unwrap()
});

/// Registration input, as received from the client.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

/// Account store for database operations.
#[derive(Clone)]
pub struct UserStore {
    db: Db,
    bcrypt_cost: u32,
}

impl UserStore {
    /// Create a new user store hashing with the given bcrypt cost.
    pub fn new(db: Db, bcrypt_cost: u32) -> Self {
        Self { db, bcrypt_cost }
    }

    /// Get an account by email. The lookup is case-insensitive.
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<UserRecord>> {
        let email = normalize_email(email);

        let mut res = self
            .db
            .query("SELECT * FROM user WHERE email = $email LIMIT 1")
            .bind(("email", email))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Get an account by its identifier.
    pub async fn find_by_id(&self, user_id: &UserId) -> ApiResult<Option<UserRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM user WHERE userId = $user_id LIMIT 1")
            .bind(("user_id", user_id.clone()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Number of registered accounts.
    pub async fn count(&self) -> ApiResult<u64> {
        let mut res = self
            .db
            .query("SELECT count() FROM user GROUP ALL")
            .await?;

        let rows: Vec<CountRow> = res.take(0)?;
        Ok(rows.into_iter().next().map(|row| row.count).unwrap_or(0))
    }

    /// Register a new account.
    ///
    /// The first account ever created becomes an admin. An email that is
    /// already taken fails with [`ApiError::DuplicateKey`]; the unique index
    /// backs this up when two registrations race.
    pub async fn create(&self, new_user: NewUser) -> ApiResult<UserRecord> {
        let name = validate_name(&new_user.name)?;
        let email = validate_email(&new_user.email)?;
        validate_password(&new_user.password)?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(duplicate_email());
        }

        let role = if self.count().await? == 0 {
            Role::Admin
        } else {
            Role::User
        };

        let create = UserCreate {
            user_id: UserId::generate(),
            name,
            email,
            password_hash: hash_password(&new_user.password, self.bcrypt_cost).await?,
            role,
        };

        let mut res = self
            .db
            .query("CREATE user CONTENT $data")
            .bind(("data", create))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        let user = users
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("Failed to create user".to_string()))?;

        info!(user_id = %user.user_id, role = %user.role, "Registered user");
        Ok(user)
    }

    /// Check a candidate password against a stored hash.
    pub async fn compare_password(&self, candidate: &str, password_hash: &str) -> ApiResult<bool> {
        verify_password(candidate, password_hash).await
    }

    /// Resolve an email/password pair to an account.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> ApiResult<UserRecord> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::BadRequest(
                "Please provide email and password".to_string(),
            ));
        }

        let Some(user) = self.find_by_email(email).await? else {
            debug!("Login for unknown email");
            return Err(invalid_credentials());
        };

        if !self.compare_password(password, &user.password_hash).await? {
            debug!(user_id = %user.user_id, "Login with wrong password");
            return Err(invalid_credentials());
        }

        Ok(user)
    }

    /// Replace the account's password. The old hash is overwritten in the
    /// same write.
    pub async fn update_password(&self, user: &UserRecord, new_password: &str) -> ApiResult<UserRecord> {
        validate_password(new_password)?;
        let password_hash = hash_password(new_password, self.bcrypt_cost).await?;

        let mut res = self
            .db
            .query("UPDATE user SET password = $password WHERE userId = $user_id RETURN AFTER")
            .bind(("password", password_hash))
            .bind(("user_id", user.user_id.clone()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        let updated = users.into_iter().next().ok_or_else(|| user_not_found(&user.user_id))?;

        info!(user_id = %updated.user_id, "Password changed");
        Ok(updated)
    }

    /// Change name and email. The password hash is left alone.
    pub async fn update_profile(&self, user_id: &UserId, name: &str, email: &str) -> ApiResult<UserRecord> {
        let name = validate_name(name)?;
        let email = validate_email(email)?;

        if let Some(existing) = self.find_by_email(&email).await? {
            if existing.user_id != *user_id {
                return Err(duplicate_email());
            }
        }

        let mut res = self
            .db
            .query("UPDATE user SET name = $name, email = $email WHERE userId = $user_id RETURN AFTER")
            .bind(("name", name))
            .bind(("email", email))
            .bind(("user_id", user_id.clone()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users.into_iter().next().ok_or_else(|| user_not_found(user_id))
    }

    /// All accounts holding `role`.
    pub async fn list_by_role(&self, role: Role) -> ApiResult<Vec<UserRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM user WHERE role = $role ORDER BY createdAt ASC")
            .bind(("role", role))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Please provide name".to_string()));
    }

    let len = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
        return Err(ApiError::BadRequest(format!(
            "Name must be between {} and {} characters",
            MIN_NAME_LENGTH, MAX_NAME_LENGTH
        )));
    }

    Ok(name.to_string())
}

fn validate_email(email: &str) -> ApiResult<String> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ApiError::BadRequest("Please provide email".to_string()));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(ApiError::BadRequest("Please provide valid email".to_string()));
    }
    Ok(email)
}

fn duplicate_email() -> ApiError {
    ApiError::DuplicateKey(
        "Duplicate value entered for email field, please choose another value".to_string(),
    )
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthenticated(INVALID_CREDENTIALS_MESSAGE.to_string())
}

fn user_not_found(user_id: &UserId) -> ApiError {
    ApiError::NotFound(format!("No user with id : {}", user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::AuthConfig;
    use crate::auth::token::{ClaimSet, TokenCodec};
    use crate::db::connection::setup_test_db;

    const TEST_COST: u32 = 4;

    async fn store() -> UserStore {
        UserStore::new(setup_test_db().await, TEST_COST)
    }

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: "password1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_user_is_admin() {
        let store = store().await;
        assert_eq!(store.count().await.unwrap(), 0);

        let ann = store.create(new_user("Ann", "a@x.com")).await.unwrap();
        let bob = store.create(new_user("Bob", "b@x.com")).await.unwrap();

        assert_eq!(ann.role, Role::Admin);
        assert_eq!(bob.role, Role::User);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_create_hashes_and_normalizes() {
        let store = store().await;
        let user = store.create(new_user("  Ann  ", " Ann@X.com ")).await.unwrap();

        assert_eq!(user.name, "Ann");
        assert_eq!(user.email, "ann@x.com");
        assert_ne!(user.password_hash, "password1");
        assert!(user.created_at.is_some());

        let found = store.find_by_email("ANN@x.com").await.unwrap().unwrap();
        assert_eq!(found.user_id, user.user_id);

        let found = store.find_by_id(&user.user_id).await.unwrap().unwrap();
        assert_eq!(found.email, "ann@x.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_creates_nothing() {
        let store = store().await;
        store.create(new_user("Ann", "a@x.com")).await.unwrap();

        let err = store.create(new_user("Imposter", "A@x.com")).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateKey(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unique_index_backs_up_precheck() {
        let store = store().await;
        let ann = store.create(new_user("Ann", "a@x.com")).await.unwrap();

        let clash = UserCreate {
            user_id: UserId::generate(),
            name: "Racer".to_string(),
            email: ann.email.clone(),
            password_hash: ann.password_hash.clone(),
            role: Role::User,
        };
        let err: ApiError = store
            .db
            .query("CREATE user CONTENT $data")
            .bind(("data", clash))
            .await
            .unwrap()
            .check()
            .unwrap_err()
            .into();

        assert_eq!(
            err,
            ApiError::DuplicateKey(
                "Duplicate value entered for email field, please choose another value".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_create_validation() {
        let store = store().await;

        let err = store.create(new_user("Al", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = store.create(new_user("Ann", "not-an-email")).await.unwrap_err();
        assert_eq!(err, ApiError::BadRequest("Please provide valid email".to_string()));

        let err = store
            .create(NewUser {
                password: "short".to_string(),
                ..new_user("Ann", "a@x.com")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_authenticate_does_not_leak_cause() {
        let store = store().await;
        store.create(new_user("Ann", "a@x.com")).await.unwrap();

        let user = store.authenticate("a@x.com", "password1").await.unwrap();
        assert_eq!(user.name, "Ann");

        let wrong_password = store.authenticate("a@x.com", "password2").await.unwrap_err();
        let unknown_user = store.authenticate("nobody@x.com", "password1").await.unwrap_err();
        assert_eq!(wrong_password, unknown_user);
        assert_eq!(wrong_password, invalid_credentials());

        let err = store.authenticate("", "password1").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_password_change_swaps_hashes() {
        let store = store().await;
        let user = store.create(new_user("Ann", "a@x.com")).await.unwrap();

        assert!(store.compare_password("password1", &user.password_hash).await.unwrap());
        assert!(!store.compare_password("password2", &user.password_hash).await.unwrap());

        let updated = store.update_password(&user, "password2").await.unwrap();
        assert_ne!(updated.password_hash, user.password_hash);

        let reloaded = store.find_by_id(&user.user_id).await.unwrap().unwrap();
        assert!(!store.compare_password("password1", &reloaded.password_hash).await.unwrap());
        assert!(store.compare_password("password2", &reloaded.password_hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_profile_keeps_password() {
        let store = store().await;
        let ann = store.create(new_user("Ann", "a@x.com")).await.unwrap();
        store.create(new_user("Bob", "b@x.com")).await.unwrap();

        let updated = store
            .update_profile(&ann.user_id, "Annie", "annie@x.com")
            .await
            .unwrap();
        assert_eq!(updated.name, "Annie");
        assert_eq!(updated.email, "annie@x.com");
        assert_eq!(updated.password_hash, ann.password_hash);
        assert_eq!(updated.role, Role::Admin);

        // Keeping one's own email is fine, taking someone else's is not
        assert!(store.update_profile(&ann.user_id, "Ann", "annie@x.com").await.is_ok());
        let err = store
            .update_profile(&ann.user_id, "Ann", "b@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateKey(_)));

        let err = store
            .update_profile(&UserId::new("missing"), "Ann", "new@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_by_role() {
        let store = store().await;
        store.create(new_user("Ann", "a@x.com")).await.unwrap();
        store.create(new_user("Bob", "b@x.com")).await.unwrap();
        store.create(new_user("Cat", "c@x.com")).await.unwrap();

        let users = store.list_by_role(Role::User).await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Cat"]);

        let admins = store.list_by_role(Role::Admin).await.unwrap();
        assert_eq!(admins.len(), 1);
    }

    #[tokio::test]
    async fn test_issued_token_matches_registered_identity() {
        let store = store().await;
        let codec = TokenCodec::new(&AuthConfig::with_bearer("secret")).unwrap();

        for (name, email) in [("Ann", "a@x.com"), ("Bob", "b@x.com")] {
            let user = store.create(new_user(name, email)).await.unwrap();
            let token = codec.issue(&ClaimSet::for_user(&user)).unwrap();
            let claims = codec.verify(&token).unwrap();

            assert_eq!(claims.user_id, user.user_id);
            assert_eq!(claims.role, user.role);
        }
    }
}
