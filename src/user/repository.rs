//! Handle database requests.
//!
//! Storage sits behind the [`UserRepository`] trait so engines and test
//! doubles are interchangeable without touching workflow logic. The
//! tentative-write primitive is [`PendingRegistration`]: an insert that is
//! invisible to other requests until `commit`, and discardable through
//! `rollback`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::Result;
use crate::user::{User, UserProfile};

/// Columns of a not-yet-persisted registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, never the original secret.
    pub password: String,
    pub activation_token: String,
}

/// Tentative insert awaiting confirmation.
#[async_trait]
pub trait PendingRegistration: Send {
    /// The row as it will exist once committed.
    fn user(&self) -> &User;

    /// Make the insert durable.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard the insert. The row must not be observable afterward.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Capability set the workflows need from a storage engine.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert an inactive user inside an uncommitted transaction scope.
    async fn insert_pending(
        &self,
        user: NewUser,
    ) -> Result<Box<dyn PendingRegistration>>;

    /// Look up any user, active or not, by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Look up the user holding an unconsumed activation token.
    async fn find_by_activation_token(
        &self,
        token: &str,
    ) -> Result<Option<User>>;

    /// Flip `inactive` off and clear the activation token.
    async fn activate(&self, id: i64) -> Result<()>;

    async fn count_active(&self) -> Result<i64>;

    async fn list_active(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UserProfile>>;

    async fn find_active_by_id(&self, id: i64) -> Result<Option<UserProfile>>;
}

/// [`UserRepository`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Create a new [`PostgresRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct PgPending {
    tx: Transaction<'static, Postgres>,
    user: User,
}

#[async_trait]
impl PendingRegistration for PgPending {
    fn user(&self) -> &User {
        &self.user
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn insert_pending(
        &self,
        user: NewUser,
    ) -> Result<Box<dyn PendingRegistration>> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, email, password, inactive, activation_token)
                VALUES ($1, $2, $3, TRUE, $4)
                RETURNING id, username, email, password, inactive, activation_token, created_at"#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.activation_token)
        .fetch_one(&mut *tx)
        .await?;

        Ok(Box::new(PgPending { tx, user }))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, password, inactive, activation_token, created_at
                FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_activation_token(
        &self,
        token: &str,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, password, inactive, activation_token, created_at
                FROM users WHERE activation_token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn activate(&self, id: i64) -> Result<()> {
        sqlx::query(
            r#"UPDATE users SET inactive = FALSE, activation_token = NULL WHERE id = $1"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_active(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM users WHERE NOT inactive"#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_active(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UserProfile>> {
        let profiles = sqlx::query_as::<_, UserProfile>(
            r#"SELECT id, username, email FROM users
                WHERE NOT inactive ORDER BY id OFFSET $1 LIMIT $2"#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn find_active_by_id(&self, id: i64) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"SELECT id, username, email FROM users
                WHERE id = $1 AND NOT inactive"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}

#[cfg(test)]
pub use memory::MemoryRepository;

#[cfg(test)]
mod memory {
    //! In-memory [`UserRepository`] for tests.

    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default, Clone)]
    pub struct MemoryRepository {
        rows: Arc<Mutex<Vec<User>>>,
        next_id: Arc<AtomicI64>,
    }

    impl MemoryRepository {
        fn allocate_id(&self) -> i64 {
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1
        }

        /// Snapshot of every persisted row.
        pub fn rows(&self) -> Vec<User> {
            self.rows.lock().unwrap().clone()
        }

        /// Persist a user directly, bypassing the registration workflow.
        pub fn seed(&self, username: &str, email: &str, inactive: bool) -> User {
            let user = User {
                id: self.allocate_id(),
                username: username.to_owned(),
                email: email.to_owned(),
                password: "$argon2id$test".to_owned(),
                inactive,
                activation_token: inactive
                    .then(crate::crypto::activation_token),
                created_at: chrono::Utc::now(),
            };
            self.rows.lock().unwrap().push(user.clone());
            user
        }
    }

    struct MemoryPending {
        rows: Arc<Mutex<Vec<User>>>,
        user: User,
    }

    #[async_trait]
    impl PendingRegistration for MemoryPending {
        fn user(&self) -> &User {
            &self.user
        }

        async fn commit(self: Box<Self>) -> Result<()> {
            self.rows.lock().unwrap().push(self.user);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepository for MemoryRepository {
        async fn insert_pending(
            &self,
            user: NewUser,
        ) -> Result<Box<dyn PendingRegistration>> {
            let user = User {
                id: self.allocate_id(),
                username: user.username,
                email: user.email,
                password: user.password,
                inactive: true,
                activation_token: Some(user.activation_token),
                created_at: chrono::Utc::now(),
            };

            Ok(Box::new(MemoryPending {
                rows: Arc::clone(&self.rows),
                user,
            }))
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|user| user.email == email)
                .cloned())
        }

        async fn find_by_activation_token(
            &self,
            token: &str,
        ) -> Result<Option<User>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|user| user.activation_token.as_deref() == Some(token))
                .cloned())
        }

        async fn activate(&self, id: i64) -> Result<()> {
            if let Some(user) = self
                .rows
                .lock()
                .unwrap()
                .iter_mut()
                .find(|user| user.id == id)
            {
                user.inactive = false;
                user.activation_token = None;
            }
            Ok(())
        }

        async fn count_active(&self) -> Result<i64> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|user| !user.inactive)
                .count() as i64)
        }

        async fn list_active(
            &self,
            offset: i64,
            limit: i64,
        ) -> Result<Vec<UserProfile>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|user| !user.inactive)
                .skip(offset as usize)
                .take(limit as usize)
                .map(|user| UserProfile {
                    id: user.id,
                    username: user.username.clone(),
                    email: user.email.clone(),
                })
                .collect())
        }

        async fn find_active_by_id(
            &self,
            id: i64,
        ) -> Result<Option<UserProfile>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|user| user.id == id && !user.inactive)
                .map(|user| UserProfile {
                    id: user.id,
                    username: user.username.clone(),
                    email: user.email.clone(),
                }))
        }
    }
}
