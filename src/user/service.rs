//! User manager: registration, activation and the public directory.

use std::sync::Arc;

use crate::crypto::{self, Crypto};
use crate::error::{Result, ServerError};
use crate::mail::Notifier;
use crate::pagination::PagePlan;
use crate::user::{NewUser, User, UserPage, UserProfile, UserRepository};
use crate::user::validate::ValidRegistration;

/// User manager.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    crypto: Arc<Crypto>,
    notifier: Arc<dyn Notifier>,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(
        repo: Arc<dyn UserRepository>,
        crypto: Arc<Crypto>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repo,
            crypto,
            notifier,
        }
    }

    /// Register a validated payload.
    ///
    /// The insert stays tentative while the activation mail is dispatched:
    /// commit only on a successful dispatch report, rollback otherwise.
    /// This is a compensating transaction, not two-phase commit — a
    /// dispatch that partially succeeded before reporting failure may
    /// still have sent mail for a row that no longer exists. The guarantee
    /// is "no persisted user without a successful dispatch report".
    pub async fn register(&self, data: ValidRegistration) -> Result<User> {
        let password = self.crypto.pwd.hash_password(&data.password)?;
        let token = crypto::activation_token();

        let pending = self
            .repo
            .insert_pending(NewUser {
                username: data.username,
                email: data.email,
                password,
                activation_token: token.clone(),
            })
            .await?;
        let user = pending.user().clone();

        match self
            .notifier
            .send_activation(&user.email, &user.username, &token)
            .await
        {
            Ok(()) => {
                pending.commit().await?;
                tracing::info!(user_id = user.id, "user registered");
                Ok(user)
            },
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "activation mail dispatch failed, registration rolled back"
                );
                pending.rollback().await?;
                Err(ServerError::NotificationDispatch)
            },
        }
    }

    /// Redeem an activation token.
    ///
    /// A consumed token no longer matches any row, so re-submission fails
    /// the same way with no state change.
    pub async fn activate(&self, token: &str) -> Result<User> {
        let Some(user) = self.repo.find_by_activation_token(token).await?
        else {
            return Err(ServerError::InvalidActivationToken);
        };

        self.repo.activate(user.id).await?;
        tracing::info!(user_id = user.id, "account activated");

        Ok(user)
    }

    /// One page of the active-user directory.
    pub async fn directory(&self, plan: &PagePlan) -> Result<UserPage> {
        let total = self.repo.count_active().await?;
        let content =
            self.repo.list_active(plan.offset(), plan.limit()).await?;

        let total_pages = if total == 0 {
            0
        } else {
            (total + plan.size - 1) / plan.size
        };

        Ok(UserPage {
            content,
            page: plan.page,
            size: plan.size,
            total_pages,
        })
    }

    /// Single active user, privacy-filtered.
    pub async fn profile(&self, id: i64) -> Result<UserProfile> {
        self.repo
            .find_active_by_id(id)
            .await?
            .ok_or(ServerError::UserNotFound)
    }
}
