//! Registration payload validation.
//!
//! Field rule chains run in declared order (username, email, password) and
//! bail on the first failing rule of each chain, so an empty username is
//! reported as null, not also as wrongly sized. Only the email chain
//! touches the repository, and only once its format rules passed.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::catalog::MessageCatalog;
use crate::user::UserRepository;

pub const USERNAME_NULL: &str = "username_null";
pub const USERNAME_SIZE: &str = "username_size";
pub const EMAIL_NULL: &str = "email_null";
pub const EMAIL_INVALID: &str = "email_invalid";
pub const EMAIL_INUSE: &str = "email_inuse";
pub const PASSWORD_NULL: &str = "password_null";
pub const PASSWORD_SIZE: &str = "password_size";
pub const PASSWORD_PATTERN: &str = "password_pattern";

const USERNAME_MIN: usize = 4;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 6;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap()
});

/// Raw registration payload. Every field may be absent or null.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Payload that passed every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Per-field symbolic error codes, in declared field order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors(Vec<(&'static str, &'static str)>);

impl ValidationErrors {
    fn add(&mut self, field: &'static str, code: &'static str) {
        self.0.push((field, code));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(field, code)` pairs in declared field order.
    pub fn entries(&self) -> &[(&'static str, &'static str)] {
        &self.0
    }

    /// Resolve each code against the catalog, keeping field order.
    pub fn localize(
        &self,
        catalog: &MessageCatalog,
        locale: &str,
    ) -> LocalizedErrors {
        LocalizedErrors(
            self.0
                .iter()
                .map(|(field, code)| {
                    ((*field).to_owned(), catalog.resolve(code, locale))
                })
                .collect(),
        )
    }
}

// Serialized as a map so clients see `{field: code}` while iteration order
// stays the declared rule order, not alphabetical.
impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, code) in &self.0 {
            map.serialize_entry(field, code)?;
        }
        map.end()
    }
}

/// [`ValidationErrors`] with catalog-resolved messages.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedErrors(Vec<(String, String)>);

impl Serialize for LocalizedErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, message) in &self.0 {
            map.serialize_entry(field, message)?;
        }
        map.end()
    }
}

fn check_username(username: Option<&str>) -> Option<&'static str> {
    let username = username.unwrap_or_default();
    if username.is_empty() {
        return Some(USERNAME_NULL);
    }
    let length = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&length) {
        return Some(USERNAME_SIZE);
    }
    None
}

fn check_email_format(email: Option<&str>) -> Option<&'static str> {
    let email = email.unwrap_or_default();
    if email.is_empty() {
        return Some(EMAIL_NULL);
    }
    if !EMAIL.is_match(email) {
        return Some(EMAIL_INVALID);
    }
    None
}

fn check_password(password: Option<&str>) -> Option<&'static str> {
    let password = password.unwrap_or_default();
    if password.is_empty() {
        return Some(PASSWORD_NULL);
    }
    if password.chars().count() < PASSWORD_MIN {
        return Some(PASSWORD_SIZE);
    }
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if !(lower && upper && digit) {
        return Some(PASSWORD_PATTERN);
    }
    None
}

/// Validate a registration payload.
///
/// The uniqueness lookup queries every user, active or not: an abandoned,
/// never-activated registration keeps its email reserved. The database
/// unique constraint stays the authoritative guard against concurrent
/// registrations; this check only exists for early rejection.
pub async fn validate(
    data: &Registration,
    repo: &dyn UserRepository,
) -> crate::error::Result<ValidRegistration> {
    let username_code = check_username(data.username.as_deref());
    let password_code = check_password(data.password.as_deref());

    let email_code = match check_email_format(data.email.as_deref()) {
        Some(code) => Some(code),
        None => {
            let email = data.email.as_deref().unwrap_or_default();
            repo.find_by_email(email).await?.map(|_| EMAIL_INUSE)
        },
    };

    let mut errors = ValidationErrors::default();
    if let Some(code) = username_code {
        errors.add("username", code);
    }
    if let Some(code) = email_code {
        errors.add("email", code);
    }
    if let Some(code) = password_code {
        errors.add("password", code);
    }

    if !errors.is_empty() {
        return Err(errors.into());
    }

    Ok(ValidRegistration {
        username: data.username.clone().unwrap_or_default(),
        email: data.email.clone().unwrap_or_default(),
        password: data.password.clone().unwrap_or_default(),
    })
}
