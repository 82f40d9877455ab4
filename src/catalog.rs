//! Localized message catalog.
//!
//! The core only emits symbolic codes; every user-facing sentence lives
//! here and is resolved against the locale of the request.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};

pub const DEFAULT_LOCALE: &str = "en";

const EN: &[(&str, &str)] = &[
    ("validation_failure", "Validation failure"),
    ("username_null", "Username cannot be null"),
    ("username_size", "Username must have between 4 and 32 characters"),
    ("email_null", "Email cannot be null"),
    ("email_invalid", "Email is not valid"),
    ("email_inuse", "Email already in use"),
    ("password_null", "Password cannot be null"),
    ("password_size", "Password must have at least 6 characters"),
    (
        "password_pattern",
        "Password must have at least 1 uppercase letter, 1 lowercase letter and 1 number",
    ),
    ("user_create_success", "User created successfully"),
    ("email_failure", "Email failure"),
    ("account_activation_success", "Account activated successfully"),
    (
        "account_activation_failure",
        "This account is either already active or the token is invalid",
    ),
    ("user_not_found", "User not found"),
    ("invalid_body", "Request body is not valid JSON"),
    ("internal_error", "Internal server error"),
];

const ES: &[(&str, &str)] = &[
    ("validation_failure", "Fallo de validación"),
    ("username_null", "El usuario no puede ser nulo"),
    ("username_size", "El usuario debe tener entre 4 y 32 caracteres"),
    ("email_null", "El correo no puede ser nulo"),
    ("email_invalid", "El correo no es válido"),
    ("email_inuse", "El correo ya está en uso"),
    ("password_null", "La contraseña no puede ser nula"),
    ("password_size", "La contraseña debe tener al menos 6 caracteres"),
    (
        "password_pattern",
        "La contraseña debe tener al menos 1 mayúscula, 1 minúscula y 1 número",
    ),
    ("user_create_success", "Usuario creado con éxito"),
    ("email_failure", "Fallo en el envío del correo"),
    ("account_activation_success", "Cuenta activada con éxito"),
    (
        "account_activation_failure",
        "Esta cuenta ya está activa o el token es inválido",
    ),
    ("user_not_found", "Usuario no encontrado"),
    ("invalid_body", "El cuerpo de la petición no es JSON válido"),
    ("internal_error", "Error interno del servidor"),
];

/// Symbolic code to localized text resolver.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    tables: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let mut tables = HashMap::new();
        tables.insert("en", EN.iter().copied().collect());
        tables.insert("es", ES.iter().copied().collect());
        Self { tables }
    }
}

impl MessageCatalog {
    /// Resolve a symbolic `code` for a `locale`.
    ///
    /// Falls back to the default locale, then to the code itself so an
    /// unmapped code never turns into a panic or an empty message.
    pub fn resolve(&self, code: &str, locale: &str) -> String {
        self.tables
            .get(locale)
            .and_then(|table| table.get(code))
            .or_else(|| {
                self.tables
                    .get(DEFAULT_LOCALE)
                    .and_then(|table| table.get(code))
            })
            .map(|message| (*message).to_owned())
            .unwrap_or_else(|| code.to_owned())
    }
}

/// Request locale, extracted from the `Accept-Language` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Locale {
    /// Primary subtag of the first `Accept-Language` entry.
    ///
    /// `es-MX,en;q=0.8` resolves to `es`. Missing or unreadable headers
    /// resolve to the default locale.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let locale = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|tag| tag.split(['-', ';']).next())
            .map(|subtag| subtag.trim().to_ascii_lowercase())
            .filter(|subtag| !subtag.is_empty());

        Self(locale.unwrap_or_else(|| DEFAULT_LOCALE.to_owned()))
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_resolve_with_fallbacks() {
        let catalog = MessageCatalog::default();
        assert_eq!(
            catalog.resolve("user_not_found", "es"),
            "Usuario no encontrado"
        );
        // unknown locale falls back to english.
        assert_eq!(catalog.resolve("user_not_found", "fr"), "User not found");
        // unknown code falls back to the code itself.
        assert_eq!(catalog.resolve("missing_code", "en"), "missing_code");
    }

    #[test]
    fn test_locale_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(Locale::from_headers(&headers).0, "en");

        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("es-MX,en;q=0.8"),
        );
        assert_eq!(Locale::from_headers(&headers).0, "es");

        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("EN-US"),
        );
        assert_eq!(Locale::from_headers(&headers).0, "en");
    }
}
