use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

pub const EMAIL_MIN: usize = 8;
pub const EMAIL_MAX: usize = 255;
pub const PASSWORD_MIN: usize = 5;
pub const PASSWORD_MAX: usize = 1024;
pub const EMAIL_LOCAL_MAX: usize = 64;

/// Input field a validation error points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
    CurrentPassword,
    NewPassword,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Password => "password",
            Field::CurrentPassword => "current_password",
            Field::NewPassword => "new_password",
        }
    }
}

/// Constraint that was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Base,
    Required,
    Empty,
    Min(usize),
    Max(usize),
    Email,
}

impl ValidationKind {
    pub fn code(self) -> &'static str {
        match self {
            ValidationKind::Base => "string.base",
            ValidationKind::Required => "any.required",
            ValidationKind::Empty => "string.empty",
            ValidationKind::Min(_) => "string.min",
            ValidationKind::Max(_) => "string.max",
            ValidationKind::Email => "string.email",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: Field,
    pub kind: ValidationKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: Field, kind: ValidationKind) -> Self {
        let name = field.name();
        let message = match kind {
            ValidationKind::Base => format!("\"{name}\" must be a string"),
            ValidationKind::Required => format!("\"{name}\" is required"),
            ValidationKind::Empty => format!("\"{name}\" is not allowed to be empty"),
            ValidationKind::Min(n) => {
                format!("\"{name}\" length must be at least {n} characters long")
            }
            ValidationKind::Max(n) => {
                format!("\"{name}\" length must be less than or equal to {n} characters long")
            }
            ValidationKind::Email => format!("\"{name}\" must be a valid email"),
        };
        Self {
            field,
            kind,
            message,
        }
    }
}

/// Email/password pair that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.(?:[A-Za-z]{2,63}|xn--[A-Za-z0-9-]{1,59})$"
        )
        .unwrap();
    }
    let Some((local, _domain)) = email.split_once('@') else {
        return false;
    };
    if local.len() > EMAIL_LOCAL_MAX {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || email.contains("..") {
        return false;
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lower-cases an email before it is validated or looked up.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_length(
    field: Field,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let value = value.ok_or_else(|| ValidationError::new(field, ValidationKind::Required))?;
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::new(field, ValidationKind::Empty));
    }
    if len < min {
        return Err(ValidationError::new(field, ValidationKind::Min(min)));
    }
    if len > max {
        return Err(ValidationError::new(field, ValidationKind::Max(max)));
    }
    Ok(())
}

/// Reads a raw JSON body field that must be a string when present.
pub fn string_field(field: Field, value: Option<&Value>) -> Result<Option<&str>, ValidationError> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ValidationError::new(field, ValidationKind::Base)),
    }
}

/// Checks a password alone; used when the email is already known.
pub fn validate_password(field: Field, password: Option<&str>) -> Result<(), ValidationError> {
    check_length(field, password, PASSWORD_MIN, PASSWORD_MAX)
}

/// Normalizes and checks an email, returning the normalized form.
pub fn validate_email(email: Option<&str>) -> Result<String, ValidationError> {
    let email = email.map(normalize_email);
    check_length(Field::Email, email.as_deref(), EMAIL_MIN, EMAIL_MAX)?;
    let email = email.unwrap_or_default();
    if !is_valid_email(&email) {
        return Err(ValidationError::new(Field::Email, ValidationKind::Email));
    }
    Ok(email)
}

/// Validates a login or registration body. The first violated constraint wins,
/// email before password.
pub fn validate_credentials(
    email: Option<&str>,
    password: Option<&str>,
) -> Result<Credentials, ValidationError> {
    let email = validate_email(email)?;
    validate_password(Field::Password, password)?;

    Ok(Credentials {
        email,
        password: password.unwrap_or_default().to_owned(),
    })
}

/// Same as [`validate_credentials`] but over raw JSON values, so a non-string
/// field is reported on that field instead of failing the whole body.
pub fn validate_body(
    email: Option<&Value>,
    password: Option<&Value>,
) -> Result<Credentials, ValidationError> {
    let email = string_field(Field::Email, email)?;
    validate_email(email)?;
    let password = string_field(Field::Password, password)?;
    validate_credentials(email, password)
}
