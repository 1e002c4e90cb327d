//! Field validation for request payloads.
//!
//! A handler runs every check it needs against one `Validator`, which records
//! failures in order. `finish` then surfaces the first recorded message, or
//! hands back the parsed values when nothing failed.

use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has(&self, message: &str) -> bool {
        self.errors.iter().any(|e| e.message == message)
    }

    pub fn fail(&mut self, field: &'static str, message: &'static str) {
        self.errors.push(FieldError { field, message });
    }

    /// Records `message` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &'static str, message: &'static str) -> bool {
        if !ok {
            self.fail(field, message);
        }
        ok
    }

    /// Present and non-blank. Returns the trimmed value.
    pub fn text<'a>(
        &mut self,
        value: Option<&'a str>,
        field: &'static str,
        message: &'static str,
    ) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.fail(field, message);
                None
            }
        }
    }

    /// A well-formed id.
    pub fn id(&mut self, value: Option<&str>, field: &'static str, message: &'static str) -> Option<Uuid> {
        match value.and_then(|v| v.trim().parse::<Uuid>().ok()) {
            Some(id) => Some(id),
            None => {
                self.fail(field, message);
                None
            }
        }
    }

    /// Absent is fine; present must be a well-formed id.
    pub fn optional_id(
        &mut self,
        value: Option<&str>,
        field: &'static str,
        message: &'static str,
    ) -> Option<Option<Uuid>> {
        match value {
            None => Some(None),
            Some(raw) => self.id(Some(raw), field, message).map(Some),
        }
    }

    /// Every entry must be a well-formed id. Duplicates are collapsed,
    /// first occurrence kept.
    pub fn ids(&mut self, values: &[String], field: &'static str, message: &'static str) -> Option<Vec<Uuid>> {
        let mut out: Vec<Uuid> = Vec::with_capacity(values.len());
        for raw in values {
            let id = self.id(Some(raw), field, message)?;
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Some(out)
    }

    /// Present, then shaped like an address. Returns the trimmed value.
    pub fn email<'a>(
        &mut self,
        value: Option<&'a str>,
        field: &'static str,
        missing: &'static str,
        invalid: &'static str,
    ) -> Option<&'a str> {
        let email = self.text(value, field, missing)?;
        if self.check(looks_like_email(email), field, invalid) {
            Some(email)
        } else {
            None
        }
    }

    /// Absent is fine; present must parse as an integer.
    pub fn optional_int(
        &mut self,
        value: Option<&str>,
        field: &'static str,
        message: &'static str,
    ) -> Option<Option<i64>> {
        match value {
            None => Some(None),
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) => Some(Some(n)),
                Err(_) => {
                    self.fail(field, message);
                    None
                }
            },
        }
    }

    /// Fails with the first recorded message, otherwise yields `parsed`.
    pub fn finish<T>(self, parsed: Option<T>) -> Result<T, ApiError> {
        if let Some(first) = self.errors.first() {
            debug!(
                "Validation failed on `{}` ({} errors): {}",
                first.field,
                self.errors.len(),
                first.message
            );
            return Err(ApiError::validation(first.message));
        }
        parsed.ok_or_else(|| ApiError::validation("Invalid request"))
    }
}

pub fn looks_like_email(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
