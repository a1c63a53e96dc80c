use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Username reserved for the own profile endpoint
pub const RESERVED_USERNAME: &str = "me";

#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct ValidEmail(#[garde(email, length(max = 254))] String);

impl FromStr for ValidEmail {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let email = ValidEmail(s.to_string());
        email.validate()?;
        Ok(email)
    }
}

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ValidEmail> for String {
    fn from(value: ValidEmail) -> Self {
        value.0
    }
}

/// Message of a missing mandatory field
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Mandatory field modelled as `Option`, so that every missing field is reported
pub fn is_present<T, C>(value: &Option<T>, _ctx: &C) -> garde::Result {
    match value {
        Some(_) => Ok(()),
        None => Err(garde::Error::new(REQUIRED_MESSAGE)),
    }
}

/// Letters, digits and `@.+-_`, at most 150 characters, not `me`
pub fn validate_username<C>(value: &str, _ctx: &C) -> garde::Result {
    if value.is_empty() {
        return Err(garde::Error::new("username must not be empty"));
    }
    if value.chars().count() > 150 {
        return Err(garde::Error::new(
            "username must have at most 150 characters",
        ));
    }
    if value == RESERVED_USERNAME {
        return Err(garde::Error::new(format!(
            "username \"{RESERVED_USERNAME}\" is reserved"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        return Err(garde::Error::new(
            "username may contain only letters, digits and @/./+/-/_ characters",
        ));
    }
    Ok(())
}

/// ASCII letters, digits, `-` and `_`
pub fn validate_slug<C>(value: &str, _ctx: &C) -> garde::Result {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(garde::Error::new(
            "slug may contain only latin letters, digits, hyphens and underscores",
        ))
    }
}

/// Allowed range of title years, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        self.min <= year && year <= self.max
    }
}

pub fn validate_year(value: &i32, range: &YearRange) -> garde::Result {
    if range.contains(*value) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "year must be in range {}-{}",
            range.min, range.max
        )))
    }
}

/// For partial updates, use with `#[serde(default, deserialize_with = "nullable")]`:
/// absent field is `None`, explicit `null` is `Some(None)`
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
