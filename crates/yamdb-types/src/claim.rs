use std::{fmt::Display, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};

/// Role of a user account, stored as lowercase text.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid role")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

pub trait TimeLimited {
    fn set_validity(&mut self, issued: SystemTime, until: SystemTime);
    fn check_validity(&self) -> bool;
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Claims of the bearer access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiClaim {
    pub sub: String,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

impl ApiClaim {
    /// Claim for the user, validity is set when the token is issued
    pub fn new_expired(user_id: i64, username: impl Into<String>) -> Self {
        ApiClaim {
            sub: user_id.to_string(),
            username: username.into(),
            iat: 0,
            exp: 0,
            jti: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, issued: SystemTime, until: SystemTime) {
        self.iat = unix_secs(issued);
        self.exp = unix_secs(until);
    }

    fn check_validity(&self) -> bool {
        self.exp > unix_secs(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_role() {
        for role in Role::ALL {
            assert_eq!(role, role.as_str().parse::<Role>().unwrap());
        }
        assert_eq!(Role::default(), Role::User);
        assert_eq!("moderator", Role::Moderator.to_string());
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err, UnknownRole("superuser".into()));
        assert_eq!("\"superuser\" is not a valid role", err.to_string());
        let boxed: Box<dyn std::error::Error + Send + Sync> = err.into();
        assert!(boxed.source().is_none());
        assert!(Role::try_from("Admin".to_string()).is_err());
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let role: Role = serde_json::from_str("\"moderator\"").unwrap();
        assert_eq!(role, Role::Moderator);
    }

    #[test]
    fn test_claim() {
        let mut claim = ApiClaim::new_expired(42, "bob");
        assert_eq!(claim.user_id(), Some(42));
        assert!(!claim.check_validity());
        let now = SystemTime::now();
        claim.set_validity(now, now + Duration::from_secs(60));
        assert!(claim.check_validity());
        assert!(claim.iat < claim.exp);

        let other = ApiClaim::new_expired(42, "bob");
        assert_ne!(claim.jti, other.jti);
    }
}
