//! User model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// User roles. Librarian, IT staff and management count as library staff
/// and may administer loans, reservations and the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Reader,
    Librarian,
    ItStaff,
    Management,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Reader => "reader",
            UserRole::Librarian => "librarian",
            UserRole::ItStaff => "it_staff",
            UserRole::Management => "management",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(
            self,
            UserRole::Librarian | UserRole::ItStaff | UserRole::Management
        )
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reader" => Ok(UserRole::Reader),
            "librarian" => Ok(UserRole::Librarian),
            "it_staff" => Ok(UserRole::ItStaff),
            "management" => Ok(UserRole::Management),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

// SQLx conversion for UserRole (stored as VARCHAR)
impl sqlx::Type<Postgres> for UserRole {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for UserRole {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for UserRole {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// The authenticated caller of a lifecycle operation, extracted from JWT
/// claims. Every service operation that gates on ownership or role takes
/// one of these explicitly instead of reading ambient request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i32,
    pub role: UserRole,
}

impl Principal {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Library staff privileges required".to_string(),
            ))
        }
    }

    /// Owner of the given record, or any staff member
    pub fn require_owner_or_staff(&self, owner_id: i32) -> Result<(), AppError> {
        if self.id == owner_id || self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "You do not have permission to access this record".to_string(),
            ))
        }
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone_number: String,
    pub address: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Library-issued membership identifier, generated at account creation
    pub membership_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            role: self.role,
        }
    }
}

/// Abbreviated user for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub membership_id: String,
    pub is_active: bool,
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Option<UserRole>,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
    pub date_of_birth: Option<NaiveDate>,
}

/// Update user request (staff). Omitted fields keep their current value;
/// `date_of_birth` cannot be cleared once set.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(email)]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// User list query parameters
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct UserQuery {
    /// Search in username, first and last name
    pub name: Option<String>,
    pub role: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Generate a library membership identifier (e.g. MEM1A2B3C4D)
pub fn new_membership_id() -> String {
    let tail = uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("MEM{}", tail)
}

/// JWT claims for an authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.user_id,
            role: self.role,
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        self.principal().require_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [
            UserRole::Reader,
            UserRole::Librarian,
            UserRole::ItStaff,
            UserRole::Management,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn staff_roles() {
        assert!(!UserRole::Reader.is_staff());
        assert!(UserRole::Librarian.is_staff());
        assert!(UserRole::ItStaff.is_staff());
        assert!(UserRole::Management.is_staff());
    }

    #[test]
    fn owner_or_staff_check() {
        let reader = Principal {
            id: 7,
            role: UserRole::Reader,
        };
        assert!(reader.require_owner_or_staff(7).is_ok());
        assert!(reader.require_owner_or_staff(8).is_err());

        let librarian = Principal {
            id: 1,
            role: UserRole::Librarian,
        };
        assert!(librarian.require_owner_or_staff(8).is_ok());
    }

    #[test]
    fn membership_id_shape() {
        let id = new_membership_id();
        assert!(id.starts_with("MEM"));
        assert_eq!(id.len(), 11);
        assert!(id[3..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
