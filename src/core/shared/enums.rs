//! Database enum types.
//!
//! Roles, lesson difficulties and course categories are stored as short text
//! slugs so the schema stays readable from `psql`; these enums give them type
//! safety in Rust and validate values coming back from the database.

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements the text round-trip shared by every slug enum.
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => ($slug:literal, $label:literal)),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $slug),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($slug => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ToSql<Text, Pg> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(serialize::IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $ty {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let value = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                value.parse().map_err(|e: UnknownVariant| e.into())
            }
        }
    };
}

// ============================================================================
// ROLES
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

text_enum!(Role, "role", {
    Student => ("student", "Student"),
    Teacher => ("teacher", "Teacher"),
    Admin => ("admin", "Admin"),
});

impl Default for Role {
    fn default() -> Self {
        Self::Student
    }
}

impl Role {
    /// Roles a visitor may pick on the public registration form.
    pub const SELF_REGISTERED: &'static [Role] = &[Role::Student, Role::Teacher];

    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Page a freshly logged-in user lands on.
    pub fn landing_path(&self) -> &'static str {
        use crate::core::urls::PageUrls;
        match self {
            Self::Student => PageUrls::STUDENT_DASHBOARD,
            Self::Teacher => PageUrls::TEACHER_DASHBOARD,
            Self::Admin => PageUrls::CERTIFICATE_ADMIN,
        }
    }
}

// ============================================================================
// LESSON DIFFICULTY
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

text_enum!(Difficulty, "difficulty", {
    Beginner => ("beginner", "Beginner"),
    Intermediate => ("intermediate", "Intermediate"),
    Advanced => ("advanced", "Advanced"),
});

impl Default for Difficulty {
    fn default() -> Self {
        Self::Beginner
    }
}

// ============================================================================
// COURSE CATEGORY
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    WebDevelopment,
    MobileDevelopment,
    DataScience,
    ArtificialIntelligence,
    CloudComputing,
    Cybersecurity,
    Design,
    Business,
    Other,
}

text_enum!(Category, "category", {
    WebDevelopment => ("web-development", "Web Development"),
    MobileDevelopment => ("mobile-development", "Mobile Development"),
    DataScience => ("data-science", "Data Science"),
    ArtificialIntelligence => ("artificial-intelligence", "Artificial Intelligence"),
    CloudComputing => ("cloud-computing", "Cloud Computing"),
    Cybersecurity => ("cybersecurity", "Cybersecurity"),
    Design => ("design", "Design"),
    Business => ("business", "Business"),
    Other => ("other", "Other"),
});

impl Default for Category {
    fn default() -> Self {
        Self::Other
    }
}
