use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root container for a tree of folders. Every library owns exactly one root
/// folder, created together with the library row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub time_zone: Tz,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation request for a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryAdd {
    pub name: String,
    pub description: Option<String>,
    pub time_zone: Tz,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Library {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Library {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            time_zone: row
                .try_get::<String, _>("time_zone")?
                .parse()
                .map_err(|e| sqlx::Error::Decode(format!("Invalid time zone: {}", e).into()))?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
