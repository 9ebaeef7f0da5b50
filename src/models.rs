use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Store models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::stores)]
pub struct Store {
    pub id: i32,
    pub name: String,
    pub location: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::stores)]
pub struct NewStore {
    pub name: String,
    pub location: String,
}

// Department models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::departments)]
pub struct Department {
    pub id: i32,
    pub name: String,
    pub store_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::departments)]
pub struct NewDepartment {
    pub name: String,
    pub store_id: i32,
}

// Stand models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::stands)]
pub struct Stand {
    pub id: i32,
    pub name: String,
    pub department_id: i32,
    pub display_time: i32,
    pub transition_animation: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::stands)]
pub struct NewStand {
    pub name: String,
    pub department_id: i32,
    pub display_time: i32,
    pub transition_animation: String,
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::stands)]
pub struct UpdateStand {
    pub name: Option<String>,
    pub display_time: Option<i32>,
    pub transition_animation: Option<String>,
}

// Material models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::materials)]
pub struct Material {
    pub id: i32,
    pub stand_id: i32,
    pub material_type: String,
    pub file_path: String,
    pub display_order: i32,
    pub status: String,
    pub duration: i32,
    pub expires_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Material {
    /// Soft status plus the lazy expiry check. Expiry here only hides the
    /// material from playlists; hard deletion is the cleanup job's business.
    pub fn is_displayable(&self, now: NaiveDateTime) -> bool {
        if self.status != "active" {
            return false;
        }
        match self.expires_at {
            Some(expiry) => expiry >= now,
            None => true,
        }
    }
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::materials)]
pub struct NewMaterial {
    pub stand_id: i32,
    pub material_type: String,
    pub file_path: String,
    pub display_order: i32,
    pub status: String,
    pub duration: i32,
    pub expires_at: Option<NaiveDateTime>,
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::materials)]
pub struct UpdateMaterial {
    pub material_type: Option<String>,
    pub file_path: Option<String>,
    pub status: Option<String>,
    pub duration: Option<i32>,
    #[serde(default, with = "double_option")]
    pub expires_at: Option<Option<NaiveDateTime>>,
}

// Distinguishes "field absent" from "field explicitly null" so updates can
// clear a nullable column.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}

/// Closed set of recurrence classes. Stored as text in SQLite; anything that
/// fails to parse is treated by the evaluator as never-applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatType {
    None,
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl RepeatType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(RepeatType::None),
            "daily" => Some(RepeatType::Daily),
            "weekly" => Some(RepeatType::Weekly),
            "monthly" => Some(RepeatType::Monthly),
            "custom" => Some(RepeatType::Custom),
            _ => None,
        }
    }
}

// Emission schedule models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::emission_schedules)]
pub struct EmissionSchedule {
    pub id: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub repeat_type: String,
    pub repeat_days: Option<String>,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl EmissionSchedule {
    pub fn repeat_type(&self) -> Option<RepeatType> {
        RepeatType::parse(&self.repeat_type)
    }

    /// Weekday indices, 0=Monday..6=Sunday, stored as CSV text.
    /// Out-of-range or unparsable entries are dropped.
    pub fn repeat_days(&self) -> Vec<u32> {
        match &self.repeat_days {
            Some(raw) => raw
                .split(',')
                .filter_map(|part| part.trim().parse::<u32>().ok())
                .filter(|day| *day <= 6)
                .collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::emission_schedules)]
pub struct NewEmissionSchedule {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub repeat_type: String,
    pub repeat_days: Option<String>,
    pub priority: i32,
    pub is_active: bool,
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::emission_schedules)]
pub struct UpdateEmissionSchedule {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub repeat_type: Option<String>,
    #[serde(default, with = "double_option")]
    pub repeat_days: Option<Option<String>>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

// Material <-> schedule association models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::material_schedules)]
pub struct MaterialSchedule {
    pub id: i32,
    pub material_id: i32,
    pub schedule_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::material_schedules)]
pub struct NewMaterialSchedule {
    pub material_id: i32,
    pub schedule_id: i32,
}

// Player status models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::player_statuses)]
pub struct PlayerStatus {
    pub id: i32,
    pub stand_id: i32,
    pub is_online: bool,
    pub last_seen: Option<NaiveDateTime>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub screen_resolution: Option<String>,
    pub version: Option<String>,
    pub errors: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::player_statuses)]
pub struct NewPlayerStatus {
    pub stand_id: i32,
    pub is_online: bool,
    pub last_seen: Option<NaiveDateTime>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub screen_resolution: Option<String>,
    pub version: Option<String>,
    pub errors: Option<String>,
}
