use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Attendee,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Attendee => "attendee",
            UserRole::Admin => "admin",
        }
    }

    /// Anything that is not exactly `admin` is an attendee.
    pub fn from_db(value: &str) -> Self {
        if value == "admin" { UserRole::Admin } else { UserRole::Attendee }
    }
}

/// Public slice of a profile shown to someone who just scanned a code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnippet {
    pub name: Option<String>,
    pub position: Option<String>,
    pub company: Option<String>,
    pub photo: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
}

/// The one profile view model. Built once where rows leave the database so
/// nothing downstream has to guess which column a photo or company came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linkedin: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub qualifications: Option<String>,
    pub photo: Option<String>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub networking_points: i64,
    pub role: UserRole,
}

impl Profile {
    pub fn snippet(&self) -> ProfileSnippet {
        ProfileSnippet {
            name: self.name.clone(),
            position: self.position.clone(),
            company: self.company.clone(),
            photo: self.photo.clone(),
            email: self.email.clone(),
            linkedin: self.linkedin.clone(),
        }
    }

    /// Comma-joined skills for display; derived from the tag rows, never stored.
    pub fn skills_display(&self) -> String {
        self.skills.join(", ")
    }

    pub fn interests_display(&self) -> String {
        self.interests.join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: i64,
    pub event_id: i64,
    pub username: String,
    pub role: String,
    pub registered_at: String,
    pub qr_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub registration_id: i64,
    pub username: String,
    pub role: String,
    #[serde(flatten)]
    pub profile: ProfileSnippet,
}

/// One card per person someone has met. `note` is the viewer's own note only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionCard {
    pub id: i64,
    pub username: String,
    pub event_id: i64,
    pub event_name: Option<String>,
    pub created_at: String,
    pub note: String,
    pub role: String,
    #[serde(flatten)]
    pub profile: ProfileSnippet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub receiver: String,
    pub text: String,
    pub timestamp: String,
    pub is_read: bool,
}
