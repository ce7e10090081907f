//! Census records.
//!
//! # Invariants
//! - `Deceased` people stay in the census (they count toward population) but
//!   never toward living or skilled headcounts.

use super::{deserialize_lenient_text, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Skill keywords that mark a person as medical staff.
pub const MEDICAL_SKILL_KEYWORDS: &[&str] = &["medic", "doctor", "nurse"];

/// Resident health.
///
/// Unknown spellings are kept verbatim as `Unrecognized`; only `Deceased`
/// takes a resident out of the living headcount. A record with no health
/// reads as `Healthy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Injured,
    Sick,
    Deceased,
    Unrecognized(String),
}

impl HealthStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Healthy => "Healthy",
            Self::Injured => "Injured",
            Self::Sick => "Sick",
            Self::Deceased => "Deceased",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Parses case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "healthy" => Self::Healthy,
            "injured" => Self::Injured,
            "sick" => Self::Sick,
            "deceased" => Self::Deceased,
            _ => Self::Unrecognized(value.to_string()),
        }
    }
}

impl From<String> for HealthStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<HealthStatus> for String {
    fn from(value: HealthStatus) -> Self {
        match value {
            HealthStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// One resident in the census.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(deserialize_with = "deserialize_lenient_text")]
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    /// Stored as entered; older files may carry a bare number.
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    /// Free text, e.g. `Field medic, radio`.
    #[serde(default)]
    pub skill: String,
    #[serde(default)]
    pub health: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    pub fn is_living(&self) -> bool {
        self.health != HealthStatus::Deceased
    }

    /// Case-insensitive keyword match on `skill`.
    pub fn has_medical_skill(&self) -> bool {
        let skill = self.skill.to_lowercase();
        MEDICAL_SKILL_KEYWORDS
            .iter()
            .any(|keyword| skill.contains(keyword))
    }
}

/// Input for adding a resident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub skill: String,
    pub health: HealthStatus,
    pub contact: Option<String>,
}

/// Partial update; `None` leaves the field untouched.
///
/// `contact: Some(None)` clears the contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub skill: Option<String>,
    pub health: Option<HealthStatus>,
    pub contact: Option<Option<String>>,
}

impl PersonPatch {
    pub fn apply(self, person: &mut Person) {
        if let Some(name) = self.name {
            person.name = name;
        }
        if let Some(age) = self.age {
            person.age = age;
        }
        if let Some(gender) = self.gender {
            person.gender = gender;
        }
        if let Some(skill) = self.skill {
            person.skill = skill;
        }
        if let Some(health) = self.health {
            person.health = health;
        }
        if let Some(contact) = self.contact {
            person.contact = contact;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HealthStatus, Person};
    use serde_json::Map;

    fn person(skill: &str, health: HealthStatus) -> Person {
        Person {
            id: "p-1".to_string(),
            name: "Ada".to_string(),
            age: "40".to_string(),
            gender: "F".to_string(),
            skill: skill.to_string(),
            health,
            contact: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn medical_skill_matches_substrings_case_insensitively() {
        assert!(person("Paramedic", HealthStatus::Healthy).has_medical_skill());
        assert!(person("ER Nurse", HealthStatus::Sick).has_medical_skill());
        assert!(person("DOCTOR", HealthStatus::Healthy).has_medical_skill());
        assert!(!person("Carpenter", HealthStatus::Healthy).has_medical_skill());
    }

    #[test]
    fn only_deceased_is_not_living() {
        assert!(person("", HealthStatus::Injured).is_living());
        assert!(person("", HealthStatus::Sick).is_living());
        assert!(!person("", HealthStatus::Deceased).is_living());
    }

    #[test]
    fn unknown_health_counts_as_living() {
        let health = HealthStatus::parse("recovering");
        assert_eq!(health, HealthStatus::Unrecognized("recovering".to_string()));
        assert!(person("", health).is_living());
        assert_eq!(HealthStatus::parse("DECEASED"), HealthStatus::Deceased);
    }
}
