// 📅 Activity Entity - scheduled farm chores
// coopNumber absent means the activity applies to every coop

use super::text_enum;
use crate::config::FarmConfig;
use crate::schema::{FieldChecks, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum ActivityType {
        #[serde(alias = "limpieza")]
        Cleaning => "cleaning",
        #[serde(alias = "alimentacion")]
        Feeding => "feeding",
        #[serde(alias = "agua")]
        Water => "water",
        #[serde(alias = "vacunacion")]
        Vaccination => "vaccination",
        #[serde(alias = "inspeccion")]
        Inspection => "inspection",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub coop_number: Option<i64>,
    pub description: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    pub completed: bool,
    pub recurring: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub coop_number: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "super::flexible_date::deserialize")]
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub recurring: bool,
}

impl NewActivity {
    pub fn validate(&self, config: &FarmConfig) -> ValidationResult {
        let mut checks = FieldChecks::new("Activity", config);
        if let Some(number) = self.coop_number {
            checks.coop_number("coopNumber", number);
        }
        checks.finish()
    }
}

/// Partial update from `PUT /api/activities/:id` (usually toggling `completed`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUpdate {
    #[serde(default, rename = "type")]
    pub activity_type: Option<ActivityType>,
    #[serde(default)]
    pub coop_number: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "super::flexible_date::option::deserialize")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub recurring: Option<bool>,
}

impl ActivityUpdate {
    pub fn validate(&self, config: &FarmConfig) -> ValidationResult {
        let mut checks = FieldChecks::new("Activity", config);
        if let Some(number) = self.coop_number {
            checks.coop_number("coopNumber", number);
        }
        checks.finish()
    }

    pub fn apply_to(&self, activity: &Activity) -> Activity {
        Activity {
            id: activity.id,
            activity_type: self.activity_type.unwrap_or(activity.activity_type),
            coop_number: self.coop_number.or(activity.coop_number),
            description: self
                .description
                .clone()
                .or_else(|| activity.description.clone()),
            scheduled_date: self.scheduled_date.unwrap_or(activity.scheduled_date),
            completed: self.completed.unwrap_or(activity.completed),
            recurring: self.recurring.unwrap_or(activity.recurring),
        }
    }
}
