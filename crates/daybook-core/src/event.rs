use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepeatType {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Recurrence settings carried with an event. Only stored and round-tripped;
/// none of the filtering or overlap logic expands repeats.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepeatInfo {
    #[serde(rename = "type")]
    pub kind: RepeatType,

    pub interval: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Default for RepeatInfo {
    fn default() -> Self {
        Self {
            kind: RepeatType::None,
            interval: 1,
            end_date: None,
        }
    }
}

/// An event payload that has not been assigned an identifier yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventForm {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub location: String,

    pub date: String,

    pub start_time: String,

    pub end_time: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub repeat: RepeatInfo,

    #[serde(default)]
    pub notification_time: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,

    #[serde(flatten)]
    pub form: EventForm,
}

impl EventForm {
    pub fn new(
        title: impl Into<String>,
        date: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            location: String::new(),
            date: date.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            category: String::new(),
            repeat: RepeatInfo::default(),
            notification_time: 10,
        }
    }

    pub fn into_event(self) -> Event {
        Event {
            id: Uuid::new_v4().to_string(),
            form: self,
        }
    }
}

impl Event {
    pub fn new(id: impl Into<String>, form: EventForm) -> Self {
        Self {
            id: id.into(),
            form,
        }
    }

    pub fn title(&self) -> &str {
        &self.form.title
    }

    pub fn description(&self) -> &str {
        &self.form.description
    }

    pub fn location(&self) -> &str {
        &self.form.location
    }

    pub fn category(&self) -> &str {
        &self.form.category
    }

    pub fn notification_time(&self) -> u32 {
        self.form.notification_time
    }
}

/// Anything that occupies a time slot on a given day.
///
/// Saved events and unsaved forms both implement this so that range
/// conversion and overlap checks accept either.
pub trait Schedule {
    /// `None` for payloads that have not been persisted.
    fn id(&self) -> Option<&str>;
    fn date(&self) -> &str;
    fn start_time(&self) -> &str;
    fn end_time(&self) -> &str;
}

impl Schedule for EventForm {
    fn id(&self) -> Option<&str> {
        None
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn start_time(&self) -> &str {
        &self.start_time
    }

    fn end_time(&self) -> &str {
        &self.end_time
    }
}

impl Schedule for Event {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn date(&self) -> &str {
        &self.form.date
    }

    fn start_time(&self) -> &str {
        &self.form.start_time
    }

    fn end_time(&self) -> &str {
        &self.form.end_time
    }
}
