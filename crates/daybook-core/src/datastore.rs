use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::event::Event;

#[derive(Debug, Default, Serialize, Deserialize)]
struct EventsDocument {
    #[serde(default)]
    events: Vec<Event>,
}

/// The `{ "events": [...] }` JSON file holding a user's calendar.
#[derive(Debug, Clone)]
pub struct EventStore {
    pub path: PathBuf,
}

impl EventStore {
    pub fn open(path: &Path) -> Self {
        info!(file = %path.display(), "using events file");
        Self {
            path: path.to_path_buf(),
        }
    }

    /// A missing file is an empty calendar.
    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    pub fn load(&self) -> anyhow::Result<Vec<Event>> {
        if !self.path.exists() {
            debug!("events file not found; starting empty");
            return Ok(vec![]);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(vec![]);
        }

        let doc: EventsDocument = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.path.display()))?;
        debug!(count = doc.events.len(), "loaded events");
        Ok(doc.events)
    }

    #[tracing::instrument(skip(self, events), fields(file = %self.path.display(), count = events.len()))]
    pub fn save(&self, events: &[Event]) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

        let doc = EventsDocument {
            events: events.to_vec(),
        };
        let mut temp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut temp, &doc)?;
        writeln!(temp)?;
        temp.flush()?;

        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;

        debug!("saved events");
        Ok(())
    }

    #[tracing::instrument(skip(self, events, event), fields(id = %event.id))]
    pub fn add_event(&self, mut events: Vec<Event>, event: Event) -> anyhow::Result<Vec<Event>> {
        if events.iter().any(|existing| existing.id == event.id) {
            return Err(anyhow!("event id already exists: {}", event.id));
        }
        events.push(event);
        events.sort_by(|a, b| {
            (a.form.date.as_str(), a.form.start_time.as_str())
                .cmp(&(b.form.date.as_str(), b.form.start_time.as_str()))
        });
        self.save(&events)?;
        Ok(events)
    }
}
