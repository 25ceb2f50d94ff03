use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const BUILTIN_EVENTS_YAML: &str = include_str!("../../../config/special_events.yaml");

/// A named closed date window `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecialEvent {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SpecialEvent {
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Ordered, validated list of special events.
///
/// Stored as a YAML sequence so definition order (the overlap tie-break)
/// survives loading without an explicit priority field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTable {
    events: Vec<SpecialEvent>,
}

impl EventTable {
    pub fn new(events: Vec<SpecialEvent>) -> Result<Self> {
        let mut names = BTreeSet::new();
        for (i, ev) in events.iter().enumerate() {
            if ev.name.trim().is_empty() {
                bail!("EVENT_TABLE_INVALID entry #{i}: empty name");
            }
            if ev.start > ev.end {
                bail!(
                    "EVENT_TABLE_INVALID {:?}: start {} is after end {}",
                    ev.name,
                    ev.start,
                    ev.end
                );
            }
            if !names.insert(ev.name.as_str()) {
                bail!("EVENT_TABLE_INVALID duplicate event name {:?}", ev.name);
            }
        }
        Ok(Self { events })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let events: Vec<SpecialEvent> =
            serde_yaml::from_str(raw).context("invalid special event yaml")?;
        Self::new(events)
    }

    /// The table shipped in `config/special_events.yaml`.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_EVENTS_YAML).context("builtin special event table")
    }

    pub fn events(&self) -> &[SpecialEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
