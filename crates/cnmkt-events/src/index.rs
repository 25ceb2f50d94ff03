use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::table::{EventTable, SpecialEvent};

/// Elementary interval `[start, next segment's start)` and the winning event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    start: NaiveDate,
    /// Table position of the first event covering the segment.
    event: Option<usize>,
}

/// Read-only range index over an [`EventTable`].
///
/// Built once: every event boundary splits the timeline into elementary
/// segments, each tagged with the lowest table position among the events
/// covering it. A bulk query is then one binary search per date.
#[derive(Debug, Clone)]
pub struct EventIndex {
    events: Vec<SpecialEvent>,
    segments: Vec<Segment>,
}

impl EventIndex {
    pub fn new(table: &EventTable) -> Self {
        let events = table.events().to_vec();
        let segments = build_segments(&events);
        Self { events, segments }
    }

    /// First event (table order) whose window contains `date`.
    pub fn tag(&self, date: NaiveDate) -> Option<&str> {
        self.events
            .iter()
            .find(|ev| ev.contains(date))
            .map(|ev| ev.name.as_str())
    }

    /// Same answer as [`EventIndex::tag`] for every input, resolved against
    /// the prebuilt segment index. Output has the input's length and order.
    pub fn tag_bulk(&self, dates: &[NaiveDate]) -> Vec<Option<&str>> {
        dates
            .iter()
            .map(|&date| {
                self.segment_event(date)
                    .map(|i| self.events[i].name.as_str())
            })
            .collect()
    }

    pub fn events(&self) -> &[SpecialEvent] {
        &self.events
    }

    fn segment_event(&self, date: NaiveDate) -> Option<usize> {
        let pos = self.segments.partition_point(|s| s.start <= date);
        if pos == 0 {
            return None;
        }
        self.segments[pos - 1].event
    }
}

fn build_segments(events: &[SpecialEvent]) -> Vec<Segment> {
    let mut opens: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    let mut closes: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, ev) in events.iter().enumerate() {
        opens.entry(ev.start).or_default().push(i);
        // A window ending on NaiveDate::MAX never closes.
        if let Some(after) = ev.end.succ_opt() {
            closes.entry(after).or_default().push(i);
        }
    }

    let points: BTreeSet<NaiveDate> = opens.keys().chain(closes.keys()).copied().collect();

    let mut active: BTreeSet<usize> = BTreeSet::new();
    let mut segments = Vec::with_capacity(points.len());
    for point in points {
        for i in closes.get(&point).into_iter().flatten() {
            active.remove(i);
        }
        for i in opens.get(&point).into_iter().flatten() {
            active.insert(*i);
        }
        let event = active.first().copied();
        // Merge runs with the same winner so lookups stay short.
        if segments.last().map(|s: &Segment| s.event) != Some(event) {
            segments.push(Segment {
                start: point,
                event,
            });
        }
    }
    segments
}
