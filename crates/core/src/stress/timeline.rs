use crate::stress::StressTimelineEntry;
use std::collections::VecDeque;
use std::time::Duration;

/// Session-level stress log, pruned to a sliding time window.
///
/// The window is measured back from the newest entry, so a paused session
/// keeps its history until sampling resumes.
#[derive(Clone, Debug)]
pub struct StressTimeline {
    entries: VecDeque<StressTimelineEntry>,
    window_ms: u64,
}

impl StressTimeline {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn push(&mut self, entry: StressTimelineEntry) {
        let newest = entry.timestamp;
        self.entries.push_back(entry);
        while let Some(front) = self.entries.front() {
            if newest.saturating_sub(front.timestamp) > self.window_ms {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn entries(&self) -> Vec<StressTimelineEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
