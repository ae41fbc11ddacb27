use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Wall-clock samples for one pipeline stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfilingItem {
    pub count: usize,
    pub times: Vec<f64>,
}

impl ProfilingItem {
    pub fn total(&self) -> f64 {
        self.times.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.times.is_empty() {
            0.0
        } else {
            self.total() / self.times.len() as f64
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Timings(BTreeMap<String, ProfilingItem>);

impl Timings {
    pub fn record(&mut self, key: &str, elapsed: Duration) {
        let item = self.0.entry(key.to_string()).or_default();
        item.count += 1;
        item.times.push(elapsed.as_secs_f64());
    }

    pub fn get(&self, key: &str) -> Option<&ProfilingItem> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProfilingItem)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Measures one stage run; nothing is recorded when profiling is off.
pub struct TimeRecorder {
    key: &'static str,
    started: Option<Instant>,
}

impl TimeRecorder {
    pub fn start(key: &'static str, enabled: bool) -> Self {
        Self {
            key,
            started: enabled.then(Instant::now),
        }
    }

    pub fn finish(self, timings: &mut Timings) {
        if let Some(started) = self.started {
            timings.record(self.key, started.elapsed());
        }
    }
}
