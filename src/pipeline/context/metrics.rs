use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Load,
    Segment,
    Score,
    Render,
}

/// Timings collected while one image moves through the pipeline
#[derive(Debug, Clone, Default)]
pub struct StageMetrics {
    load: Option<Duration>,
    segment: Option<Duration>,
    score: Option<Duration>,
    render: Option<Duration>,
    total: Option<Duration>,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_duration(&mut self, step: StepKind, duration: Duration) {
        match step {
            StepKind::Load => self.load = Some(duration),
            StepKind::Segment => self.segment = Some(duration),
            StepKind::Score => self.score = Some(duration),
            StepKind::Render => self.render = Some(duration),
        }
    }

    pub fn duration(&self, step: StepKind) -> Option<Duration> {
        match step {
            StepKind::Load => self.load,
            StepKind::Segment => self.segment,
            StepKind::Score => self.score,
            StepKind::Render => self.render,
        }
    }

    pub fn finalize(&mut self, start_time: Instant) {
        self.total = Some(start_time.elapsed());
    }

    pub fn total(&self) -> Option<Duration> {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_step_separately() {
        let mut metrics = StageMetrics::new();
        metrics.record_duration(StepKind::Segment, Duration::from_millis(12));
        metrics.record_duration(StepKind::Render, Duration::from_millis(3));
        assert_eq!(metrics.duration(StepKind::Segment), Some(Duration::from_millis(12)));
        assert_eq!(metrics.duration(StepKind::Render), Some(Duration::from_millis(3)));
        assert_eq!(metrics.duration(StepKind::Load), None);
        assert_eq!(metrics.total(), None);

        metrics.finalize(Instant::now());
        assert!(metrics.total().is_some());
    }
}
