//! Automation timeline — mirrors an AudioParam's scheduled events.
//!
//! Evaluation follows the Web Audio rules for the three event kinds we use:
//! a set holds its value, a linear ramp interpolates from the previous
//! event's time and value, and a set-target approaches its target
//! exponentially from whatever value the parameter had when it started.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AutomationEvent {
    SetValue {
        time: f64,
        value: f32,
    },
    LinearRamp {
        time: f64,
        value: f32,
    },
    SetTarget {
        time: f64,
        target: f32,
        time_constant: f64,
    },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. }
            | AutomationEvent::LinearRamp { time, .. }
            | AutomationEvent::SetTarget { time, .. } => time,
        }
    }
}

/// Value of a parameter between events: an anchor plus an optional
/// exponential approach that began at the anchor.
#[derive(Debug, Clone, Copy)]
struct Segment {
    time: f64,
    value: f32,
    approach: Option<(f32, f64)>,
}

impl Segment {
    fn value_at(&self, at: f64) -> f32 {
        match self.approach {
            Some((target, tau)) if at > self.time => {
                if tau <= 0.0 {
                    return target;
                }
                let decay = (-(at - self.time) / tau).exp() as f32;
                target + (self.value - target) * decay
            }
            _ => self.value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutomationTimeline {
    /// Intrinsic value before any event.
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl AutomationTimeline {
    pub fn new(default_value: f32) -> Self {
        AutomationTimeline {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Insert an event in time order, after any events at the same time.
    pub fn insert(&mut self, event: AutomationEvent) {
        let time = event.time();
        let idx = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(idx, event);
    }

    /// Remove every event scheduled at or after `time`.
    pub fn cancel_from(&mut self, time: f64) {
        let idx = self.events.partition_point(|e| e.time() < time);
        self.events.truncate(idx);
    }

    /// Evaluate the parameter at `at`.
    pub fn value_at(&self, at: f64) -> f32 {
        let mut segment = Segment {
            time: f64::NEG_INFINITY,
            value: self.default_value,
            approach: None,
        };

        for event in &self.events {
            if event.time() > at {
                if let AutomationEvent::LinearRamp { time, value } = *event {
                    let start = segment.value_at(segment.time);
                    if !segment.time.is_finite() || time <= segment.time {
                        return start;
                    }
                    let frac = ((at - segment.time) / (time - segment.time)) as f32;
                    return start + (value - start) * frac;
                }
                break;
            }
            segment = Self::apply(segment, event);
        }

        segment.value_at(at)
    }

    fn apply(segment: Segment, event: &AutomationEvent) -> Segment {
        match *event {
            AutomationEvent::SetValue { time, value } | AutomationEvent::LinearRamp { time, value } => {
                Segment {
                    time,
                    value,
                    approach: None,
                }
            }
            AutomationEvent::SetTarget {
                time,
                target,
                time_constant,
            } => Segment {
                time,
                value: segment.value_at(time),
                approach: Some((target, time_constant)),
            },
        }
    }

    /// Collapse history before `time` without changing any value at or after it.
    ///
    /// The last event at or before `time` is kept as the new anchor; a
    /// set-target anchor keeps its start value as an explicit set.
    pub fn prune_before(&mut self, time: f64) {
        let past = self.events.partition_point(|e| e.time() <= time);
        if past < 2 {
            return;
        }

        let mut segment = Segment {
            time: f64::NEG_INFINITY,
            value: self.default_value,
            approach: None,
        };
        for event in &self.events[..past - 1] {
            segment = Self::apply(segment, event);
        }

        let anchor = self.events[past - 1];
        let mut kept = Vec::with_capacity(self.events.len() - past + 2);
        if let AutomationEvent::SetTarget { time: start, .. } = anchor {
            kept.push(AutomationEvent::SetValue {
                time: start,
                value: segment.value_at(start),
            });
        }
        kept.push(anchor);
        kept.extend_from_slice(&self.events[past..]);
        self.events = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn empty_timeline_holds_default() {
        let tl = AutomationTimeline::new(0.5);
        assert_eq!(tl.value_at(0.0), 0.5);
        assert_eq!(tl.value_at(100.0), 0.5);
    }

    #[test]
    fn linear_ramp_interpolates_from_previous_event() {
        let mut tl = AutomationTimeline::new(0.0);
        tl.insert(AutomationEvent::SetValue { time: 1.0, value: 0.0 });
        tl.insert(AutomationEvent::LinearRamp { time: 2.0, value: 1.0 });
        tl.insert(AutomationEvent::LinearRamp { time: 4.0, value: 0.5 });

        assert!(close(tl.value_at(0.5), 0.0));
        assert!(close(tl.value_at(1.5), 0.5));
        assert!(close(tl.value_at(2.0), 1.0));
        assert!(close(tl.value_at(3.0), 0.75));
        assert!(close(tl.value_at(10.0), 0.5));
    }

    #[test]
    fn set_target_approaches_exponentially() {
        let mut tl = AutomationTimeline::new(0.0);
        tl.insert(AutomationEvent::SetTarget {
            time: 1.0,
            target: 1.0,
            time_constant: 0.5,
        });
        assert!(close(tl.value_at(1.0), 0.0));
        let one_tau = tl.value_at(1.5);
        assert!(
            close(one_tau, 1.0 - (-1.0f32).exp()),
            "one time constant should reach ~63%, got {one_tau}"
        );
        assert!(tl.value_at(10.0) > 0.999);
    }

    #[test]
    fn cancel_drops_future_ramps() {
        let mut tl = AutomationTimeline::new(0.0);
        tl.insert(AutomationEvent::SetValue { time: 0.0, value: 0.0 });
        tl.insert(AutomationEvent::LinearRamp { time: 2.0, value: 1.0 });
        tl.cancel_from(1.0);
        // the in-progress ramp is gone, so the value falls back to the anchor
        assert!(close(tl.value_at(1.0), 0.0));
        assert_eq!(tl.events().len(), 1);
    }

    #[test]
    fn same_time_events_keep_insertion_order() {
        let mut tl = AutomationTimeline::new(0.0);
        tl.insert(AutomationEvent::SetValue { time: 1.0, value: 0.2 });
        tl.insert(AutomationEvent::SetValue { time: 1.0, value: 0.7 });
        assert!(close(tl.value_at(1.0), 0.7));
    }

    #[test]
    fn prune_keeps_future_values() {
        let mut tl = AutomationTimeline::new(0.1);
        tl.insert(AutomationEvent::SetValue { time: 0.0, value: 0.2 });
        tl.insert(AutomationEvent::LinearRamp { time: 1.0, value: 0.9 });
        tl.insert(AutomationEvent::SetTarget {
            time: 2.0,
            target: 0.0,
            time_constant: 0.3,
        });
        tl.insert(AutomationEvent::LinearRamp { time: 5.0, value: 1.0 });

        let probes = [2.5, 3.0, 4.0, 4.9, 6.0];
        let before: Vec<f32> = probes.iter().map(|t| tl.value_at(*t)).collect();
        tl.prune_before(2.5);
        let after: Vec<f32> = probes.iter().map(|t| tl.value_at(*t)).collect();

        for (b, a) in before.iter().zip(&after) {
            assert!(close(*b, *a), "prune changed a future value: {b} vs {a}");
        }
        assert!(tl.events().len() <= 3, "history should be collapsed");
    }
}
