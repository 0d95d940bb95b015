use bevy::prelude::*;

use super::collab::{HostNotifications, HostPolicy, RenderingSink, TrackingSource};
use super::segment::Segment;

/// The measuring state machine.
///
/// Idle or Active, as reported by [`is_measuring`](Self::is_measuring).
/// An Active session has no segment until its first tracking fix arrives;
/// an Idle session never has one.
#[derive(Resource, Debug, Default)]
pub struct MeasurementSession {
    policy: HostPolicy,
    measuring: bool,
    current: Option<Segment>,
    committed: Vec<Segment>,
    /// Whether hosts were already told to show unit display
    units_revealed: bool,
}

impl MeasurementSession {
    pub fn new(policy: HostPolicy) -> Self {
        Self {
            policy,
            ..default()
        }
    }

    pub fn policy(&self) -> &HostPolicy {
        &self.policy
    }

    pub fn is_measuring(&self) -> bool {
        self.measuring
    }

    /// The in-progress segment, once the first fix of this measurement arrived.
    pub fn current(&self) -> Option<&Segment> {
        self.current.as_ref()
    }

    /// Finalized segments in commit order.
    pub fn committed(&self) -> &[Segment] {
        &self.committed
    }

    pub fn current_distance_label(&self) -> Option<String> {
        self.current.as_ref().map(Segment::distance_label)
    }

    pub fn committed_labels(&self) -> Vec<String> {
        self.committed.iter().map(Segment::distance_label).collect()
    }

    /// Begin a measurement. Ignored while one is already running.
    pub fn activate(&mut self, sink: &mut impl RenderingSink, host: &mut impl HostNotifications) {
        if self.measuring {
            debug!("activate ignored: already measuring");
            return;
        }

        if !self.policy.allow_multiple && !self.committed.is_empty() {
            self.discard_committed(sink);
            host.on_committed_list_changed(true);
        }

        debug_assert!(self.current.is_none());
        self.measuring = true;
        info!("Measurement started");
    }

    /// Finish the running measurement, committing it if it saw any sample.
    pub fn deactivate(&mut self, sink: &mut impl RenderingSink, host: &mut impl HostNotifications) {
        if !self.measuring {
            debug!("deactivate ignored: not measuring");
            return;
        }
        self.measuring = false;

        match self.current.take() {
            Some(mut segment) if segment.has_sample() => {
                segment.commit();
                let label = segment.distance_label();
                info!(
                    "Measurement committed: {} ({:?} -> {:?})",
                    label,
                    segment.start(),
                    segment.end()
                );
                self.committed.push(segment);
                host.on_measure_committed(&label);
                host.on_committed_list_changed(false);
            }
            Some(mut segment) => {
                segment.discard(sink);
                debug!("Measurement dropped before any sample");
            }
            None => {
                debug!("Measurement ended without a tracking fix");
            }
        }
    }

    /// Feed one tracking sample. Only has an effect while measuring.
    pub fn sample(
        &mut self,
        position: Option<Vec3>,
        sink: &mut impl RenderingSink,
        host: &mut impl HostNotifications,
    ) {
        if !self.measuring {
            return;
        }
        let Some(position) = position else {
            return;
        };

        match self.current.as_mut() {
            Some(segment) => segment.update(position, sink),
            None => {
                let mut segment = Segment::create(
                    position,
                    self.policy.unit,
                    self.policy.unit_label.clone(),
                    sink,
                );
                segment.update(position, sink);
                self.current = Some(segment);
            }
        }

        if !self.units_revealed {
            self.units_revealed = true;
            host.on_units_revealed();
        }
    }

    /// Pull one sample from `source` and apply it.
    pub fn tick(
        &mut self,
        source: &mut impl TrackingSource,
        sink: &mut impl RenderingSink,
        host: &mut impl HostNotifications,
    ) {
        let position = source.sample_world_position();
        self.sample(position, sink, host);
    }

    /// Drop every segment, committed or running, and return to idle.
    pub fn reset_all(&mut self, sink: &mut impl RenderingSink, host: &mut impl HostNotifications) {
        self.discard_committed(sink);
        if let Some(mut segment) = self.current.take() {
            segment.discard(sink);
        }
        self.measuring = false;
        host.on_committed_list_changed(true);
        info!("All measurements cleared");
    }

    fn discard_committed(&mut self, sink: &mut impl RenderingSink) {
        for mut segment in self.committed.drain(..) {
            segment.discard(sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::collab::SessionEvent;
    use crate::measure::testing::{RecordingSink, ScriptedTracker};
    use crate::units::DistanceUnit;

    fn policy(allow_multiple: bool) -> HostPolicy {
        HostPolicy {
            allow_multiple,
            unit: DistanceUnit::Centimeter,
            unit_label: "cm".to_string(),
        }
    }

    struct Harness {
        session: MeasurementSession,
        sink: RecordingSink,
        events: Vec<SessionEvent>,
    }

    impl Harness {
        fn new(allow_multiple: bool) -> Self {
            Self {
                session: MeasurementSession::new(policy(allow_multiple)),
                sink: RecordingSink::default(),
                events: Vec::new(),
            }
        }

        fn activate(&mut self) {
            self.session.activate(&mut self.sink, &mut self.events);
        }

        fn deactivate(&mut self) {
            self.session.deactivate(&mut self.sink, &mut self.events);
        }

        fn sample(&mut self, p: Option<Vec3>) {
            self.session.sample(p, &mut self.sink, &mut self.events);
        }

        fn reset_all(&mut self) {
            self.session.reset_all(&mut self.sink, &mut self.events);
        }

        fn measure(&mut self, from: Vec3, to: Vec3) {
            self.activate();
            self.sample(Some(from));
            self.sample(Some(to));
            self.deactivate();
        }
    }

    #[test]
    fn commit_records_first_and_last_sample() {
        let mut h = Harness::new(true);
        let p1 = Vec3::new(0.5, 0.0, -1.0);
        let p2 = Vec3::new(1.5, 0.0, -1.0);

        h.activate();
        h.sample(None);
        h.sample(Some(p1));
        h.sample(Some(p2));
        h.deactivate();

        assert_eq!(h.session.committed().len(), 1);
        let seg = &h.session.committed()[0];
        assert_eq!(seg.start(), p1);
        assert_eq!(seg.end(), p2);
        assert!(seg.is_committed());
        assert!(h.session.current().is_none());
        assert!(!h.session.is_measuring());
    }

    #[test]
    fn no_commit_without_sample() {
        let mut h = Harness::new(true);
        h.measure(Vec3::ZERO, Vec3::X);

        h.activate();
        h.sample(None);
        h.deactivate();

        assert_eq!(h.session.committed().len(), 1);
        assert_eq!(h.sink.live.len(), 1);
    }

    #[test]
    fn single_mode_keeps_only_latest() {
        let mut h = Harness::new(false);
        h.measure(Vec3::ZERO, Vec3::X);
        h.measure(Vec3::Z, Vec3::Z * 3.0);

        assert_eq!(h.session.committed().len(), 1);
        assert_eq!(h.session.committed()[0].start(), Vec3::Z);
        // first segment's visual is gone
        assert_eq!(h.sink.live.len(), 1);
        assert_eq!(h.session.committed_labels(), vec!["200.00cm".to_string()]);
    }

    #[test]
    fn single_mode_clears_on_activate_before_any_sample() {
        let mut h = Harness::new(false);
        h.measure(Vec3::ZERO, Vec3::X);
        h.events.clear();

        h.activate();

        assert!(h.session.committed().is_empty());
        assert!(h.sink.live.is_empty());
        assert_eq!(h.events, vec![SessionEvent::CommittedListChanged { is_empty: true }]);
    }

    #[test]
    fn multiple_mode_accumulates() {
        let mut h = Harness::new(true);
        for i in 0..5 {
            let x = i as f32;
            h.measure(Vec3::new(x, 0.0, 0.0), Vec3::new(x, 0.0, 1.0));
        }

        assert_eq!(h.session.committed().len(), 5);
        assert_eq!(h.sink.live.len(), 5);
        assert!(h.session.committed_labels().iter().all(|l| l == "100.00cm"));
    }

    #[test]
    fn committed_keeps_commit_order() {
        let mut h = Harness::new(true);
        h.measure(Vec3::ZERO, Vec3::X);
        h.measure(Vec3::ZERO, Vec3::X * 2.0);
        h.measure(Vec3::ZERO, Vec3::X * 0.5);

        assert_eq!(
            h.session.committed_labels(),
            vec!["100.00cm", "200.00cm", "50.00cm"]
        );
    }

    #[test]
    fn origin_is_a_valid_first_sample() {
        let mut h = Harness::new(true);
        h.activate();
        h.sample(Some(Vec3::ZERO));
        h.deactivate();

        assert_eq!(h.session.committed().len(), 1);
        assert_eq!(h.session.committed_labels(), vec!["0.00cm"]);
    }

    #[test]
    fn single_sample_commits_zero_length() {
        let mut h = Harness::new(true);
        h.activate();
        h.sample(Some(Vec3::new(2.0, 0.0, 2.0)));
        assert_eq!(h.session.current_distance_label().as_deref(), Some("0.00cm"));
        h.deactivate();

        assert_eq!(h.session.committed().len(), 1);
    }

    #[test]
    fn current_label_follows_samples() {
        let mut h = Harness::new(true);
        assert_eq!(h.session.current_distance_label(), None);

        h.activate();
        assert_eq!(h.session.current_distance_label(), None);
        h.sample(Some(Vec3::ZERO));
        h.sample(Some(Vec3::new(0.0, 0.0, 0.25)));

        assert_eq!(h.session.current_distance_label().as_deref(), Some("25.00cm"));
        assert_eq!(h.sink.last_label.as_deref(), Some("25.00cm"));
    }

    #[test]
    fn sample_while_idle_is_ignored() {
        let mut h = Harness::new(true);
        h.sample(Some(Vec3::X));

        assert!(h.session.current().is_none());
        assert!(h.sink.created.is_empty());
        assert!(h.events.is_empty());

        h.measure(Vec3::ZERO, Vec3::X);
        let before = h.session.committed()[0].end();
        h.sample(Some(Vec3::Y * 9.0));

        assert!(h.session.current().is_none());
        assert_eq!(h.session.committed()[0].end(), before);
    }

    #[test]
    fn activate_twice_is_a_noop() {
        let mut h = Harness::new(true);
        h.activate();
        h.sample(Some(Vec3::ZERO));
        h.sample(Some(Vec3::X));
        h.activate();

        assert!(h.session.is_measuring());
        assert_eq!(h.session.current().map(Segment::end), Some(Vec3::X));
    }

    #[test]
    fn deactivate_while_idle_is_a_noop() {
        let mut h = Harness::new(true);
        h.deactivate();
        h.measure(Vec3::ZERO, Vec3::X);
        h.events.clear();
        h.deactivate();

        assert_eq!(h.session.committed().len(), 1);
        assert!(h.events.is_empty());
    }

    #[test]
    fn commit_notifies_host() {
        let mut h = Harness::new(true);
        h.measure(Vec3::ZERO, Vec3::X);

        assert_eq!(
            h.events,
            vec![
                SessionEvent::UnitsRevealed,
                SessionEvent::MeasureCommitted { label: "100.00cm".to_string() },
                SessionEvent::CommittedListChanged { is_empty: false },
            ]
        );
    }

    #[test]
    fn units_revealed_only_once() {
        let mut h = Harness::new(false);
        h.measure(Vec3::ZERO, Vec3::X);
        h.measure(Vec3::ZERO, Vec3::X);
        h.reset_all();
        h.measure(Vec3::ZERO, Vec3::X);

        let reveals = h
            .events
            .iter()
            .filter(|e| **e == SessionEvent::UnitsRevealed)
            .count();
        assert_eq!(reveals, 1);
    }

    #[test]
    fn reset_all_is_idempotent() {
        let mut h = Harness::new(true);
        h.measure(Vec3::ZERO, Vec3::X);
        h.measure(Vec3::ZERO, Vec3::Y);
        h.activate();
        h.sample(Some(Vec3::Z));

        h.reset_all();
        let destroyed_once = h.sink.destroyed.len();
        h.reset_all();

        assert!(h.session.committed().is_empty());
        assert!(h.session.current().is_none());
        assert!(!h.session.is_measuring());
        assert!(h.sink.live.is_empty());
        assert_eq!(h.sink.destroyed.len(), destroyed_once);
        assert_eq!(destroyed_once, 3);
    }

    #[test]
    fn reset_mid_measurement_then_deactivate() {
        let mut h = Harness::new(true);
        h.activate();
        h.sample(Some(Vec3::ZERO));
        h.sample(Some(Vec3::X));
        h.reset_all();
        h.deactivate();

        assert!(h.session.committed().is_empty());
        assert!(h.sink.live.is_empty());
    }

    #[test]
    fn every_visual_is_released_once() {
        let mut h = Harness::new(false);
        h.measure(Vec3::ZERO, Vec3::X);
        h.activate();
        h.deactivate();
        h.measure(Vec3::ZERO, Vec3::Y);
        h.activate();
        h.sample(Some(Vec3::Z));
        h.reset_all();

        let mut destroyed = h.sink.destroyed.clone();
        destroyed.sort();
        destroyed.dedup();
        assert_eq!(destroyed.len(), h.sink.destroyed.len());
        assert_eq!(destroyed, h.sink.created);
    }

    #[test]
    fn tick_pulls_from_tracking_source() {
        let mut h = Harness::new(true);
        let mut tracker = ScriptedTracker::new([None, Some(Vec3::ZERO), None, Some(Vec3::X * 0.3)]);

        h.activate();
        for _ in 0..4 {
            h.session.tick(&mut tracker, &mut h.sink, &mut h.events);
        }
        h.deactivate();

        assert_eq!(h.session.committed_labels(), vec!["30.00cm"]);
    }

    #[test]
    fn inch_policy_formats_labels() {
        let mut session = MeasurementSession::new(HostPolicy {
            allow_multiple: true,
            unit: DistanceUnit::Inch,
            unit_label: "\"".to_string(),
        });
        let mut sink = RecordingSink::default();
        let mut events = Vec::new();

        session.activate(&mut sink, &mut events);
        session.sample(Some(Vec3::ZERO), &mut sink, &mut events);
        session.sample(Some(Vec3::Y), &mut sink, &mut events);
        session.deactivate(&mut sink, &mut events);

        assert_eq!(session.committed_labels(), vec!["39.37\""]);
    }
}
