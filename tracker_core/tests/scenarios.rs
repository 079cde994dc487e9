//! End-to-end slot scenarios driven through the public API with a
//! hand-advanced clock.

use tracker_core::{
    BBox, Detection, FrameDetections, Outcome, Pipeline, PipelineConfig, Point, Role,
    SlotController, SlotControllerConfig, TrackId,
};

fn det(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f64) -> Detection {
    Detection::new(BBox::new(x1, y1, x2, y2), confidence, 0)
}

fn frame(frame_index: u64, timestamp: f64, detections: Vec<Detection>) -> FrameDetections {
    FrameDetections {
        frame_index,
        timestamp,
        detections,
    }
}

#[test]
fn first_detection_becomes_locked_head() {
    let mut ctrl = SlotController::new(SlotControllerConfig::default(), 0.0);
    let report = ctrl.process(&[det(100, 100, 140, 140, 0.90)], 0.0);

    assert_eq!(report.detections[0].outcome, Outcome::Created(Role::Head));
    let head = ctrl.valid(Role::Head, 0.0).expect("HEAD created");
    assert_eq!(head.center(), Point::new(120, 120));
    assert!((head.confidence - 90.0).abs() < 1e-9);
    assert!(head.is_locked(0.0));
    assert!(ctrl.get(Role::Primary).is_none());
}

#[test]
fn matching_detection_smooths_head() {
    let mut ctrl = SlotController::new(SlotControllerConfig::default(), 0.0);
    ctrl.process(&[det(100, 100, 140, 140, 0.90)], 0.0);

    let report = ctrl.process(&[det(110, 100, 150, 140, 0.85)], 0.1);
    assert_eq!(report.detections[0].outcome, Outcome::Updated(Role::Head));
    assert_eq!(report.events.creations, 0);

    let head = ctrl.get(Role::Head).unwrap();
    assert_eq!(head.id, TrackId(0));
    assert_eq!(head.bbox, BBox::new(104, 100, 144, 140));
    assert!((head.confidence - 89.0).abs() < 1e-9);
}

#[test]
fn detection_too_close_to_new_primary_is_dropped() {
    let mut ctrl = SlotController::new(SlotControllerConfig::default(), 0.0);
    ctrl.process(&[det(100, 100, 140, 140, 0.90)], 0.0);

    let report = ctrl.process(
        &[
            det(100, 100, 140, 140, 0.90),
            // 200 px right of HEAD
            det(300, 100, 340, 140, 0.50),
            // 10 px right of the new PRIMARY
            det(310, 100, 350, 140, 0.90),
        ],
        0.1,
    );

    let outcomes: Vec<Outcome> = report.detections.iter().map(|d| d.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            Outcome::Updated(Role::Head),
            Outcome::Created(Role::Primary),
            Outcome::Dropped
        ]
    );
    assert_eq!(report.events.dropped, 1);
    assert_eq!(report.events.misses, 0);
    assert_eq!(ctrl.get(Role::Primary).unwrap().center(), Point::new(320, 120));
    assert!(ctrl.get(Role::Secondary).is_none());
}

#[test]
fn lost_head_is_replaced_by_promotion() {
    let head_box = det(100, 100, 140, 140, 0.90);
    let primary_box = det(390, 110, 410, 130, 0.90);
    let secondary_box = det(100, 480, 140, 520, 0.90);

    let mut ctrl = SlotController::new(SlotControllerConfig::default(), 0.0);
    ctrl.process(&[head_box, primary_box, secondary_box], 0.0);
    assert_eq!(ctrl.active_count(0.0), 3);
    assert_eq!(ctrl.get(Role::Primary).unwrap().id, TrackId(1));

    // HEAD's target vanishes; the other two keep being seen.
    let report = ctrl.process(&[primary_box, secondary_box], 0.1);
    assert_eq!(report.events.updates, 2);
    assert_eq!(report.events.misses, 1);

    ctrl.process(&[primary_box, secondary_box], 0.2);
    assert!(ctrl.valid(Role::Head, 0.2).is_none());

    let events = ctrl.reconcile(0.2);
    assert_eq!(events.clears, 1);
    assert_eq!(events.promotions, 2);
    assert_eq!(ctrl.get(Role::Head).unwrap().id, TrackId(1));
    assert_eq!(ctrl.get(Role::Head).unwrap().role, Role::Head);
    assert_eq!(ctrl.get(Role::Primary).unwrap().id, TrackId(2));
    assert!(ctrl.get(Role::Secondary).is_none());
    assert_eq!(ctrl.last_role_change_at(), 0.2);

    // The promoted HEAD keeps following its target
    let report = ctrl.process(&[primary_box], 0.3);
    assert_eq!(report.detections[0].outcome, Outcome::Updated(Role::Head));
}

#[test]
fn stale_head_is_evicted_without_misses() {
    let mut ctrl = SlotController::new(SlotControllerConfig::default(), 0.0);
    ctrl.process(&[det(100, 100, 140, 140, 0.90)], 0.0);
    assert!(ctrl.valid(Role::Head, 2.0).is_some());
    assert_eq!(ctrl.get(Role::Head).unwrap().miss_streak, 0);

    let report = ctrl.process(&[], 2.5);
    assert_eq!(report.events.misses, 0);
    assert_eq!(report.events.clears, 1);
    assert!(ctrl.get(Role::Head).is_none());
}

#[test]
fn arbitration_hands_head_to_stronger_primary_once() {
    let weak = det(100, 100, 140, 140, 0.45);
    let strong = det(480, 100, 520, 140, 0.99);
    let dt = 0.34;

    let mut pipeline = Pipeline::new(PipelineConfig::default(), 0.0);
    let out = pipeline.process_frame(&frame(0, 0.0, vec![weak, strong]));
    assert_eq!(out.snapshot.head().unwrap().id, TrackId(0));
    assert_eq!(out.snapshot.get(Role::Primary).unwrap().id, TrackId(1));

    // PRIMARY is seen every frame, HEAD every other frame.
    let mut last = None;
    for k in 1..=15u64 {
        let t = k as f64 * dt;
        let detections = if k % 2 == 0 { vec![weak, strong] } else { vec![strong] };
        let out = pipeline.process_frame(&frame(k, t, detections));
        if k < 15 {
            assert!(!out.arbitrated, "frame {k} arbitrated early");
        }
        last = Some(out);
    }

    let out = last.unwrap();
    assert!(out.arbitrated);
    assert_eq!(out.events.arbitration_swaps, 1);
    assert_eq!(out.snapshot.head().unwrap().id, TrackId(1));
    assert_eq!(out.snapshot.get(Role::Primary).unwrap().id, TrackId(0));
    assert!(!out.snapshot.head().unwrap().locked);

    let t = 15.0 * dt + 0.5;
    let out = pipeline.process_frame(&frame(16, t, vec![weak, strong]));
    assert!(!out.arbitrated);
    assert_eq!(out.snapshot.head().unwrap().id, TrackId(1));
}

#[test]
fn empty_frames_are_tolerated_indefinitely() {
    let mut pipeline = Pipeline::new(PipelineConfig::default(), 0.0);
    pipeline.process_frame(&frame(0, 0.0, vec![det(0, 0, 20, 20, 0.9)]));
    for k in 1..200u64 {
        let out = pipeline.process_frame(&frame(k, k as f64 * 0.05, Vec::new()));
        if k >= 2 {
            assert_eq!(out.snapshot.active_count, 0);
        }
    }
    assert_eq!(pipeline.frames_processed(), 200);
}
