// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end pipeline behaviour over scripted models

use crate::common::{blank_page, FixedDetector, ScriptedRecognizer};
use docroute_node::vision::ocr::{OcrPipeline, Polygon, ViewSize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Two text lines in detection-view coordinates of a 600x400 page
fn two_lines() -> Vec<Polygon> {
    vec![
        Polygon::from_rect(200.0, 200.0, 1400.0, 300.0),
        Polygon::from_rect(200.0, 500.0, 1400.0, 600.0),
    ]
}

fn pipeline(detector: FixedDetector, recognizer: Arc<ScriptedRecognizer>) -> OcrPipeline {
    OcrPipeline::new(Arc::new(detector), recognizer)
}

#[test]
fn test_views_follow_scale_policy() {
    let recognizer = Arc::new(ScriptedRecognizer::new(Vec::new(), "x"));
    let result = pipeline(FixedDetector::new(Vec::new()), recognizer).process(&blank_page(600, 400));

    assert_eq!(result.detection_view, Some(ViewSize::new(2400, 1600)));
    assert_eq!(result.recognition_view, Some(ViewSize::new(1600, 1067)));
}

#[test]
fn test_recognized_lines_are_joined_in_order() {
    let recognizer = Arc::new(ScriptedRecognizer::new(
        vec![Ok("  Họ và tên  "), Ok("Đăng ký")],
        "unused",
    ));
    let result = pipeline(FixedDetector::new(two_lines()), recognizer.clone())
        .process(&blank_page(600, 400));

    assert_eq!(result.text, "Họ và tên\nĐăng ký");
    assert_eq!(result.lines, vec!["Họ và tên", "Đăng ký"]);
    assert_eq!(result.boxes_detected, 2);
    assert_eq!(result.regions_recognized, 2);
    assert!(!result.used_fallback);
    // No whole-image call
    assert_eq!(recognizer.seen().len(), 2);
}

#[test]
fn test_patches_are_at_least_recognition_height() {
    let recognizer = Arc::new(ScriptedRecognizer::new(vec![Ok("a"), Ok("b")], ""));
    pipeline(
        FixedDetector::new(vec![
            Polygon::from_rect(100.0, 100.0, 700.0, 110.0),
            Polygon::from_rect(100.0, 400.0, 700.0, 500.0),
        ]),
        recognizer.clone(),
    )
    .process(&blank_page(600, 400));

    let seen = recognizer.seen();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|&(_, h)| h >= 48));
}

#[test]
fn test_no_detections_recognizes_whole_image_once() {
    let recognizer = Arc::new(ScriptedRecognizer::new(Vec::new(), "CỘNG HÒA"));
    let detector = FixedDetector::new(Vec::new());
    let result = pipeline(detector, recognizer.clone()).process(&blank_page(600, 400));

    assert_eq!(result.text, "CỘNG HÒA");
    assert_eq!(result.boxes_detected, 0);
    assert!(result.used_fallback);
    assert_eq!(recognizer.seen(), vec![(1600, 1067)]);
}

#[test]
fn test_detection_failure_falls_back() {
    let detector = Arc::new(FixedDetector::failing());
    let recognizer = Arc::new(ScriptedRecognizer::new(Vec::new(), "fallback"));
    let result = OcrPipeline::new(detector.clone(), recognizer).process(&blank_page(300, 300));

    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.boxes_detected, 0);
    assert!(result.used_fallback);
    assert_eq!(result.text, "fallback");
}

#[test]
fn test_all_regions_empty_triggers_fallback() {
    let recognizer = Arc::new(ScriptedRecognizer::new(vec![Ok("   "), Ok("")], "whole page"));
    let result = pipeline(FixedDetector::new(two_lines()), recognizer.clone())
        .process(&blank_page(600, 400));

    assert_eq!(result.boxes_detected, 2);
    assert!(result.used_fallback);
    assert_eq!(result.text, "whole page");
    assert_eq!(recognizer.seen().len(), 3);
}

#[test]
fn test_failed_region_is_dropped() {
    let recognizer = Arc::new(ScriptedRecognizer::new(
        vec![Err("bad patch"), Ok("second line")],
        "unused",
    ));
    let result = pipeline(FixedDetector::new(two_lines()), recognizer).process(&blank_page(600, 400));

    assert_eq!(result.lines, vec!["second line"]);
    assert!(!result.used_fallback);
}

#[test]
fn test_malformed_polygons_are_discarded() {
    let recognizer = Arc::new(ScriptedRecognizer::new(Vec::new(), "fallback"));
    let degenerate = vec![
        Polygon::new(vec![[10.0, 10.0], [20.0, 20.0]]),
        Polygon::from_rect(f32::NAN, 0.0, 100.0, 100.0),
    ];
    let result = pipeline(FixedDetector::new(degenerate), recognizer).process(&blank_page(600, 400));

    assert_eq!(result.boxes_detected, 2);
    assert_eq!(result.regions_recognized, 0);
    assert!(result.used_fallback);
}

#[test]
fn test_empty_fallback_yields_empty_text() {
    let recognizer = Arc::new(ScriptedRecognizer::new(Vec::new(), "   "));
    let result = pipeline(FixedDetector::new(Vec::new()), recognizer).process(&blank_page(200, 200));

    assert!(result.text.is_empty());
    assert!(result.lines.is_empty());
}

#[test]
fn test_pages_join_skipping_empty_pages() {
    let recognizer = Arc::new(ScriptedRecognizer::new(
        vec![Ok("page one"), Ok(""), Ok("page three")],
        "",
    ));
    let pages = vec![blank_page(300, 300), blank_page(300, 300), blank_page(300, 300)];
    let result = pipeline(FixedDetector::new(Vec::new()), recognizer).process_pages(&pages);

    assert_eq!(result.text, "page one\npage three");
    assert_eq!(result.lines.len(), 2);
}
