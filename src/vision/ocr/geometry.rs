// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Mapping detected polygons from detection-view space to recognition-view space

use tracing::debug;

/// Pixels added on every side of a mapped box
pub const REGION_PAD: i64 = 5;

/// Width and height of one normalized view
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ViewSize {
    pub width: u32,
    pub height: u32,
}

impl ViewSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &image::RgbImage) -> Self {
        Self::new(image.width(), image.height())
    }
}

/// Region proposal in detection-view pixels
///
/// Usually 4 corner points, not necessarily axis aligned. Downstream code
/// only uses the bounding box of the points.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<[f32; 2]>,
}

impl Polygon {
    pub fn new(points: Vec<[f32; 2]>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle as a 4-point polygon (clockwise from top-left)
    pub fn from_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(vec![[x1, y1], [x2, y1], [x2, y2], [x1, y2]])
    }

    /// At least 4 points, all finite
    pub fn is_well_formed(&self) -> bool {
        self.points.len() >= 4
            && self
                .points
                .iter()
                .all(|[x, y]| x.is_finite() && y.is_finite())
    }

    /// Top-left corner of the bounding box, used for reading order
    pub fn top_left(&self) -> (f32, f32) {
        self.points.iter().fold((f32::MAX, f32::MAX), |(mx, my), [x, y]| {
            (mx.min(*x), my.min(*y))
        })
    }
}

/// Padded, clamped box in recognition-view pixels
///
/// `index` is the position of the source polygon in detection order.
/// Invariant: `x2 > x1 && y2 > y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledRegion {
    pub index: usize,
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl ScaledRegion {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Rescale polygons into recognition space and turn them into padded boxes
///
/// Malformed polygons and boxes with no area after clamping are dropped.
/// Output order follows input order.
pub fn map_polygons(polygons: &[Polygon], det: ViewSize, rec: ViewSize) -> Vec<ScaledRegion> {
    if det.width == 0 || det.height == 0 {
        debug!("Detection view is empty, no regions to map");
        return Vec::new();
    }

    let scale_x = rec.width as f64 / det.width as f64;
    let scale_y = rec.height as f64 / det.height as f64;
    debug!(
        "Mapping {} polygon(s) {}x{} -> {}x{} (scale_x={:.3}, scale_y={:.3})",
        polygons.len(),
        det.width,
        det.height,
        rec.width,
        rec.height,
        scale_x,
        scale_y
    );

    polygons
        .iter()
        .enumerate()
        .filter_map(|(index, polygon)| map_one(index, polygon, scale_x, scale_y, rec))
        .collect()
}

fn map_one(
    index: usize,
    polygon: &Polygon,
    scale_x: f64,
    scale_y: f64,
    rec: ViewSize,
) -> Option<ScaledRegion> {
    if !polygon.is_well_formed() {
        debug!("Region {}: skipped, malformed polygon {:?}", index, polygon.points);
        return None;
    }

    // Truncate toward zero after scaling
    let xs: Vec<i64> = polygon
        .points
        .iter()
        .map(|p| (p[0] as f64 * scale_x) as i64)
        .collect();
    let ys: Vec<i64> = polygon
        .points
        .iter()
        .map(|p| (p[1] as f64 * scale_y) as i64)
        .collect();

    let min_x = xs.iter().copied().min()?;
    let max_x = xs.iter().copied().max()?;
    let min_y = ys.iter().copied().min()?;
    let max_y = ys.iter().copied().max()?;

    let x1 = (min_x - REGION_PAD).clamp(0, rec.width as i64);
    let y1 = (min_y - REGION_PAD).clamp(0, rec.height as i64);
    let x2 = (max_x + REGION_PAD).clamp(0, rec.width as i64);
    let y2 = (max_y + REGION_PAD).clamp(0, rec.height as i64);

    if x2 <= x1 || y2 <= y1 {
        debug!(
            "Region {}: skipped, empty box ({},{})-({},{})",
            index, x1, y1, x2, y2
        );
        return None;
    }

    debug!("Region {}: box ({},{})-({},{})", index, x1, y1, x2, y2);
    Some(ScaledRegion {
        index,
        x1: x1 as u32,
        y1: y1 as u32,
        x2: x2 as u32,
        y2: y2 as u32,
    })
}
