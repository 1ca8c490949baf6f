// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cropping recognition patches out of the recognition view

use image::{imageops, imageops::FilterType, RgbImage};
use tracing::debug;

use super::geometry::ScaledRegion;

/// Crops shorter than this are upscaled to exactly this height
pub const MIN_PATCH_HEIGHT: u32 = 48;

/// Crop a region and upscale it when it is shorter than [`MIN_PATCH_HEIGHT`]
///
/// Upscaling is uniform (bicubic), so the width follows
/// `round(width * 48 / height)`. Tall crops are never downscaled.
/// The region must lie inside `view`, which `map_polygons` guarantees.
pub fn extract_patch(view: &RgbImage, region: &ScaledRegion) -> RgbImage {
    let width = region.width();
    let height = region.height();
    let crop = imageops::crop_imm(view, region.x1, region.y1, width, height).to_image();

    if height >= MIN_PATCH_HEIGHT {
        debug!("Region {}: crop {}x{}", region.index, width, height);
        return crop;
    }

    let scale = MIN_PATCH_HEIGHT as f64 / height as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    debug!(
        "Region {}: upscaled crop {}x{} -> {}x{}",
        region.index, width, height, new_width, MIN_PATCH_HEIGHT
    );
    imageops::resize(&crop, new_width, MIN_PATCH_HEIGHT, FilterType::CatmullRom)
}
