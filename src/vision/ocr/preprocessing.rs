// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image normalization for the two-view OCR pipeline
//!
//! Every page is turned into two independently scaled views:
//! - a *detection view*, upscaled aggressively so small print is found
//! - a *recognition view*, scaled for character-level legibility
//!
//! Both views share the source aspect ratio and get the same contrast
//! step: the a* (green-red) channel of CIE L*a*b* is histogram
//! equalized, which flattens the pink security background of
//! registration forms while leaving the luminance untouched.

use image::{imageops, imageops::FilterType, GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array4;
use tracing::{debug, warn};

use super::OcrError;
use crate::vision::image_utils::SourcePage;

/// Recognition model input height (PP-OCR style recognizers use 48)
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum width for recognition model input
pub const REC_MAX_WIDTH: u32 = 2048;

/// Minimum width for recognition model input
pub const REC_MIN_WIDTH: u32 = 4;

/// Detection input sides must be multiples of this
pub const DET_SIZE_MULTIPLE: u32 = 32;

/// Mean values for detection normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for detection normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Adaptive threshold neighbourhood (pixels) and offset for detector input
const ADAPTIVE_BLOCK_SIZE: u32 = 31;
const ADAPTIVE_OFFSET: f32 = 15.0;

/// Which view a page is being normalized for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Detection,
    Recognition,
}

/// Resize policy for one view mode, keyed on `max(width, height)`
#[derive(Debug, Clone, Copy)]
struct ScalePolicy {
    /// Pages larger than this are downscaled...
    downscale_above: u32,
    /// ...so their longest side is this
    downscale_to: u32,
    /// Pages smaller than this are upscaled...
    upscale_below: u32,
    /// ...so their longest side is this
    upscale_to: u32,
}

impl ViewMode {
    fn policy(self) -> ScalePolicy {
        match self {
            ViewMode::Detection => ScalePolicy {
                downscale_above: 5000,
                downscale_to: 3200,
                upscale_below: 2000,
                upscale_to: 2400,
            },
            ViewMode::Recognition => ScalePolicy {
                downscale_above: 4000,
                downscale_to: 2400,
                upscale_below: 1200,
                upscale_to: 1600,
            },
        }
    }
}

/// Target dimensions for a page of `width` x `height` in the given mode
///
/// One factor is applied to both axes so the aspect ratio survives up
/// to rounding. Returns the input unchanged when no resize applies.
pub fn scaled_dimensions(width: u32, height: u32, mode: ViewMode) -> (u32, u32) {
    let max_side = width.max(height);
    if max_side == 0 {
        return (width, height);
    }

    let policy = mode.policy();
    let target = if max_side > policy.downscale_above {
        policy.downscale_to
    } else if max_side < policy.upscale_below {
        policy.upscale_to
    } else {
        return (width, height);
    };

    let factor = target as f64 / max_side as f64;
    let scale = |side: u32| ((side as f64 * factor).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Produce the detection or recognition view of a page
///
/// The source page is never modified.
pub fn normalize(page: &SourcePage, mode: ViewMode) -> RgbImage {
    let (width, height) = (page.width(), page.height());
    let (new_w, new_h) = scaled_dimensions(width, height, mode);

    let resized = if (new_w, new_h) == (width, height) {
        page.image().clone()
    } else if new_w < width {
        debug!(
            "[{:?}] Downscaled from {}px to {}px",
            mode,
            width.max(height),
            new_w.max(new_h)
        );
        // Box-filter sampling, the area-averaging equivalent
        imageops::thumbnail(page.image(), new_w, new_h)
    } else {
        debug!(
            "[{:?}] Upscaled from {}px to {}px",
            mode,
            width.max(height),
            new_w.max(new_h)
        );
        imageops::resize(page.image(), new_w, new_h, FilterType::Lanczos3)
    };

    enhance_contrast(resized)
}

/// Best-effort background suppression; returns the input on failure
pub fn enhance_contrast(image: RgbImage) -> RgbImage {
    match try_enhance_contrast(&image) {
        Ok(enhanced) => enhanced,
        Err(e) => {
            warn!("Contrast enhancement failed, using original: {}", e);
            image
        }
    }
}

/// Equalize the a* channel of the image in L*a*b* space
pub fn try_enhance_contrast(image: &RgbImage) -> Result<RgbImage, OcrError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(OcrError::InvalidInput("image has no pixels".to_string()));
    }

    let pixel_count = (width as usize) * (height as usize);
    let mut l_plane = Vec::with_capacity(pixel_count);
    let mut a_plane = Vec::with_capacity(pixel_count);
    let mut b_plane = Vec::with_capacity(pixel_count);

    for pixel in image.pixels() {
        let [l, a, b] = rgb_to_lab8(pixel.0);
        l_plane.push(l);
        a_plane.push(a);
        b_plane.push(b);
    }

    let a_channel = GrayImage::from_raw(width, height, a_plane)
        .ok_or_else(|| OcrError::InvalidInput("chroma plane size mismatch".to_string()))?;
    let a_equalized = imageproc::contrast::equalize_histogram(&a_channel);

    let mut output = RgbImage::new(width, height);
    for (idx, (x, y, pixel)) in output.enumerate_pixels_mut().enumerate() {
        let a = a_equalized.get_pixel(x, y).0[0];
        *pixel = Rgb(lab8_to_rgb([l_plane[idx], a, b_plane[idx]]));
    }

    Ok(output)
}

/// Gaussian adaptive threshold of the luminance, as the detector input
///
/// A pixel becomes white when it is brighter than its Gaussian-weighted
/// neighbourhood mean minus a small offset; text strokes become black.
pub fn binarize_for_detection(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let gray = imageops::grayscale(image);
    // OpenCV's sigma for a given Gaussian kernel size
    let sigma = 0.3 * ((ADAPTIVE_BLOCK_SIZE as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let local_mean = imageproc::filter::gaussian_blur_f32(&gray, sigma);

    let mut binary = GrayImage::new(width, height);
    for (x, y, out) in binary.enumerate_pixels_mut() {
        let value = gray.get_pixel(x, y).0[0] as f32;
        let threshold = local_mean.get_pixel(x, y).0[0] as f32 - ADAPTIVE_OFFSET;
        *out = Luma([if value > threshold { 255 } else { 0 }]);
    }

    RgbImage::from_fn(width, height, |x, y| {
        let v = binary.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

/// Ratios between a detection tensor and the image it was built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionScale {
    pub ratio_w: f32,
    pub ratio_h: f32,
}

impl DetectionScale {
    /// Map a point from tensor space back to image space
    pub fn to_image(&self, x: f32, y: f32) -> (f32, f32) {
        (x / self.ratio_w, y / self.ratio_h)
    }
}

/// Dimensions of the detection tensor for an image
///
/// The longest side is capped at `limit_side_len`, then both sides are
/// rounded to a multiple of 32 as the DB backbone requires.
pub fn detection_input_size(width: u32, height: u32, limit_side_len: u32) -> (u32, u32) {
    let max_side = width.max(height).max(1);
    let ratio = if max_side > limit_side_len {
        limit_side_len as f32 / max_side as f32
    } else {
        1.0
    };

    let round_to_multiple = |side: u32| {
        let scaled = side as f32 * ratio;
        let rounded = (scaled / DET_SIZE_MULTIPLE as f32).round() as u32 * DET_SIZE_MULTIPLE;
        rounded.max(DET_SIZE_MULTIPLE)
    };

    (round_to_multiple(width), round_to_multiple(height))
}

/// Build the NCHW detection tensor and its scale back to image space
pub fn detection_tensor(image: &RgbImage, limit_side_len: u32) -> (Array4<f32>, DetectionScale) {
    let (width, height) = image.dimensions();
    let (new_w, new_h) = detection_input_size(width, height, limit_side_len);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let mut tensor = Array4::zeros((1, 3, new_h as usize, new_w as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let normalized = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
            tensor[[0, c, y as usize, x as usize]] = normalized;
        }
    }

    let scale = DetectionScale {
        ratio_w: new_w as f32 / width.max(1) as f32,
        ratio_h: new_h as f32 / height.max(1) as f32,
    };

    (tensor, scale)
}

/// Build the NCHW recognition tensor: height 48, dynamic width
pub fn recognition_tensor(patch: &RgbImage) -> Array4<f32> {
    let (orig_w, orig_h) = patch.dimensions();

    let scale = REC_INPUT_HEIGHT as f32 / orig_h.max(1) as f32;
    let new_width = ((orig_w as f32 * scale).round() as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);

    let resized = imageops::resize(patch, new_width, REC_INPUT_HEIGHT, FilterType::Lanczos3);

    let mut tensor = Array4::zeros((1, 3, REC_INPUT_HEIGHT as usize, new_width as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - 0.5) / 0.5;
        }
    }

    tensor
}

// --- CIE L*a*b* with the usual 8-bit encoding (L*255/100, a+128, b+128) ---

const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;
const LAB_EPSILON: f32 = 0.008856;
const LAB_KAPPA: f32 = 903.3;

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f32) -> f32 {
    let cube = f * f * f;
    if cube > LAB_EPSILON {
        cube
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn rgb_to_lab8(rgb: [u8; 3]) -> [u8; 3] {
    let r = srgb_to_linear(rgb[0] as f32 / 255.0);
    let g = srgb_to_linear(rgb[1] as f32 / 255.0);
    let b = srgb_to_linear(rgb[2] as f32 / 255.0);

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / WHITE_X;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / WHITE_Z;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = if y > LAB_EPSILON {
        116.0 * fy - 16.0
    } else {
        LAB_KAPPA * y
    };
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);

    [to_u8(l * 255.0 / 100.0), to_u8(a + 128.0), to_u8(bb + 128.0)]
}

fn lab8_to_rgb(lab: [u8; 3]) -> [u8; 3] {
    let l = lab[0] as f32 * 100.0 / 255.0;
    let a = lab[1] as f32 - 128.0;
    let b = lab[2] as f32 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let y = if l > LAB_KAPPA * LAB_EPSILON {
        fy * fy * fy
    } else {
        l / LAB_KAPPA
    };
    let x = lab_f_inv(fx) * WHITE_X;
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
    let g = -0.969256 * x + 1.875992 * y + 0.041556 * z;
    let bl = 0.055648 * x - 0.204043 * y + 1.057311 * z;

    [
        to_u8(linear_to_srgb(r.clamp(0.0, 1.0)) * 255.0),
        to_u8(linear_to_srgb(g.clamp(0.0, 1.0)) * 255.0),
        to_u8(linear_to_srgb(bl.clamp(0.0, 1.0)) * 255.0),
    ]
}
