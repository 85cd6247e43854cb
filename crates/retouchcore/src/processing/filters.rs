//! Local image filters serving each mode.
//!
//! These are CPU-bound and synchronous; [`super::LocalProcessor`] runs them on the
//! blocking thread pool. Every filter decodes whatever format `image` recognises and
//! returns a JPEG.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use super::analysis::{hsv_to_rgb, is_anime_image, rgb_to_hsv};
use super::{Mode, ProcessError, ProcessResult};
use crate::core::config::processing::MAX_OUTPUT_SIDE;

const JPEG_QUALITY: u8 = 92;

/// Upscale factor applied after face detail enhancement
const FACE_RESTORE_SCALE: u32 = 2;

const ILLUSTRATION_SATURATION_BOOST: f32 = 1.5;
const ILLUSTRATION_STRENGTH: f32 = 0.8;

const POSTER_LOW_THRESHOLD: f32 = 100.0;
const POSTER_HIGH_THRESHOLD: f32 = 200.0;

/// Resampling model picked for the upscale mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscaleModel {
    Photo,
    Anime,
}

impl UpscaleModel {
    pub fn detect(img: &DynamicImage) -> Self {
        if is_anime_image(img) {
            UpscaleModel::Anime
        } else {
            UpscaleModel::Photo
        }
    }

    /// Name of the network weights this model stands in for
    pub fn weights_name(&self) -> &'static str {
        match self {
            UpscaleModel::Photo => "RealESRGAN_x4plus",
            UpscaleModel::Anime => "RealESRGAN_x4plus_anime_6B",
        }
    }

    fn filter(&self) -> FilterType {
        match self {
            // Flat colour regions and hard line art keep crisper edges with Catmull-Rom
            UpscaleModel::Anime => FilterType::CatmullRom,
            UpscaleModel::Photo => FilterType::Lanczos3,
        }
    }
}

pub fn decode(bytes: &[u8]) -> ProcessResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| ProcessError::Decode(e.to_string()))
}

pub fn encode_jpeg(img: &DynamicImage) -> ProcessResult<Bytes> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY))
        .map_err(|e| ProcessError::Encode(e.to_string()))?;
    Ok(Bytes::from(buffer))
}

fn scaled_size(img: &DynamicImage, factor: u32) -> ProcessResult<(u32, u32)> {
    let too_large = || ProcessError::TooLarge {
        width: img.width().saturating_mul(factor),
        height: img.height().saturating_mul(factor),
        limit: MAX_OUTPUT_SIDE,
    };
    let width = img.width().checked_mul(factor).ok_or_else(too_large)?;
    let height = img.height().checked_mul(factor).ok_or_else(too_large)?;
    if width > MAX_OUTPUT_SIDE || height > MAX_OUTPUT_SIDE {
        return Err(too_large());
    }
    Ok((width, height))
}

/// Upscales by `factor`, choosing the resampling model from the image content.
pub fn upscale(img: &DynamicImage, factor: u32) -> ProcessResult<(DynamicImage, UpscaleModel)> {
    let model = UpscaleModel::detect(img);
    let (width, height) = scaled_size(img, factor.max(1))?;
    log::debug!(
        "Upscaling {}x{} -> {}x{} with {}",
        img.width(),
        img.height(),
        width,
        height,
        model.weights_name()
    );
    Ok((img.resize_exact(width, height, model.filter()), model))
}

/// Sharpens fine detail, then doubles the resolution.
pub fn restore_faces(img: &DynamicImage) -> ProcessResult<DynamicImage> {
    let (width, height) = scaled_size(img, FACE_RESTORE_SCALE)?;
    let sharpened = img.unsharpen(2.0, 3);
    Ok(sharpened.resize_exact(width, height, FilterType::Lanczos3))
}

/// Boosts saturation in HSV space and blends the result over the original.
pub fn illustrate(img: &DynamicImage) -> DynamicImage {
    let source = img.to_rgb8();
    let blend = |styled: u8, original: u8| -> u8 {
        (ILLUSTRATION_STRENGTH * f32::from(styled) + (1.0 - ILLUSTRATION_STRENGTH) * f32::from(original))
            .round()
            .clamp(0.0, 255.0) as u8
    };

    let output = RgbImage::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b] = source.get_pixel(x, y).0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let (sr, sg, sb) = hsv_to_rgb(h, (s * ILLUSTRATION_SATURATION_BOOST).min(1.0), v);
        Rgb([blend(sr, r), blend(sg, g), blend(sb, b)])
    });

    DynamicImage::ImageRgb8(output)
}

/// Renders strong edges white on black: Sobel gradient (L1 norm) with a one-step
/// hysteresis between the low and high thresholds.
pub fn posterize(img: &DynamicImage) -> DynamicImage {
    let gray = imageops::blur(&img.to_luma8(), 1.0);
    let (width, height) = gray.dimensions();

    let magnitude = sobel_magnitude(&gray);
    let at = |x: u32, y: u32| magnitude[(y * width + x) as usize];

    let edges = GrayImage::from_fn(width, height, |x, y| {
        let m = at(x, y);
        let is_edge = if m >= POSTER_HIGH_THRESHOLD {
            true
        } else if m >= POSTER_LOW_THRESHOLD {
            neighbours(x, y, width, height).any(|(nx, ny)| at(nx, ny) >= POSTER_HIGH_THRESHOLD)
        } else {
            false
        };
        Luma([if is_edge { 255 } else { 0 }])
    });

    DynamicImage::ImageLuma8(edges)
}

fn sobel_magnitude(gray: &GrayImage) -> Vec<f32> {
    let (width, height) = gray.dimensions();
    let mut magnitude = vec![0.0f32; (width as usize) * (height as usize)];
    if width < 3 || height < 3 {
        return magnitude;
    }

    let px = |x: u32, y: u32| f32::from(gray.get_pixel(x, y).0[0]);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
            magnitude[(y * width + x) as usize] = gx.abs() + gy.abs();
        }
    }
    magnitude
}

fn neighbours(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let xs = x.saturating_sub(1)..=(x + 1).min(width - 1);
    xs.flat_map(move |nx| (y.saturating_sub(1)..=(y + 1).min(height - 1)).map(move |ny| (nx, ny)))
        .filter(move |&(nx, ny)| (nx, ny) != (x, y))
}

/// Runs the filter for `mode` over encoded image bytes and returns a JPEG.
pub fn apply(mode: Mode, upscale_factor: u32, input: &[u8]) -> ProcessResult<Bytes> {
    let img = decode(input)?;
    let output = match mode {
        Mode::Upscale => {
            let (upscaled, model) = upscale(&img, upscale_factor)?;
            log::info!("Upscaled with {}", model.weights_name());
            upscaled
        }
        Mode::FaceRestore => restore_faces(&img)?,
        Mode::Illustration => illustrate(&img),
        Mode::Poster => posterize(&img),
    };
    encode_jpeg(&output)
}
