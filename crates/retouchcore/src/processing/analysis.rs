//! Colour-space helpers and the content heuristic used to pick an upscale model.

use image::{DynamicImage, RgbImage};

/// Mean saturation above which an image is considered anime-like (0-255 scale)
pub const ANIME_SATURATION_THRESHOLD: f64 = 100.0;

/// Mean value (brightness) above which an image is considered anime-like (0-255 scale)
pub const ANIME_VALUE_THRESHOLD: f64 = 130.0;

/// Side of the thumbnail the heuristic samples; means barely move at this size.
const SAMPLE_SIDE: u32 = 256;

/// Converts RGB to HSV. Hue is in degrees `[0, 360)`, saturation and value in `[0, 1]`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    (hue, saturation, max)
}

/// Converts HSV (hue in degrees, saturation and value in `[0, 1]`) back to RGB.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_u8 = |channel: f32| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}

/// Mean HSV saturation and value of an image, both on a 0-255 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvMeans {
    pub saturation: f64,
    pub value: f64,
}

pub fn hsv_means(img: &RgbImage) -> HsvMeans {
    let count = u64::from(img.width()) * u64::from(img.height());
    if count == 0 {
        return HsvMeans {
            saturation: 0.0,
            value: 0.0,
        };
    }

    let (mut s_sum, mut v_sum) = (0.0f64, 0.0f64);
    for pixel in img.pixels() {
        let [r, g, b] = pixel.0;
        let (_, s, v) = rgb_to_hsv(r, g, b);
        s_sum += f64::from(s) * 255.0;
        v_sum += f64::from(v) * 255.0;
    }

    HsvMeans {
        saturation: s_sum / count as f64,
        value: v_sum / count as f64,
    }
}

/// Guesses whether the picture is drawn (anime/cartoon) rather than photographed:
/// drawn art is both more saturated and brighter on average.
pub fn is_anime_image(img: &DynamicImage) -> bool {
    let sample = if img.width() > SAMPLE_SIDE || img.height() > SAMPLE_SIDE {
        img.thumbnail(SAMPLE_SIDE, SAMPLE_SIDE).to_rgb8()
    } else {
        img.to_rgb8()
    };
    let means = hsv_means(&sample);
    means.saturation > ANIME_SATURATION_THRESHOLD && means.value > ANIME_VALUE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([r, g, b])))
    }

    #[test]
    fn test_rgb_to_hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0.0, 1.0, 1.0));
        assert_eq!(rgb_to_hsv(0, 255, 0), (120.0, 1.0, 1.0));
        assert_eq!(rgb_to_hsv(0, 0, 255), (240.0, 1.0, 1.0));
        assert_eq!(rgb_to_hsv(0, 0, 0), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_hsv_roundtrip_keeps_colour() {
        for (r, g, b) in [(255, 0, 0), (12, 200, 90), (128, 128, 128), (250, 180, 30)] {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (r2, g2, b2) = hsv_to_rgb(h, s, v);
            assert!((i16::from(r) - i16::from(r2)).abs() <= 1);
            assert!((i16::from(g) - i16::from(g2)).abs() <= 1);
            assert!((i16::from(b) - i16::from(b2)).abs() <= 1);
        }
    }

    #[test]
    fn test_hsv_means_of_gray_has_no_saturation() {
        let means = hsv_means(&solid(128, 128, 128).to_rgb8());
        assert_eq!(means.saturation, 0.0);
        assert!((means.value - 128.0).abs() < 0.5);
    }

    #[test]
    fn test_bright_saturated_image_is_anime() {
        assert!(is_anime_image(&solid(255, 80, 200)));
    }

    #[test]
    fn test_muted_or_dark_image_is_photo() {
        assert!(!is_anime_image(&solid(120, 110, 100)));
        // Saturated but too dark
        assert!(!is_anime_image(&solid(100, 0, 0)));
    }

    #[test]
    fn test_large_image_is_sampled() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1024, 600, Rgb([255, 80, 200])));
        assert!(is_anime_image(&img));
    }
}
