use image::{GrayImage, Luma, RgbaImage};

use crate::automation::config::RelativeRect;

/// Pixel offset and size of a relative region inside a `w`x`h` image.
///
/// Clamped to the image bounds.
pub fn region_bounds(w: u32, h: u32, region: &RelativeRect) -> (u32, u32, u32, u32) {
    let x0 = ((region.x.max(0.0) * w as f32) as u32).min(w);
    let y0 = ((region.y.max(0.0) * h as f32) as u32).min(h);
    let rw = ((region.width.max(0.0) * w as f32) as u32).min(w - x0);
    let rh = ((region.height.max(0.0) * h as f32) as u32).min(h - y0);
    (x0, y0, rw, rh)
}

/// Otsu's threshold: the gray level that maximizes between-class variance.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in img.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut best_level = 0u8;
    let mut best_variance = 0.0f64;
    let mut background_count = 0u64;
    let mut background_sum = 0.0f64;

    for (level, &count) in histogram.iter().enumerate() {
        background_count += count;
        if background_count == 0 {
            continue;
        }
        let foreground_count = total - background_count;
        if foreground_count == 0 {
            break;
        }
        background_sum += level as f64 * count as f64;

        let mean_bg = background_sum / background_count as f64;
        let mean_fg = (weighted_total - background_sum) / foreground_count as f64;
        let variance =
            background_count as f64 * foreground_count as f64 * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Grayscale, Gaussian blur, then inverted Otsu threshold.
///
/// Pixels at or below the threshold (dark) become 255 foreground;
/// everything else becomes 0.
pub fn binarize(img: &RgbaImage, blur_sigma: f32) -> GrayImage {
    let gray = image::imageops::grayscale(img);
    let blurred = if blur_sigma > 0.0 {
        image::imageops::blur(&gray, blur_sigma)
    } else {
        gray
    };

    let level = otsu_level(&blurred);
    let (width, height) = blurred.dimensions();
    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in blurred.enumerate_pixels() {
        let value = if pixel[0] <= level { 255u8 } else { 0u8 };
        output.put_pixel(x, y, Luma([value]));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_region_bounds() {
        let region = RelativeRect { x: 0.1, y: 0.25, width: 0.5, height: 0.1 };
        assert_eq!(region_bounds(100, 200, &region), (10, 50, 50, 20));
    }

    #[test]
    fn test_region_bounds_clamps() {
        let region = RelativeRect { x: 0.9, y: 0.9, width: 0.5, height: 0.5 };
        assert_eq!(region_bounds(100, 100, &region), (90, 90, 10, 10));
        let outside = RelativeRect { x: 1.5, y: -0.2, width: 0.5, height: 0.5 };
        assert_eq!(region_bounds(100, 100, &outside), (100, 0, 0, 50));
    }

    #[test]
    fn test_otsu_splits_bimodal() {
        let img: GrayImage = ImageBuffer::from_fn(10, 10, |x, _| Luma([if x < 5 { 40 } else { 200 }]));
        let level = otsu_level(&img);
        assert!((40..200).contains(&level), "level {}", level);
    }

    #[test]
    fn test_binarize_marks_dark_as_foreground() {
        let img: RgbaImage = ImageBuffer::from_fn(20, 20, |x, _| {
            if x < 10 {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([230, 230, 230, 255])
            }
        });
        let binary = binarize(&img, 0.0);
        assert_eq!(binary.get_pixel(2, 5)[0], 255);
        assert_eq!(binary.get_pixel(17, 5)[0], 0);
    }
}
