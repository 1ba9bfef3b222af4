//! Candidate regions: connected foreground components of a binary image.

use image::GrayImage;

use crate::geometry::Rect;

/// One connected foreground component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Bounding box in image coordinates
    pub bounds: Rect,
    /// Foreground pixel count
    pub area: u32,
}

/// Finds 8-connected components of non-zero pixels with at least
/// `min_area` pixels.
///
/// Components are returned in raster-scan discovery order of their first
/// pixel, which makes the output stable for a given image.
pub fn find_candidates(binary: &GrayImage, min_area: u32) -> Vec<Candidate> {
    let (width, height) = binary.dimensions();
    let mut visited = vec![false; (width * height) as usize];
    let mut stack: Vec<(u32, u32)> = Vec::new();
    let mut candidates = Vec::new();

    let index = |x: u32, y: u32| (y * width + x) as usize;

    for y in 0..height {
        for x in 0..width {
            if visited[index(x, y)] || binary.get_pixel(x, y)[0] == 0 {
                continue;
            }

            visited[index(x, y)] = true;
            stack.push((x, y));
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
            let mut area = 0u32;

            while let Some((cx, cy)) = stack.pop() {
                area += 1;
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);

                for ny in cy.saturating_sub(1)..=(cy + 1).min(height - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(width - 1) {
                        let i = index(nx, ny);
                        if !visited[i] && binary.get_pixel(nx, ny)[0] != 0 {
                            visited[i] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            if area >= min_area {
                candidates.push(Candidate {
                    bounds: Rect::from_corners(
                        min_x as i32,
                        min_y as i32,
                        max_x as i32 + 1,
                        max_y as i32 + 1,
                    ),
                    area,
                });
            }
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn fill(img: &mut GrayImage, rect: Rect) {
        for y in rect.top..rect.bottom {
            for x in rect.left..rect.right {
                img.put_pixel(x as u32, y as u32, Luma([255]));
            }
        }
    }

    #[test]
    fn test_components_in_raster_order() {
        let mut img = GrayImage::new(60, 40);
        fill(&mut img, Rect::from_xywh(40, 2, 10, 10));
        fill(&mut img, Rect::from_xywh(5, 20, 10, 10));
        fill(&mut img, Rect::from_xywh(30, 30, 2, 2));

        let found = find_candidates(&img, 50);
        assert_eq!(
            found,
            vec![
                Candidate { bounds: Rect::from_xywh(40, 2, 10, 10), area: 100 },
                Candidate { bounds: Rect::from_xywh(5, 20, 10, 10), area: 100 },
            ]
        );
    }

    #[test]
    fn test_diagonal_pixels_are_connected() {
        let mut img = GrayImage::new(5, 5);
        for i in 0..5 {
            img.put_pixel(i, i, Luma([255]));
        }
        let found = find_candidates(&img, 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].area, 5);
        assert_eq!(found[0].bounds, Rect::from_xywh(0, 0, 5, 5));
    }
}
