//! Draw targets for the engine's tile plan.

use image::{Pixel, Rgba, RgbaImage};

use crate::geometry::Rect;

/// Receives resident tiles in paint order.
pub trait RenderSurface {
    /// Blit `bitmap` stretched into `dest` (view coordinates).
    fn draw_tile(&mut self, bitmap: &RgbaImage, dest: Rect);
}

/// CPU surface compositing tiles into an RGBA buffer with nearest-neighbour
/// sampling.
pub struct SoftwareSurface {
    canvas: RgbaImage,
    background: Rgba<u8>,
}

impl SoftwareSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let background = Rgba([0, 0, 0, 255]);
        Self {
            canvas: RgbaImage::from_pixel(width, height, background),
            background,
        }
    }

    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self.clear();
        self
    }

    pub fn clear(&mut self) {
        for p in self.canvas.pixels_mut() {
            *p = self.background;
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }
}

impl RenderSurface for SoftwareSurface {
    fn draw_tile(&mut self, bitmap: &RgbaImage, dest: Rect) {
        let (bw, bh) = bitmap.dimensions();
        if bw == 0 || bh == 0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
            return;
        }
        let (cw, ch) = self.canvas.dimensions();
        let x0 = dest.x0.round().max(0.0) as u32;
        let y0 = dest.y0.round().max(0.0) as u32;
        let x1 = (dest.x1.round().max(0.0) as u32).min(cw);
        let y1 = (dest.y1.round().max(0.0) as u32).min(ch);
        let sx = bw as f64 / dest.width();
        let sy = bh as f64 / dest.height();

        for y in y0..y1 {
            let v = (((y as f64 + 0.5 - dest.y0) * sy) as u32).min(bh - 1);
            for x in x0..x1 {
                let u = (((x as f64 + 0.5 - dest.x0) * sx) as u32).min(bw - 1);
                self.canvas.get_pixel_mut(x, y).blend(bitmap.get_pixel(u, v));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_is_stretched_into_dest() {
        let mut surface = SoftwareSurface::new(8, 8);
        let tile = RgbaImage::from_fn(2, 2, |x, _| {
            if x == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        surface.draw_tile(&tile, Rect::new(0.0, 0.0, 4.0, 4.0));
        let img = surface.image();
        assert_eq!(img.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(3, 3).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(5, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_dest_outside_canvas_is_clipped() {
        let mut surface = SoftwareSurface::new(4, 4);
        let tile = RgbaImage::from_pixel(1, 1, Rgba([9, 9, 9, 255]));
        surface.draw_tile(&tile, Rect::new(-10.0, -10.0, 2.0, 2.0));
        assert_eq!(surface.image().get_pixel(1, 1).0, [9, 9, 9, 255]);
        assert_eq!(surface.image().get_pixel(2, 2).0, [0, 0, 0, 255]);
    }
}
