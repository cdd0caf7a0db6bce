use serde::{Deserialize, Serialize};

/// Pixel format of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (4 bytes per pixel).
    Rgba8,
    /// 8-bit RGB (3 bytes per pixel, no alpha).
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// Fraction of the sprite half-size where the feathered edge begins.
const FEATHER_INNER: f32 = 0.40;
/// Fraction of the sprite half-size where the feathered edge ends.
const FEATHER_OUTER: f32 = 0.50;
/// Maximum erase strength at the outer feather radius.
const FEATHER_STRENGTH: f32 = 0.95;

/// A single video frame as a raw pixel buffer.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let size = (width as usize) * (height as usize) * format.bytes_per_pixel();
        Self {
            data: vec![0u8; size],
            width,
            height,
            format,
        }
    }

    /// Create a frame buffer filled with a solid RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgba);
        }
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
        }
    }

    /// Wrap raw RGBA8 data. Returns None if the data length does not match.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
        })
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        match self.format {
            PixelFormat::Rgba8 => Some([
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
                self.data[offset + 3],
            ]),
            PixelFormat::Rgb8 => Some([
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
                255,
            ]),
        }
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        match self.format {
            PixelFormat::Rgba8 => {
                self.data[offset] = rgba[0];
                self.data[offset + 1] = rgba[1];
                self.data[offset + 2] = rgba[2];
                self.data[offset + 3] = rgba[3];
            }
            PixelFormat::Rgb8 => {
                self.data[offset] = rgba[0];
                self.data[offset + 1] = rgba[1];
                self.data[offset + 2] = rgba[2];
            }
        }
    }

    /// Nearest-neighbor resize to the given dimensions.
    ///
    /// Used to fit streamed base frames onto the canvas. Returns a clone when
    /// the dimensions already match.
    pub fn resized(&self, width: u32, height: u32) -> FrameBuffer {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = FrameBuffer::new(width, height, PixelFormat::Rgba8);
        if width == 0 || height == 0 || self.width == 0 || self.height == 0 {
            return out;
        }
        for y in 0..height {
            let sy = (y as u64 * self.height as u64 / height as u64) as u32;
            for x in 0..width {
                let sx = (x as u64 * self.width as u64 / width as u64) as u32;
                if let Some(px) = self.get_pixel(sx, sy) {
                    out.set_pixel(x, y, px);
                }
            }
        }
        out
    }

    /// Copy a rectangular region out of this buffer.
    ///
    /// The rectangle is clipped against the buffer bounds; pixels outside
    /// stay transparent in the result.
    pub fn cropped(&self, x: u32, y: u32, width: u32, height: u32) -> FrameBuffer {
        let mut out = FrameBuffer::new(width, height, PixelFormat::Rgba8);
        for oy in 0..height {
            for ox in 0..width {
                if let Some(px) = self.get_pixel(x + ox, y + oy) {
                    out.set_pixel(ox, oy, px);
                }
            }
        }
        out
    }

    /// Alpha-composite `src` on top of `self` at position (dx, dy).
    /// Uses integer math in a per-row loop that auto-vectorizes well.
    pub fn composite_over(&mut self, src: &FrameBuffer, dx: i32, dy: i32) {
        if self.format != PixelFormat::Rgba8 || src.format != PixelFormat::Rgba8 {
            return;
        }

        let dst_width = self.width as i32;
        let dst_height = self.height as i32;

        let mut start_y = 0;
        let mut end_y = src.height as i32;
        let mut start_x = 0;
        let mut end_x = src.width as i32;

        if dy < 0 {
            start_y = -dy;
        }
        if dy + end_y > dst_height {
            end_y = dst_height - dy;
        }
        if dx < 0 {
            start_x = -dx;
        }
        if dx + end_x > dst_width {
            end_x = dst_width - dx;
        }

        if start_x >= end_x || start_y >= end_y {
            return;
        }

        let src_stride = (src.width * 4) as usize;
        let dst_stride = (self.width * 4) as usize;

        for sy in start_y..end_y {
            let dst_y = dy + sy;
            let src_row_start = (sy as usize * src_stride) + (start_x as usize * 4);
            let dst_row_start = (dst_y as usize * dst_stride) + ((dx + start_x) as usize * 4);
            let len = (end_x - start_x) as usize * 4;

            let src_slice = &src.data[src_row_start..src_row_start + len];
            let dst_slice = &mut self.data[dst_row_start..dst_row_start + len];

            for (s, d) in src_slice.chunks_exact(4).zip(dst_slice.chunks_exact_mut(4)) {
                blend_pixel(d, s, s[3] as u32);
            }
        }
    }

    /// Composite `src` on top of `self` at (dx, dy) with feathered edges.
    ///
    /// Reproduces the radial falloff the overlay sprites were authored
    /// against: fully opaque inside 40% of the half-size, erased up to 95%
    /// at 50% and beyond. This softens the seam between the streamed mouth
    /// patch and the base frame underneath.
    pub fn composite_feathered(&mut self, src: &FrameBuffer, dx: i32, dy: i32) {
        if self.format != PixelFormat::Rgba8 || src.format != PixelFormat::Rgba8 {
            return;
        }
        if src.width == 0 || src.height == 0 {
            return;
        }

        let center_x = src.width as f32 / 2.0;
        let center_y = src.height as f32 / 2.0;
        let min_dim = src.width.min(src.height) as f32;
        let inner = min_dim * FEATHER_INNER;
        let outer = min_dim * FEATHER_OUTER;

        for sy in 0..src.height {
            for sx in 0..src.width {
                let tx = dx + sx as i32;
                let ty = dy + sy as i32;
                if tx < 0 || ty < 0 || tx >= self.width as i32 || ty >= self.height as i32 {
                    continue;
                }

                let fx = sx as f32 + 0.5 - center_x;
                let fy = sy as f32 + 0.5 - center_y;
                let dist = (fx * fx + fy * fy).sqrt();
                let erase = if dist <= inner {
                    0.0
                } else if dist >= outer {
                    FEATHER_STRENGTH
                } else {
                    FEATHER_STRENGTH * (dist - inner) / (outer - inner)
                };

                let src_off = ((sy as usize) * (src.width as usize) + sx as usize) * 4;
                let s = &src.data[src_off..src_off + 4];
                let sa = (s[3] as f32 * (1.0 - erase)) as u32;
                if sa == 0 {
                    continue;
                }

                let dst_off = ((ty as usize) * (self.width as usize) + tx as usize) * 4;
                let d = &mut self.data[dst_off..dst_off + 4];
                blend_pixel(d, s, sa);
            }
        }
    }
}

/// Standard "over" blend of a single source pixel onto a destination pixel,
/// with the source alpha supplied separately (so callers can pre-attenuate).
#[inline]
fn blend_pixel(d: &mut [u8], s: &[u8], sa: u32) {
    if sa == 0 {
        return;
    }
    if sa == 255 {
        d[0] = s[0];
        d[1] = s[1];
        d[2] = s[2];
        d[3] = 255;
        return;
    }

    let da = d[3] as u32;
    let inv_sa = 255 - sa;
    let out_a = sa + ((da * inv_sa) / 255);
    if out_a == 0 {
        return;
    }

    let out_r = (s[0] as u32 * sa * 255 + d[0] as u32 * da * inv_sa) / (out_a * 255);
    let out_g = (s[1] as u32 * sa * 255 + d[1] as u32 * da * inv_sa) / (out_a * 255);
    let out_b = (s[2] as u32 * sa * 255 + d[2] as u32 * da * inv_sa) / (out_a * 255);

    d[0] = out_r as u8;
    d[1] = out_g as u8;
    d[2] = out_b as u8;
    d[3] = out_a as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    #[test]
    fn test_frame_buffer_new() {
        let fb = FrameBuffer::new(320, 240, PixelFormat::Rgba8);
        assert_eq!(fb.width, 320);
        assert_eq!(fb.height, 240);
        assert_eq!(fb.byte_size(), 320 * 240 * 4);
        assert_eq!(fb.pixel_count(), 320 * 240);
    }

    #[test]
    fn test_frame_buffer_solid() {
        let fb = FrameBuffer::solid(2, 2, RED);
        assert_eq!(fb.get_pixel(0, 0), Some(RED));
        assert_eq!(fb.get_pixel(1, 1), Some(RED));
    }

    #[test]
    fn test_from_rgba8_length_check() {
        assert!(FrameBuffer::from_rgba8(2, 2, vec![0u8; 16]).is_some());
        assert!(FrameBuffer::from_rgba8(2, 2, vec![0u8; 15]).is_none());
    }

    #[test]
    fn test_get_set_pixel_out_of_bounds() {
        let mut fb = FrameBuffer::new(10, 10, PixelFormat::Rgba8);
        fb.set_pixel(5, 5, [128, 64, 32, 255]);
        assert_eq!(fb.get_pixel(5, 5), Some([128, 64, 32, 255]));
        assert_eq!(fb.get_pixel(10, 0), None);
        assert_eq!(fb.get_pixel(0, 10), None);
    }

    #[test]
    fn test_resized_same_dimensions() {
        let fb = FrameBuffer::solid(4, 4, RED);
        let out = fb.resized(4, 4);
        assert_eq!(out.get_pixel(3, 3), Some(RED));
    }

    #[test]
    fn test_resized_upscale() {
        let fb = FrameBuffer::solid(2, 2, BLUE);
        let out = fb.resized(8, 8);
        assert_eq!(out.width, 8);
        assert_eq!(out.height, 8);
        assert_eq!(out.get_pixel(0, 0), Some(BLUE));
        assert_eq!(out.get_pixel(7, 7), Some(BLUE));
    }

    #[test]
    fn test_cropped_clips_to_bounds() {
        let fb = FrameBuffer::solid(4, 4, RED);
        let out = fb.cropped(2, 2, 4, 4);
        // In-bounds region copied, out-of-bounds stays transparent.
        assert_eq!(out.get_pixel(0, 0), Some(RED));
        assert_eq!(out.get_pixel(3, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_composite_over_opaque() {
        let mut dst = FrameBuffer::solid(4, 4, BLUE);
        let src = FrameBuffer::solid(2, 2, RED);
        dst.composite_over(&src, 1, 1);
        assert_eq!(dst.get_pixel(1, 1), Some(RED));
        assert_eq!(dst.get_pixel(2, 2), Some(RED));
        assert_eq!(dst.get_pixel(0, 0), Some(BLUE));
    }

    #[test]
    fn test_composite_over_transparent() {
        let mut dst = FrameBuffer::solid(4, 4, WHITE);
        let src = FrameBuffer::new(2, 2, PixelFormat::Rgba8);
        dst.composite_over(&src, 0, 0);
        assert_eq!(dst.get_pixel(0, 0), Some(WHITE));
    }

    #[test]
    fn test_composite_over_semi_transparent() {
        let mut dst = FrameBuffer::solid(2, 2, WHITE);
        let mut src = FrameBuffer::new(1, 1, PixelFormat::Rgba8);
        src.set_pixel(0, 0, [255, 0, 0, 128]);

        dst.composite_over(&src, 0, 0);

        let pixel = dst.get_pixel(0, 0).unwrap();
        assert!(pixel[0] > 200);
        assert!(pixel[1] > 50 && pixel[1] < 200);
        assert!(pixel[2] > 50 && pixel[2] < 200);
    }

    #[test]
    fn test_composite_feathered_center_opaque_edge_erased() {
        let mut dst = FrameBuffer::solid(20, 20, WHITE);
        let src = FrameBuffer::solid(20, 20, RED);
        dst.composite_feathered(&src, 0, 0);

        // Center stays fully red.
        assert_eq!(dst.get_pixel(10, 10), Some(RED));
        // Corner is past the outer radius: mostly the white underneath.
        let corner = dst.get_pixel(0, 0).unwrap();
        assert!(corner[1] > 180, "corner should keep most of the base: {corner:?}");
    }

    #[test]
    fn test_composite_feathered_clips_out_of_bounds() {
        let mut dst = FrameBuffer::solid(4, 4, WHITE);
        let src = FrameBuffer::solid(8, 8, RED);
        // Should not panic even though most of the sprite is off-canvas.
        dst.composite_feathered(&src, -6, -6);
        assert_eq!(dst.width, 4);
    }
}
