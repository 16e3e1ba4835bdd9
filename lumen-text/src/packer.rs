//! Shelf packing for atlas images.
//!
//! Rows (shelves) are stacked top to bottom; each shelf is as tall as the
//! first glyph that opened it. A glyph goes onto the first shelf with room,
//! otherwise a new shelf is opened below the last one.

use crate::raster::AtlasImage;

/// Pixel rectangle inside an atlas image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

struct Shelf {
    y: u32,
    height: u32,
    cursor_x: u32,
}

pub struct ShelfPacker {
    size: u32,
    padding: u32,
    shelves: Vec<Shelf>,
}

impl ShelfPacker {
    /// A packer for a square `size` x `size` image. `padding` empty pixels
    /// are kept between glyphs and along the image border.
    pub fn new(size: u32, padding: u32) -> Self {
        Self {
            size,
            padding,
            shelves: Vec::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Bottom edge of the last shelf.
    pub fn used_height(&self) -> u32 {
        self.shelves.last().map_or(0, |s| s.y + s.height)
    }

    /// Reserve a `width` x `height` rectangle, or `None` if it does not fit.
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<PackedRect> {
        let padded_w = width + self.padding;
        let padded_h = height + self.padding;

        for shelf in &mut self.shelves {
            if shelf.height >= padded_h && shelf.cursor_x + padded_w <= self.size {
                let rect = PackedRect {
                    x: shelf.cursor_x,
                    y: shelf.y,
                    width,
                    height,
                };
                shelf.cursor_x += padded_w;
                return Some(rect);
            }
        }

        let shelf_y = self.shelves.last().map_or(self.padding, |s| s.y + s.height);
        if shelf_y + padded_h > self.size || self.padding + padded_w > self.size {
            return None;
        }

        self.shelves.push(Shelf {
            y: shelf_y,
            height: padded_h,
            cursor_x: self.padding + padded_w,
        });
        Some(PackedRect {
            x: self.padding,
            y: shelf_y,
            width,
            height,
        })
    }
}

/// Copy an 8-bit coverage bitmap into `image` as white with alpha.
pub fn blit_coverage(image: &mut AtlasImage, rect: PackedRect, coverage: &[u8]) {
    for row in 0..rect.height {
        for col in 0..rect.width {
            let Some(&alpha) = coverage.get((row * rect.width + col) as usize) else {
                return;
            };
            let dst = (((rect.y + row) * image.width + rect.x + col) * 4) as usize;
            if let Some(px) = image.pixels.get_mut(dst..dst + 4) {
                px.copy_from_slice(&[255, 255, 255, alpha]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_glyph_respects_padding() {
        let mut packer = ShelfPacker::new(64, 2);
        let rect = packer.allocate(10, 12).unwrap();
        assert_eq!((rect.x, rect.y), (2, 2));
        assert_eq!(packer.used_height(), 2 + 14);
    }

    #[test]
    fn test_same_shelf_then_new_shelf() {
        let mut packer = ShelfPacker::new(32, 1);
        let a = packer.allocate(10, 10).unwrap();
        let b = packer.allocate(10, 10).unwrap();
        assert_eq!(a.y, b.y);
        assert_eq!(b.x, a.x + 11);
        // Third glyph no longer fits horizontally: 1 + 11 + 11 + 11 > 32.
        let c = packer.allocate(10, 10).unwrap();
        assert_eq!(c.x, 1);
        assert_eq!(c.y, a.y + 11);
    }

    #[test]
    fn test_taller_glyph_opens_shelf() {
        let mut packer = ShelfPacker::new(64, 0);
        packer.allocate(8, 8).unwrap();
        let tall = packer.allocate(8, 20).unwrap();
        assert_eq!(tall.y, 8);
    }

    #[test]
    fn test_full_packer_rejects() {
        let mut packer = ShelfPacker::new(16, 0);
        assert!(packer.allocate(17, 1).is_none());
        assert!(packer.allocate(16, 16).is_some());
        assert!(packer.allocate(1, 1).is_none());
    }

    #[test]
    fn test_blit_coverage_writes_white_alpha() {
        let mut image = AtlasImage::new(4, 4);
        let rect = PackedRect {
            x: 1,
            y: 1,
            width: 2,
            height: 1,
        };
        blit_coverage(&mut image, rect, &[10, 200]);
        assert_eq!(image.pixel(1, 1), Some([255, 255, 255, 10]));
        assert_eq!(image.pixel(2, 1), Some([255, 255, 255, 200]));
        assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 0]));
    }
}
