//! Aspect-preserving placement of a bitmap inside an output surface.
//!
//! The bitmap is scaled to touch the surface on one axis and centered on the
//! other (letterbox for wide bitmaps, pillarbox for tall ones). It is never
//! stretched.

use ratatui::layout::Rect;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Where the scaled bitmap lands on the surface, in surface pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placement {
    pub offset_x: u32,
    pub offset_y: u32,
    pub draw_width: u32,
    pub draw_height: u32,
}

impl Placement {
    pub fn is_empty(&self) -> bool {
        self.draw_width == 0 || self.draw_height == 0
    }
}

/// Fit `bitmap` into `surface`, preserving its aspect ratio and centering it.
pub fn fit(bitmap: Size, surface: Size) -> Placement {
    if bitmap.is_empty() || surface.is_empty() {
        return Placement::default();
    }

    let bitmap_ratio = bitmap.width as f64 / bitmap.height as f64;
    let surface_ratio = surface.width as f64 / surface.height as f64;

    if bitmap_ratio > surface_ratio {
        let draw_height = ((surface.width as f64 / bitmap_ratio).round() as u32).min(surface.height);
        Placement {
            offset_x: 0,
            offset_y: (surface.height - draw_height) / 2,
            draw_width: surface.width,
            draw_height,
        }
    } else {
        let draw_width = ((surface.height as f64 * bitmap_ratio).round() as u32).min(surface.width);
        Placement {
            offset_x: (surface.width - draw_width) / 2,
            offset_y: 0,
            draw_width,
            draw_height: surface.height,
        }
    }
}

/// Letterbox a bitmap inside a terminal area.
///
/// Terminal cells are not square, so the area is measured in pixels using the
/// font size, fitted, and mapped back onto whole cells inside `area`.
pub fn letterbox_area(area: Rect, font_size: (u16, u16), bitmap: Size) -> Rect {
    let (font_w, font_h) = (font_size.0.max(1) as u32, font_size.1.max(1) as u32);
    let surface = Size::new(area.width as u32 * font_w, area.height as u32 * font_h);
    let placement = fit(bitmap, surface);
    if placement.is_empty() {
        return Rect::new(area.x, area.y, 0, 0);
    }

    let to_cells = |px: u32, font: u32| ((px as f64 / font as f64).round() as u32).min(u16::MAX as u32) as u16;
    let width = to_cells(placement.draw_width, font_w).clamp(1, area.width);
    let height = to_cells(placement.draw_height, font_h).clamp(1, area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;

    Rect::new(x, y, width, height)
}
