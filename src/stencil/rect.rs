/// Pixel rectangle on a mask grid. `x`/`y` are inclusive, `x + width` and
/// `y + height` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Rectangle in normalized `[0, 1]` mask coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn from_points(a: (i32, i32), b: (i32, i32), pad: i32) -> Self {
        let min_x = a.0.min(b.0) - pad;
        let max_x = a.0.max(b.0) + pad;
        let min_y = a.1.min(b.1) - pad;
        let max_y = a.1.max(b.1) + pad;
        Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1).max(1),
            height: (max_y - min_y + 1).max(1),
        }
    }

    pub fn union(self, other: PixelRect) -> PixelRect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        PixelRect {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(1),
            height: (max_y - min_y).max(1),
        }
    }

    /// Intersect with a `side x side` grid. `None` when nothing remains.
    pub fn clamp(self, side: u32) -> Option<PixelRect> {
        let max = side as i32;
        let x0 = self.x.clamp(0, max);
        let y0 = self.y.clamp(0, max);
        let x1 = (self.x + self.width).clamp(0, max);
        let y1 = (self.y + self.height).clamp(0, max);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    pub fn to_normalized(self, side: u32) -> NormalizedRect {
        let side = side.max(1) as f32;
        NormalizedRect {
            x: self.x as f32 / side,
            y: self.y as f32 / side,
            width: self.width as f32 / side,
            height: self.height as f32 / side,
        }
    }
}
