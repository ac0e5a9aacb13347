use collate_types::{Rect, Size};

/// Convert picture Y coordinate to PDF Y coordinate (flip origin)
pub fn flip_y(y: f32, page_height: f32) -> f32 {
    page_height - y
}

/// Maps coordinates of a nested picture of `size` into the space of the
/// picture that draws it at `bounds`, stretching to fill the bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub dx: f32,
    pub dy: f32,
    pub sx: f32,
    pub sy: f32,
}

impl Placement {
    pub fn identity() -> Self {
        Self { dx: 0.0, dy: 0.0, sx: 1.0, sy: 1.0 }
    }

    /// Degenerate sizes keep a unit scale so nothing divides by zero.
    pub fn fit(size: Size, bounds: Rect) -> Self {
        let sx = if size.width > 0.0 { bounds.width / size.width } else { 1.0 };
        let sy = if size.height > 0.0 { bounds.height / size.height } else { 1.0 };
        Self { dx: bounds.x, dy: bounds.y, sx, sy }
    }

    /// Applies `inner` first, then `self`.
    pub fn then(self, inner: Placement) -> Placement {
        Placement {
            dx: self.dx + inner.dx * self.sx,
            dy: self.dy + inner.dy * self.sy,
            sx: self.sx * inner.sx,
            sy: self.sy * inner.sy,
        }
    }

    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.dx + x * self.sx, self.dy + y * self.sy)
    }

    pub fn map_rect(&self, rect: Rect) -> Rect {
        let (x, y) = self.map_point(rect.x, rect.y);
        Rect::new(x, y, rect.width * self.sx, rect.height * self.sy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_y() {
        assert_eq!(flip_y(0.0, 792.0), 792.0);
        assert_eq!(flip_y(792.0, 792.0), 0.0);
    }

    #[test]
    fn test_nested_placement() {
        let outer = Placement::fit(Size::new(100.0, 100.0), Rect::new(10.0, 20.0, 200.0, 50.0));
        assert_eq!(outer.map_point(50.0, 50.0), (110.0, 45.0));

        let inner = Placement::fit(Size::new(10.0, 10.0), Rect::new(0.0, 0.0, 50.0, 50.0));
        let combined = outer.then(inner);
        assert_eq!(combined.map_point(10.0, 10.0), outer.map_point(50.0, 50.0));
        assert_eq!(combined.map_rect(Rect::new(0.0, 0.0, 1.0, 1.0)).width, 10.0);
    }

    #[test]
    fn test_degenerate_size_keeps_unit_scale() {
        let p = Placement::fit(Size::zero(), Rect::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!((p.sx, p.sy), (1.0, 1.0));
    }
}
