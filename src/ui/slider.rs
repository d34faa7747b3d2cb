/// Before/after comparison slider
///
/// Converts a pointer or touch position over the comparison region into
/// a 0-100 split ratio. Event wiring belongs to the front end; this only
/// tracks whether a drag is active and where the divider sits.

/// Horizontal extent of the comparison region, in the same units as pointer x
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub left: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonSlider {
    /// Divider position in percent: 0 = all processed, 100 = all original
    position: f32,
    dragging: bool,
}

impl Default for ComparisonSlider {
    fn default() -> Self {
        Self {
            position: 50.0,
            dragging: false,
        }
    }
}

impl ComparisonSlider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Pointer or touch went down on the divider
    pub fn press(&mut self) {
        self.dragging = true;
    }

    /// Pointer moved. Only moves the divider while a drag is active.
    pub fn drag_to(&mut self, x: f32, region: Region) -> f32 {
        if self.dragging {
            if let Some(position) = position_for(x, region) {
                self.position = position;
            }
        }
        self.position
    }

    pub fn release(&mut self) {
        self.dragging = false;
    }
}

/// Split ratio for pointer `x`, clamped to the region.
/// `None` for a region with no width.
pub fn position_for(x: f32, region: Region) -> Option<f32> {
    if !(region.width > 0.0) || !x.is_finite() {
        return None;
    }
    let offset = (x - region.left).clamp(0.0, region.width);
    Some(offset / region.width * 100.0)
}
