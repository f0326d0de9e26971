use serde::{Deserialize, Serialize};

use skidpan_core::sim_trait::ResetReason;

use crate::error::DriveError;

/// What lies under a world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    Drivable,
    /// Grass and anything else the vehicle must not touch.
    Hazard,
    /// Outside the mask, or undefined terrain inside it.
    OutOfBounds,
}

impl Surface {
    pub fn verdict(self) -> Verdict {
        match self {
            Surface::Drivable => Verdict::Drivable,
            Surface::Hazard | Surface::OutOfBounds => Verdict::Violation,
        }
    }

    /// Reset reason for a violating surface, `None` when drivable.
    pub fn reset_reason(self) -> Option<ResetReason> {
        match self {
            Surface::Drivable => None,
            Surface::Hazard => Some(ResetReason::Hazard),
            Surface::OutOfBounds => Some(ResetReason::OutOfBounds),
        }
    }
}

/// Outcome of a terrain check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Drivable,
    Violation,
}

/// Color rule that marks a terrain pixel as hazard.
///
/// A pixel is hazard when its green channel is above `green_min` and both
/// red and blue are below their maxima. Fully transparent pixels are
/// undefined terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardRule {
    pub green_min: u8,
    pub red_max: u8,
    pub blue_max: u8,
}

impl Default for HazardRule {
    fn default() -> Self {
        Self {
            green_min: 150,
            red_max: 100,
            blue_max: 100,
        }
    }
}

impl HazardRule {
    pub fn surface(&self, [r, g, b, a]: [u8; 4]) -> Surface {
        if a == 0 {
            Surface::OutOfBounds
        } else if g > self.green_min && r < self.red_max && b < self.blue_max {
            Surface::Hazard
        } else {
            Surface::Drivable
        }
    }
}

/// Point classification over world coordinates.
pub trait SurfaceQuery {
    /// Surface under `(x, y)`. Anything the query cannot answer must come
    /// back as `OutOfBounds`, never `Drivable`.
    fn surface_at(&self, x: f32, y: f32) -> Surface;
}

/// Pre-baked, immutable terrain classification grid with one cell per
/// source pixel.
///
/// Built once from the terrain image and shared read-only afterwards, so
/// queries are a single index lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMask {
    width: u32,
    height: u32,
    cells: Vec<Surface>,
}

impl TerrainMask {
    /// A mask where every cell has the same surface.
    pub fn uniform(width: u32, height: u32, surface: Surface) -> Self {
        Self {
            width,
            height,
            cells: vec![surface; width as usize * height as usize],
        }
    }

    /// Build a mask cell by cell, row-major.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Surface) -> Self {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Bake a mask from tightly packed row-major RGBA8 pixels.
    pub fn from_rgba(
        width: u32,
        height: u32,
        pixels: &[u8],
        rule: &HazardRule,
    ) -> Result<Self, DriveError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(DriveError::MaskSize {
                expected,
                actual: pixels.len(),
            });
        }

        let cells = pixels
            .chunks_exact(4)
            .map(|px| rule.surface([px[0], px[1], px[2], px[3]]))
            .collect();
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Bake a mask from a decoded image.
    #[cfg(feature = "image")]
    pub fn from_image(img: &image::RgbaImage, rule: &HazardRule) -> Self {
        let (width, height) = img.dimensions();
        Self::from_fn(width, height, |x, y| rule.surface(img.get_pixel(x, y).0))
    }

    /// Decode a terrain image from disk and bake it.
    #[cfg(feature = "image")]
    pub fn open<P: AsRef<std::path::Path>>(path: P, rule: &HazardRule) -> Result<Self, DriveError> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| DriveError::Image(format!("{}: {e}", path.display())))?
            .into_rgba8();
        let mask = Self::from_image(&img, rule);
        tracing::debug!(
            path = %path.display(),
            width = mask.width,
            height = mask.height,
            hazard_cells = mask.count(Surface::Hazard),
            "Baked terrain mask"
        );
        Ok(mask)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Surface of an integer cell, `None` outside the mask.
    pub fn cell(&self, px: i64, py: i64) -> Option<Surface> {
        if px < 0 || py < 0 || px >= i64::from(self.width) || py >= i64::from(self.height) {
            return None;
        }
        self.cells
            .get(py as usize * self.width as usize + px as usize)
            .copied()
    }

    /// Number of cells with the given surface.
    pub fn count(&self, surface: Surface) -> usize {
        self.cells.iter().filter(|&&s| s == surface).count()
    }
}

impl SurfaceQuery for TerrainMask {
    fn surface_at(&self, x: f32, y: f32) -> Surface {
        if !x.is_finite() || !y.is_finite() {
            return Surface::OutOfBounds;
        }
        self.cell(x.floor() as i64, y.floor() as i64)
            .unwrap_or(Surface::OutOfBounds)
    }
}

/// Classify the position the vehicle just moved to.
pub fn classify<Q: SurfaceQuery + ?Sized>(x: f32, y: f32, terrain: &Q) -> Verdict {
    terrain.surface_at(x, y).verdict()
}
