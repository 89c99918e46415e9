//! Baked displacement and normal maps and their image form.

use serde::{Deserialize, Serialize};

/// Displacement and normal per texel, indexed by `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct BakedMaps {
    /// Name of the low-detail mesh the maps belong to.
    pub name: String,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Signed distance from the low-detail surface to the high-detail hit.
    pub displacement: Vec<f32>,
    /// Interpolated high-detail normal at the hit.
    pub normal: Vec<[f32; 3]>,
    /// Whether the texel holds a genuine hit.
    pub valid: Vec<bool>,
}

impl BakedMaps {
    /// All-miss maps.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            name: name.into(),
            width,
            height,
            displacement: vec![0.0; n],
            normal: vec![[0.0; 3]; n],
            valid: vec![false; n],
        }
    }

    /// Linear index of texel `(x, y)`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Number of texels.
    pub fn len(&self) -> usize {
        self.displacement.len()
    }

    /// Whether the maps have no texels.
    pub fn is_empty(&self) -> bool {
        self.displacement.is_empty()
    }

    /// Number of texels with a genuine hit.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Smallest and largest displacement over valid texels.
    pub fn displacement_range(&self) -> Option<(f32, f32)> {
        self.displacement
            .iter()
            .zip(&self.valid)
            .filter(|(_, &v)| v)
            .map(|(&d, _)| d)
            .fold(None, |acc, d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }

    /// Single-channel displacement image.
    pub fn displacement_image(&self) -> FloatImage {
        FloatImage {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            channels: 1,
            data: self.displacement.clone(),
        }
    }

    /// Three-channel normal image.
    pub fn normal_image(&self) -> FloatImage {
        FloatImage {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            channels: 3,
            data: self.normal.iter().flatten().copied().collect(),
        }
    }
}

/// Interleaved float image tagged with its source mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatImage {
    /// Source mesh name.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel.
    pub channels: u32,
    /// `width * height * channels` samples, row-major.
    pub data: Vec<f32>,
}

impl FloatImage {
    /// Samples of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }
}

/// Destination for baked images.
///
/// File formats and naming belong to the implementor.
pub trait MapWriter {
    /// Error raised when an image cannot be written.
    type Error;

    /// Write one image.
    fn write_image(&mut self, kind: MapKind, image: &FloatImage) -> Result<(), Self::Error>;

    /// Write the displacement and normal images of `maps`.
    fn write_maps(&mut self, maps: &BakedMaps) -> Result<(), Self::Error> {
        self.write_image(MapKind::Displacement, &maps.displacement_image())?;
        self.write_image(MapKind::Normal, &maps.normal_image())
    }
}

/// Which map an image holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    /// Single-channel displacement.
    Displacement,
    /// Three-channel normal.
    Normal,
}

impl MapKind {
    /// Lowercase name for file suffixes.
    pub fn as_str(&self) -> &'static str {
        match self {
            MapKind::Displacement => "displacement",
            MapKind::Normal => "normal",
        }
    }
}

/// Keeps written images in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    /// Images in write order.
    pub images: Vec<(MapKind, FloatImage)>,
}

impl MapWriter for MemoryWriter {
    type Error = std::convert::Infallible;

    fn write_image(&mut self, kind: MapKind, image: &FloatImage) -> Result<(), Self::Error> {
        self.images.push((kind, image.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BakedMaps {
        let mut maps = BakedMaps::new("low", 2, 2);
        maps.displacement = vec![0.5, -0.25, 0.0, 3.0];
        maps.normal[1] = [0.0, 0.0, 1.0];
        maps.valid = vec![true, true, false, false];
        maps
    }

    #[test]
    fn test_range_ignores_invalid() {
        assert_eq!(sample().displacement_range(), Some((-0.25, 0.5)));
        assert_eq!(BakedMaps::new("x", 2, 2).displacement_range(), None);
    }

    #[test]
    fn test_images() {
        let maps = sample();
        let disp = maps.displacement_image();
        assert_eq!(disp.channels, 1);
        assert_eq!(disp.name, "low");
        assert_eq!(disp.pixel(1, 0), &[-0.25]);

        let normal = maps.normal_image();
        assert_eq!(normal.channels, 3);
        assert_eq!(normal.data.len(), 12);
        assert_eq!(normal.pixel(1, 0), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_memory_writer() {
        let mut writer = MemoryWriter::default();
        writer.write_maps(&sample()).unwrap();
        assert_eq!(writer.images.len(), 2);
        assert_eq!(writer.images[0].0, MapKind::Displacement);
        assert_eq!(writer.images[1].1.channels, 3);
    }

    #[test]
    fn test_image_json() {
        let image = sample().displacement_image();
        let json = serde_json::to_string(&image).unwrap();
        let back: FloatImage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, image);
    }
}
