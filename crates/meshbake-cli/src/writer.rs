//! Writes baked maps as JSON float images plus 16-bit PNG previews.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ImageBuffer, Luma, Rgb};
use meshbake::{FloatImage, MapKind, MapWriter};

/// Writes `<name>_<kind>.json` and `<name>_<kind>.png` into a directory.
pub struct FileWriter {
    dir: PathBuf,
    previews: bool,
    /// Paths written so far.
    pub written: Vec<PathBuf>,
}

impl FileWriter {
    pub fn new(dir: &Path, previews: bool) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create output directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            previews,
            written: Vec::new(),
        })
    }

    fn path(&self, image: &FloatImage, kind: MapKind, ext: &str) -> PathBuf {
        let stem = if image.name.is_empty() { "mesh" } else { &image.name };
        self.dir.join(format!("{}_{}.{}", stem, kind.as_str(), ext))
    }
}

impl MapWriter for FileWriter {
    type Error = anyhow::Error;

    fn write_image(&mut self, kind: MapKind, image: &FloatImage) -> Result<()> {
        let json_path = self.path(image, kind, "json");
        fs::write(&json_path, serde_json::to_vec(image)?)
            .with_context(|| format!("cannot write {}", json_path.display()))?;
        log::info!("wrote {}", json_path.display());
        self.written.push(json_path);

        if self.previews {
            let png_path = self.path(image, kind, "png");
            match kind {
                MapKind::Displacement => displacement_preview(image)?.save(&png_path)?,
                MapKind::Normal => normal_preview(image)?.save(&png_path)?,
            }
            log::info!("wrote {}", png_path.display());
            self.written.push(png_path);
        }
        Ok(())
    }
}

/// Grayscale preview with the displacement range stretched to full scale.
fn displacement_preview(image: &FloatImage) -> Result<ImageBuffer<Luma<u16>, Vec<u16>>> {
    let (lo, hi) = image
        .data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| {
            (lo.min(d), hi.max(d))
        });
    let span = hi - lo;
    let data = image
        .data
        .iter()
        .map(|&d| {
            if span > 0.0 {
                to_u16((d - lo) / span)
            } else {
                0
            }
        })
        .collect();
    ImageBuffer::from_raw(image.width, image.height, data)
        .context("displacement image size does not match its data")
}

/// RGB preview mapping each normal component from `[-1, 1]` to full scale.
fn normal_preview(image: &FloatImage) -> Result<ImageBuffer<Rgb<u16>, Vec<u16>>> {
    let data = image.data.iter().map(|&n| to_u16(n * 0.5 + 0.5)).collect();
    ImageBuffer::from_raw(image.width, image.height, data)
        .context("normal image size does not match its data")
}

fn to_u16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(channels: u32, data: Vec<f32>) -> FloatImage {
        FloatImage {
            name: "low".into(),
            width: 2,
            height: 1,
            channels,
            data,
        }
    }

    #[test]
    fn test_displacement_preview_stretches_range() {
        let preview = displacement_preview(&image(1, vec![-1.0, 3.0])).unwrap();
        assert_eq!(preview.get_pixel(0, 0).0, [0]);
        assert_eq!(preview.get_pixel(1, 0).0, [u16::MAX]);
    }

    #[test]
    fn test_flat_displacement_preview() {
        let preview = displacement_preview(&image(1, vec![0.5, 0.5])).unwrap();
        assert_eq!(preview.get_pixel(1, 0).0, [0]);
    }

    #[test]
    fn test_normal_preview() {
        let preview = normal_preview(&image(3, vec![0.0, 0.0, 1.0, -1.0, 0.0, 0.0])).unwrap();
        assert_eq!(preview.get_pixel(0, 0).0, [32768, 32768, u16::MAX]);
        assert_eq!(preview.get_pixel(1, 0).0[0], 0);
    }

    #[test]
    fn test_size_mismatch_is_error() {
        assert!(normal_preview(&image(3, vec![0.0; 3])).is_err());
    }

    #[test]
    fn test_writes_files() {
        let dir = std::env::temp_dir().join(format!("meshbake-writer-{}", std::process::id()));
        let mut writer = FileWriter::new(&dir, true).unwrap();
        writer
            .write_image(MapKind::Displacement, &image(1, vec![0.0, 1.0]))
            .unwrap();
        assert_eq!(writer.written.len(), 2);
        assert!(dir.join("low_displacement.json").exists());
        assert!(dir.join("low_displacement.png").exists());

        let json = fs::read_to_string(dir.join("low_displacement.json")).unwrap();
        let back: FloatImage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, vec![0.0, 1.0]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
