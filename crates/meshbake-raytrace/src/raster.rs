//! UV-space quad rasterization into per-texel rays.
//!
//! Each quad of the low-detail mesh carries texture coordinates in texel
//! units. The rasterizer walks the quad's clamped texel bounding box,
//! bilinearly interpolates position and normal across it, and emits one ray
//! per texel: origin on the surface (pulled back slightly along the normal)
//! and direction along the interpolated normal.

use meshbake_math::{normalize_or_zero, Point3, Vec3};
use meshbake_mesh::{Mesh, MeshError, Vertex};
use thiserror::Error;

use crate::Ray;

/// Errors raised while building a ray set.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The requested texture size is not positive.
    #[error("bake resolution must be positive, got {0}")]
    InvalidResolution(i32),

    /// The mesh has no UV layout.
    #[error("mesh '{0}' has no texture coordinates")]
    MissingTexCoords(String),

    /// The quad list is malformed.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Per-texel rays for one bake, indexed by `y * width + x`.
///
/// Texels not covered by any quad keep a zero origin and a zero direction.
#[derive(Debug, Clone)]
pub struct BakeRaySet {
    /// Texture width in texels.
    pub width: u32,
    /// Texture height in texels.
    pub height: u32,
    /// Ray origins.
    pub origins: Vec<Point3>,
    /// Unit ray directions, or zero where there is no ray.
    pub directions: Vec<Vec3>,
    /// Distance each origin was pulled back along `-direction`.
    pub origin_offset: f64,
}

impl BakeRaySet {
    /// An all-empty ray set.
    pub fn empty(width: u32, height: u32, origin_offset: f64) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            origins: vec![Point3::origin(); n],
            directions: vec![Vec3::zeros(); n],
            origin_offset,
        }
    }

    /// Number of texels.
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// Whether the set has no texels.
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Linear index of texel `(x, y)`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Whether texel `i` carries a ray.
    #[inline]
    pub fn has_ray(&self, i: usize) -> bool {
        self.directions[i] != Vec3::zeros()
    }

    /// The ray of texel `i`, if any.
    pub fn ray(&self, i: usize) -> Option<Ray> {
        Ray::new(self.origins[i], self.directions[i])
    }

    /// Number of texels that carry a ray.
    pub fn ray_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.has_ray(i)).count()
    }
}

/// Rasterize every quad of `mesh` into a `resolution x resolution` ray set.
///
/// Quads are written in index order; where quads overlap, the later one
/// owns the texel.
pub fn rasterize_quads(
    mesh: &Mesh,
    resolution: i32,
    origin_offset: f64,
) -> Result<BakeRaySet, RasterError> {
    if resolution <= 0 {
        return Err(RasterError::InvalidResolution(resolution));
    }
    mesh.validate_quads()?;
    if !mesh.has_tex_coords() {
        return Err(RasterError::MissingTexCoords(mesh.name.clone()));
    }

    let size = resolution as u32;
    let mut rays = BakeRaySet::empty(size, size, origin_offset);
    for quad in mesh.quads() {
        rasterize_quad(&quad, &mut rays);
    }

    log::debug!(
        "rasterized {} quads of '{}' into {} rays at {}x{}",
        mesh.num_quads(),
        mesh.name,
        rays.ray_count(),
        size,
        size
    );
    Ok(rays)
}

/// Integer texel bounds of a quad, clamped to the texture.
fn texel_bounds(quad: &[&Vertex; 4], width: u32, height: u32) -> Option<[i64; 4]> {
    let mut min = [i64::MAX; 2];
    let mut max = [i64::MIN; 2];
    for v in quad {
        let px = [v.tex_coord.x.floor() as i64, v.tex_coord.y.floor() as i64];
        for axis in 0..2 {
            min[axis] = min[axis].min(px[axis]);
            max[axis] = max[axis].max(px[axis]);
        }
    }

    let min_x = min[0].max(0);
    let min_y = min[1].max(0);
    let max_x = max[0].min(width as i64 - 1);
    let max_y = max[1].min(height as i64 - 1);

    (min_x <= max_x && min_y <= max_y).then_some([min_x, min_y, max_x, max_y])
}

fn rasterize_quad(quad: &[&Vertex; 4], rays: &mut BakeRaySet) {
    let Some([min_x, min_y, max_x, max_y]) = texel_bounds(quad, rays.width, rays.height) else {
        return;
    };

    let span_x = (max_x - min_x) as f64;
    let span_y = (max_y - min_y) as f64;

    for y in min_y..=max_y {
        let v = if span_y > 0.0 {
            (y - min_y) as f64 / span_y
        } else {
            0.0
        };
        for x in min_x..=max_x {
            let u = if span_x > 0.0 {
                (x - min_x) as f64 / span_x
            } else {
                0.0
            };

            let weights = [(1.0 - u) * (1.0 - v), u * (1.0 - v), u * v, (1.0 - u) * v];
            let mut position = Vec3::zeros();
            let mut normal = Vec3::zeros();
            for (w, vertex) in weights.iter().zip(quad) {
                position += vertex.position.coords * *w;
                normal += vertex.normal * *w;
            }
            let normal = normalize_or_zero(&normal);

            let i = rays.index(x as u32, y as u32);
            rays.origins[i] = Point3::from(position - normal * rays.origin_offset);
            rays.directions[i] = normal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshbake_math::Point2;
    use meshbake_mesh::shapes::{planar_quad, quad_grid};

    fn unit_corners(z: f64) -> [Point3; 4] {
        [
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(1.0, 1.0, z),
            Point3::new(0.0, 1.0, z),
        ]
    }

    #[test]
    fn test_single_pixel_quad() {
        let mesh = planar_quad("dot", unit_corners(0.0), Vec3::z(), [2.0, 1.0], [2.0, 1.0]);
        let rays = rasterize_quads(&mesh, 4, 0.0).unwrap();
        assert_eq!(rays.ray_count(), 1);
        let i = rays.index(2, 1);
        assert!(rays.has_ray(i));
        // Both weights collapse to zero, so the texel takes corner 0.
        assert_relative_eq!(rays.origins[i].x, 0.0);
        assert_relative_eq!(rays.directions[i].z, 1.0);
        assert!(rays.origins.iter().all(|p| p.x.is_finite()));
    }

    #[test]
    fn test_bilinear_corners() {
        let mesh = planar_quad("q", unit_corners(0.0), Vec3::z(), [0.0, 0.0], [3.0, 3.0]);
        let rays = rasterize_quads(&mesh, 4, 0.0).unwrap();
        assert_eq!(rays.ray_count(), 16);

        let far = rays.origins[rays.index(3, 3)];
        assert_relative_eq!(far.x, 1.0);
        assert_relative_eq!(far.y, 1.0);

        let mid = rays.origins[rays.index(1, 2)];
        assert_relative_eq!(mid.x, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(mid.y, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_origin_offset_along_negative_normal() {
        let mesh = planar_quad("q", unit_corners(0.0), Vec3::z(), [0.0, 0.0], [1.0, 1.0]);
        let rays = rasterize_quads(&mesh, 2, 0.25).unwrap();
        assert_relative_eq!(rays.origins[0].z, -0.25);
        assert_eq!(rays.origin_offset, 0.25);
    }

    #[test]
    fn test_interpolated_normal_is_unit() {
        let mut mesh = planar_quad("q", unit_corners(0.0), Vec3::z(), [0.0, 0.0], [3.0, 3.0]);
        mesh.vertices[0].normal = Vec3::new(1.0, 0.0, 1.0).normalize();
        mesh.vertices[2].normal = Vec3::new(0.0, 1.0, 1.0).normalize();
        let rays = rasterize_quads(&mesh, 4, 0.0).unwrap();
        for d in &rays.directions {
            assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_uncovered_texels_stay_empty() {
        let mesh = planar_quad("q", unit_corners(0.0), Vec3::z(), [0.0, 0.0], [1.0, 1.0]);
        let rays = rasterize_quads(&mesh, 8, 0.0).unwrap();
        assert_eq!(rays.ray_count(), 4);
        let i = rays.index(5, 5);
        assert!(!rays.has_ray(i));
        assert!(rays.ray(i).is_none());
        assert_eq!(rays.origins[i], Point3::origin());
    }

    #[test]
    fn test_quad_clamped_to_texture() {
        let mesh = planar_quad("q", unit_corners(0.0), Vec3::z(), [2.0, 2.0], [9.0, 9.0]);
        let rays = rasterize_quads(&mesh, 4, 0.0).unwrap();
        assert_eq!(rays.ray_count(), 4);
    }

    #[test]
    fn test_last_quad_wins() {
        let mut mesh = planar_quad("a", unit_corners(0.0), Vec3::z(), [0.0, 0.0], [1.0, 1.0]);
        let base = mesh.vertices.len() as u32;
        for (p, uv) in unit_corners(5.0).iter().zip([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]) {
            mesh.vertices.push(Vertex::new(*p, Vec3::z(), uv));
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base + 3]);

        let rays = rasterize_quads(&mesh, 2, 0.0).unwrap();
        assert!(rays.origins.iter().all(|p| p.z == 5.0));
    }

    #[test]
    fn test_grid_covers_texture() {
        let mesh = quad_grid("grid", 1.0, 0.0, 4, 2);
        let rays = rasterize_quads(&mesh, 8, 0.0).unwrap();
        assert_eq!(rays.ray_count(), 64);
    }

    #[test]
    fn test_non_positive_resolution() {
        let mesh = quad_grid("grid", 1.0, 0.0, 1, 4);
        assert!(matches!(
            rasterize_quads(&mesh, 0, 0.0),
            Err(RasterError::InvalidResolution(0))
        ));
        assert!(matches!(
            rasterize_quads(&mesh, -3, 0.0),
            Err(RasterError::InvalidResolution(-3))
        ));
    }

    #[test]
    fn test_missing_uvs() {
        let mut mesh = quad_grid("flat", 1.0, 0.0, 1, 4);
        for v in &mut mesh.vertices {
            v.tex_coord = Point2::origin();
        }
        assert!(matches!(
            rasterize_quads(&mesh, 4, 0.0),
            Err(RasterError::MissingTexCoords(_))
        ));
    }

    #[test]
    fn test_bad_quad_indices() {
        let mut mesh = quad_grid("grid", 1.0, 0.0, 1, 4);
        mesh.indices.push(0);
        assert!(matches!(rasterize_quads(&mesh, 4, 0.0), Err(RasterError::Mesh(_))));
    }
}
