#![warn(missing_docs)]

//! Mesh data model for the meshbake baker.
//!
//! A [`Mesh`] is a flat vertex list plus an index list. The same type
//! carries both bake inputs:
//!
//! - the low-detail mesh, whose indices come in groups of four, each group
//!   a bilinear quad with texel-space (pixel unit) texture coordinates
//! - the high-detail mesh, whose indices come in groups of three
//!
//! Loading from model files is left to the caller; meshes can be built in
//! code or exchanged as JSON.

mod error;
pub mod shapes;

pub use error::{MeshError, Result};

use meshbake_math::{Point2, Point3, Vec3};
use serde::{Deserialize, Serialize};

/// Number of indices per low-detail quad.
pub const QUAD_ARITY: usize = 4;

/// Number of indices per high-detail triangle.
pub const TRIANGLE_ARITY: usize = 3;

/// A mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Surface position.
    pub position: Point3,
    /// Vertex normal. Not required to be unit length.
    pub normal: Vec3,
    /// Texture coordinate. For quad meshes this is in texel units.
    #[serde(default = "Point2::origin")]
    pub tex_coord: Point2,
}

impl Vertex {
    /// Create a vertex.
    pub fn new(position: Point3, normal: Vec3, tex_coord: Point2) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Indexed mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Name used to tag baked outputs.
    #[serde(default)]
    pub name: String,
    /// Vertex list.
    pub vertices: Vec<Vertex>,
    /// Index list, grouped by 3 (triangles) or 4 (quads).
    pub indices: Vec<u32>,
}

/// Axis-aligned bounds of a mesh with its bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBounds {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
    /// Box center.
    pub center: Point3,
    /// Half of the box diagonal.
    pub radius: f64,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh from vertices and indices.
    pub fn from_parts(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of quads when the indices are read in groups of four.
    pub fn num_quads(&self) -> usize {
        self.indices.len() / QUAD_ARITY
    }

    /// Number of triangles when the indices are read in groups of three.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / TRIANGLE_ARITY
    }

    /// Whether any vertex carries a non-zero texture coordinate.
    pub fn has_tex_coords(&self) -> bool {
        self.vertices
            .iter()
            .any(|v| v.tex_coord.x != 0.0 || v.tex_coord.y != 0.0)
    }

    /// Iterate quads as four vertex references.
    ///
    /// Trailing indices that do not form a full quad are skipped. Call
    /// [`Mesh::validate_quads`] first; out-of-range indices panic.
    pub fn quads(&self) -> impl Iterator<Item = [&Vertex; 4]> + '_ {
        self.indices.chunks_exact(QUAD_ARITY).map(move |q| {
            [
                &self.vertices[q[0] as usize],
                &self.vertices[q[1] as usize],
                &self.vertices[q[2] as usize],
                &self.vertices[q[3] as usize],
            ]
        })
    }

    /// The three vertices of triangle `tri`.
    ///
    /// Call [`Mesh::validate_triangles`] first; out-of-range indices panic.
    #[inline]
    pub fn triangle(&self, tri: usize) -> [&Vertex; 3] {
        let base = tri * TRIANGLE_ARITY;
        [
            &self.vertices[self.indices[base] as usize],
            &self.vertices[self.indices[base + 1] as usize],
            &self.vertices[self.indices[base + 2] as usize],
        ]
    }

    /// The three corner positions of triangle `tri`.
    #[inline]
    pub fn triangle_positions(&self, tri: usize) -> [Point3; 3] {
        let [a, b, c] = self.triangle(tri);
        [a.position, b.position, c.position]
    }

    /// Iterate triangles as corner positions.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        (0..self.num_triangles()).map(move |t| self.triangle_positions(t))
    }

    /// Check that the mesh is a non-empty list of quads with valid indices.
    pub fn validate_quads(&self) -> Result<()> {
        self.validate_grouped(QUAD_ARITY)
    }

    /// Check that the mesh is a non-empty list of triangles with valid indices.
    pub fn validate_triangles(&self) -> Result<()> {
        self.validate_grouped(TRIANGLE_ARITY)
    }

    fn validate_grouped(&self, arity: usize) -> Result<()> {
        if self.indices.is_empty() || self.vertices.is_empty() {
            return Err(MeshError::Empty(self.name.clone()));
        }
        if self.indices.len() % arity != 0 {
            return Err(MeshError::IndexCount {
                count: self.indices.len(),
                arity,
            });
        }
        let vertex_count = self.vertices.len();
        if let Some((position, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, &i)| i as usize >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange {
                position,
                index,
                vertex_count,
            });
        }
        Ok(())
    }

    /// Count triangles with zero area.
    pub fn degenerate_triangle_count(&self) -> usize {
        self.triangles()
            .filter(|[a, b, c]| (b - a).cross(&(c - a)).norm_squared() == 0.0)
            .count()
    }

    /// Compute the axis-aligned bounds, or `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<MeshBounds> {
        let first = self.vertices.first()?.position;
        let (min, max) = self
            .vertices
            .iter()
            .fold((first, first), |(lo, hi), v| {
                (lo.inf(&v.position), hi.sup(&v.position))
            });
        let center = nalgebra::center(&min, &max);
        Some(MeshBounds {
            min,
            max,
            center,
            radius: (max - min).norm() * 0.5,
        })
    }

    /// Parse a mesh from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the mesh to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertex(x: f64, y: f64, z: f64, u: f64, v: f64) -> Vertex {
        Vertex::new(Point3::new(x, y, z), Vec3::z(), Point2::new(u, v))
    }

    fn unit_quad() -> Mesh {
        Mesh::from_parts(
            "quad",
            vec![
                vertex(0.0, 0.0, 0.0, 0.0, 0.0),
                vertex(1.0, 0.0, 0.0, 3.0, 0.0),
                vertex(1.0, 1.0, 0.0, 3.0, 3.0),
                vertex(0.0, 1.0, 0.0, 0.0, 3.0),
            ],
            vec![0, 1, 2, 3],
        )
    }

    #[test]
    fn test_counts() {
        let mesh = unit_quad();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_quads(), 1);
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.quads().count(), 1);
    }

    #[test]
    fn test_validate_quads() {
        assert!(unit_quad().validate_quads().is_ok());

        let mut bad = unit_quad();
        bad.indices.push(0);
        assert!(matches!(
            bad.validate_quads(),
            Err(MeshError::IndexCount { count: 5, arity: 4 })
        ));

        let mut oob = unit_quad();
        oob.indices[2] = 9;
        assert!(matches!(
            oob.validate_quads(),
            Err(MeshError::IndexOutOfRange { position: 2, index: 9, vertex_count: 4 })
        ));
    }

    #[test]
    fn test_validate_empty() {
        let mesh = Mesh::new("empty");
        assert!(matches!(mesh.validate_triangles(), Err(MeshError::Empty(_))));
    }

    #[test]
    fn test_has_tex_coords() {
        assert!(unit_quad().has_tex_coords());
        let mut flat = unit_quad();
        for v in &mut flat.vertices {
            v.tex_coord = Point2::origin();
        }
        assert!(!flat.has_tex_coords());
    }

    #[test]
    fn test_bounds() {
        let bounds = unit_quad().bounds().unwrap();
        assert_relative_eq!(bounds.center.x, 0.5);
        assert_relative_eq!(bounds.center.y, 0.5);
        assert_relative_eq!(bounds.radius, 2.0f64.sqrt() * 0.5, epsilon = 1e-12);
        assert!(Mesh::new("none").bounds().is_none());
    }

    #[test]
    fn test_degenerate_count() {
        let mesh = Mesh::from_parts(
            "tris",
            vec![
                vertex(0.0, 0.0, 0.0, 0.0, 0.0),
                vertex(1.0, 0.0, 0.0, 0.0, 0.0),
                vertex(0.0, 1.0, 0.0, 0.0, 0.0),
                vertex(2.0, 0.0, 0.0, 0.0, 0.0),
            ],
            vec![0, 1, 2, 0, 1, 3],
        );
        assert_eq!(mesh.degenerate_triangle_count(), 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let mesh = unit_quad();
        let json = mesh.to_json().unwrap();
        let back = Mesh::from_json(&json).unwrap();
        assert_eq!(mesh, back);
    }

    #[test]
    fn test_json_missing_tex_coord() {
        let json = r#"{
            "vertices": [{ "position": [0, 0, 0], "normal": [0, 0, 1] }],
            "indices": []
        }"#;
        let mesh = Mesh::from_json(json).unwrap();
        assert_eq!(mesh.vertices[0].tex_coord, Point2::origin());
        assert!(mesh.name.is_empty());
    }
}
