//! Procedural meshes for tests, benchmarks and demos.
//!
//! Quad builders emit texel-space texture coordinates with corners ordered
//! `(min_x, min_y)`, `(max_x, min_y)`, `(max_x, max_y)`, `(min_x, max_y)`,
//! which is the order the quad rasterizer expects.

use std::collections::HashMap;

use meshbake_math::{Point2, Point3, Vec3};

use crate::{Mesh, Vertex};

/// A single planar quad covering texels `texel_min..=texel_max`.
///
/// `corners` follow the rasterizer corner order; every vertex gets `normal`.
pub fn planar_quad(
    name: &str,
    corners: [Point3; 4],
    normal: Vec3,
    texel_min: [f64; 2],
    texel_max: [f64; 2],
) -> Mesh {
    let uvs = [
        Point2::new(texel_min[0], texel_min[1]),
        Point2::new(texel_max[0], texel_min[1]),
        Point2::new(texel_max[0], texel_max[1]),
        Point2::new(texel_min[0], texel_max[1]),
    ];
    let vertices = corners
        .iter()
        .zip(uvs)
        .map(|(p, uv)| Vertex::new(*p, normal, uv))
        .collect();
    Mesh::from_parts(name, vertices, vec![0, 1, 2, 3])
}

/// A `cells x cells` grid of quads in the plane `z`, facing +Z.
///
/// The grid spans `[0, size]` in X and Y. Each cell covers
/// `texels_per_cell` texels, so the whole grid covers
/// `[0, cells * texels_per_cell)` texels on both axes.
pub fn quad_grid(name: &str, size: f64, z: f64, cells: u32, texels_per_cell: u32) -> Mesh {
    let mut mesh = Mesh::new(name);
    let step = size / cells as f64;
    let texels = texels_per_cell as f64;

    for cy in 0..cells {
        for cx in 0..cells {
            let x0 = cx as f64 * step;
            let y0 = cy as f64 * step;
            let u0 = cx as f64 * texels;
            let v0 = cy as f64 * texels;
            let u1 = u0 + texels - 1.0;
            let v1 = v0 + texels - 1.0;

            let base = mesh.vertices.len() as u32;
            let corners = [
                (Point3::new(x0, y0, z), Point2::new(u0, v0)),
                (Point3::new(x0 + step, y0, z), Point2::new(u1, v0)),
                (Point3::new(x0 + step, y0 + step, z), Point2::new(u1, v1)),
                (Point3::new(x0, y0 + step, z), Point2::new(u0, v1)),
            ];
            for (p, uv) in corners {
                mesh.vertices.push(Vertex::new(p, Vec3::z(), uv));
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 3]);
        }
    }

    mesh
}

/// A triangulated rectangle in the plane `z`, facing +Z.
///
/// Spans `min..max` in XY and is split into `divisions x divisions` cells of
/// two triangles each.
pub fn triangulated_plane(name: &str, min: [f64; 2], max: [f64; 2], z: f64, divisions: u32) -> Mesh {
    let mut mesh = Mesh::new(name);
    let n = divisions.max(1);
    let dx = (max[0] - min[0]) / n as f64;
    let dy = (max[1] - min[1]) / n as f64;

    for j in 0..=n {
        for i in 0..=n {
            let p = Point3::new(min[0] + i as f64 * dx, min[1] + j as f64 * dy, z);
            let uv = Point2::new(i as f64 / n as f64, j as f64 / n as f64);
            mesh.vertices.push(Vertex::new(p, Vec3::z(), uv));
        }
    }

    let row = n + 1;
    for j in 0..n {
        for i in 0..n {
            let a = j * row + i;
            let b = a + 1;
            let c = a + row + 1;
            let d = a + row;
            mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }

    mesh
}

/// An icosphere with outward normals.
pub fn icosphere(name: &str, center: Point3, radius: f64, subdivisions: u32) -> Mesh {
    let t = (1.0 + 5.0f64.sqrt()) / 2.0;
    let seeds = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ];
    let mut dirs: Vec<Vec3> = seeds
        .iter()
        .map(|s| Vec3::new(s[0], s[1], s[2]).normalize())
        .collect();

    let mut faces: Vec<[u32; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    for _ in 0..subdivisions {
        let mut next = Vec::with_capacity(faces.len() * 4);
        for [v1, v2, v3] in faces {
            let a = midpoint(v1, v2, &mut dirs, &mut midpoints);
            let b = midpoint(v2, v3, &mut dirs, &mut midpoints);
            let c = midpoint(v3, v1, &mut dirs, &mut midpoints);
            next.push([v1, a, c]);
            next.push([v2, b, a]);
            next.push([v3, c, b]);
            next.push([a, b, c]);
        }
        faces = next;
    }

    let vertices = dirs
        .iter()
        .map(|d| Vertex::new(center + d * radius, *d, Point2::origin()))
        .collect();
    let indices = faces.into_iter().flatten().collect();
    Mesh::from_parts(name, vertices, indices)
}

fn midpoint(a: u32, b: u32, dirs: &mut Vec<Vec3>, cache: &mut HashMap<(u32, u32), u32>) -> u32 {
    let key = if a < b { (a, b) } else { (b, a) };
    if let Some(&index) = cache.get(&key) {
        return index;
    }
    let mid = (dirs[a as usize] + dirs[b as usize]).normalize();
    dirs.push(mid);
    let index = dirs.len() as u32 - 1;
    cache.insert(key, index);
    index
}
