//! Discrete curvature of the displacement map along low-detail quad edges.
//!
//! Each quad edge is walked texel by texel in UV space. The displacement
//! samples along the walk form a height profile over the edge's 3-D length,
//! and the curvature of that profile is estimated with central differences.

use meshbake_mesh::{Mesh, QUAD_ARITY};

use crate::error::{BakeError, Result};
use crate::maps::BakedMaps;

/// Edges shorter than this in 3-D contribute no curvature.
const MIN_EDGE_LENGTH: f64 = 1e-6;

/// Per-vertex curvature estimate for `mesh1`.
///
/// Every vertex gets the largest absolute curvature `|y''| / (1 + y'^2)^1.5`
/// found on any quad edge that touches it. Vertices on no quad get 0.
pub fn estimate_edge_curvature(mesh1: &Mesh, maps: &BakedMaps) -> Result<Vec<f64>> {
    mesh1.validate_quads()?;
    if maps.is_empty() {
        return Err(BakeError::Data(format!(
            "maps for '{}' have no texels",
            maps.name
        )));
    }

    let mut curvature = vec![0.0f64; mesh1.num_vertices()];
    for quad in mesh1.indices.chunks_exact(QUAD_ARITY) {
        for k in 0..QUAD_ARITY {
            let a = quad[k] as usize;
            let b = quad[(k + 1) % QUAD_ARITY] as usize;
            let edge = edge_curvature(mesh1, maps, a, b);
            curvature[a] = curvature[a].max(edge);
            curvature[b] = curvature[b].max(edge);
        }
    }

    log::debug!(
        "estimated curvature for {} vertices of '{}'",
        curvature.len(),
        mesh1.name
    );
    Ok(curvature)
}

fn edge_curvature(mesh: &Mesh, maps: &BakedMaps, a: usize, b: usize) -> f64 {
    let (va, vb) = (&mesh.vertices[a], &mesh.vertices[b]);
    let heights = sample_line(maps, [va.tex_coord.x, va.tex_coord.y], [vb.tex_coord.x, vb.tex_coord.y]);
    if heights.len() < 3 {
        return 0.0;
    }
    let length = (vb.position - va.position).norm();
    if length < MIN_EDGE_LENGTH {
        return 0.0;
    }

    let step = length / (heights.len() - 1) as f64;
    heights
        .windows(3)
        .map(|w| {
            let d1 = (w[2] - w[0]) / (2.0 * step);
            let d2 = (w[2] - 2.0 * w[1] + w[0]) / (step * step);
            (d2 / (1.0 + d1 * d1).powf(1.5)).abs()
        })
        .fold(0.0, f64::max)
}

/// Displacement at each texel on the line from `from` to `to`, clamped to
/// the map.
///
/// Endpoints are clamped before walking, so the walk never takes more steps
/// than the map is wide or tall. Non-finite coordinates yield no samples.
fn sample_line(maps: &BakedMaps, from: [f64; 2], to: [f64; 2]) -> Vec<f64> {
    if from.iter().chain(&to).any(|c| !c.is_finite()) {
        return Vec::new();
    }
    let max_x = maps.width as f64 - 1.0;
    let max_y = maps.height as f64 - 1.0;
    let (x0, y0) = (from[0].floor().clamp(0.0, max_x), from[1].floor().clamp(0.0, max_y));
    let (x1, y1) = (to[0].floor().clamp(0.0, max_x), to[1].floor().clamp(0.0, max_y));
    let steps = (x1 - x0).abs().max((y1 - y0).abs()) as usize;

    (0..=steps)
        .map(|s| {
            let f = if steps == 0 { 0.0 } else { s as f64 / steps as f64 };
            let x = (x0 + (x1 - x0) * f).round() as u32;
            let y = (y0 + (y1 - y0) * f).round() as u32;
            maps.displacement[maps.index(x, y)] as f64
        })
        .collect()
}
