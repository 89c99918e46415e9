//! Edge padding for baked maps.
//!
//! Texels just outside the UV islands are filled from their covered
//! neighbours so that filtering and mipmapping do not pull in the zero
//! values of uncovered texels.

use crate::maps::BakedMaps;

/// Which neighbours contribute to a padded texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Neighborhood {
    /// Left, right, up and down.
    #[default]
    Four,
    /// The four edge neighbours plus the diagonals.
    Eight,
}

impl Neighborhood {
    fn offsets(self) -> &'static [(i64, i64)] {
        const FOUR: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        const EIGHT: [(i64, i64); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        match self {
            Neighborhood::Four => &FOUR,
            Neighborhood::Eight => &EIGHT,
        }
    }
}

/// Grow covered regions of `maps` outward by up to `iterations` texels.
///
/// Each pass fills every uncovered texel that touches a covered one with the
/// average displacement and the renormalized average normal of those
/// neighbours. Texels filled in one pass only count as covered from the next
/// pass on. `maps.valid` is not changed, so padded texels stay
/// distinguishable from real hits.
///
/// Returns the number of texels filled.
pub fn pad_maps(maps: &mut BakedMaps, iterations: u32, neighborhood: Neighborhood) -> usize {
    let width = maps.width as i64;
    let height = maps.height as i64;
    let mut covered = maps.valid.clone();
    let mut total = 0;

    for pass in 0..iterations {
        let mut next = covered.clone();
        let mut filled = 0;

        for y in 0..height {
            for x in 0..width {
                let i = (y * width + x) as usize;
                if covered[i] {
                    continue;
                }

                let mut count = 0u32;
                let mut displacement = 0.0f32;
                let mut normal = [0.0f32; 3];
                for &(dx, dy) in neighborhood.offsets() {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= width || ny >= height {
                        continue;
                    }
                    let j = (ny * width + nx) as usize;
                    if !covered[j] {
                        continue;
                    }
                    count += 1;
                    displacement += maps.displacement[j];
                    for (acc, n) in normal.iter_mut().zip(maps.normal[j]) {
                        *acc += n;
                    }
                }
                if count == 0 {
                    continue;
                }

                // Neighbours read here are covered, so never written this pass.
                maps.displacement[i] = displacement / count as f32;
                maps.normal[i] = normalize(normal);
                next[i] = true;
                filled += 1;
            }
        }

        log::debug!("padding pass {}: filled {} texels", pass + 1, filled);
        covered = next;
        total += filled;
        if filled == 0 {
            break;
        }
    }

    total
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 0.0 {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        [0.0; 3]
    }
}
