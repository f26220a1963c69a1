//! 3D simplex noise over a seeded permutation table.
//!
//! The table holds 256 shuffled values duplicated to 512 entries so lattice
//! hashing never needs a wrap. It is built once; evaluation is a pure
//! function of the coordinates.

use rand::Rng;
use rand::seq::SliceRandom;

const F3: f32 = 1.0 / 3.0;
const G3: f32 = 1.0 / 6.0;

const GRAD3: [[f32; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

#[derive(Clone)]
pub struct NoiseField {
    perm: [u8; 512],
}

impl NoiseField {
    /// Build a permutation table from the given RNG.
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut base: Vec<u8> = (0..=255).collect();
        base.shuffle(rng);

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = base[i & 255];
        }
        Self { perm }
    }

    #[inline]
    fn hash(&self, i: usize, j: usize, k: usize) -> usize {
        let p = &self.perm;
        p[i + p[j + p[k] as usize] as usize] as usize % 12
    }

    /// Simplex noise at (x, y, z). Range is roughly [-1, 1].
    pub fn noise3d(&self, x: f32, y: f32, z: f32) -> f32 {
        // Skew into simplex space to find the containing cell.
        let s = (x + y + z) * F3;
        let i = (x + s).floor();
        let j = (y + s).floor();
        let k = (z + s).floor();
        let t = (i + j + k) * G3;

        let x0 = x - (i - t);
        let y0 = y - (j - t);
        let z0 = z - (k - t);

        // Which of the six tetrahedra are we in?
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let x1 = x0 - i1 as f32 + G3;
        let y1 = y0 - j1 as f32 + G3;
        let z1 = z0 - k1 as f32 + G3;
        let x2 = x0 - i2 as f32 + 2.0 * G3;
        let y2 = y0 - j2 as f32 + 2.0 * G3;
        let z2 = z0 - k2 as f32 + 2.0 * G3;
        let x3 = x0 - 1.0 + 3.0 * G3;
        let y3 = y0 - 1.0 + 3.0 * G3;
        let z3 = z0 - 1.0 + 3.0 * G3;

        let ii = (i as i32 & 255) as usize;
        let jj = (j as i32 & 255) as usize;
        let kk = (k as i32 & 255) as usize;

        let g0 = self.hash(ii, jj, kk);
        let g1 = self.hash(ii + i1, jj + j1, kk + k1);
        let g2 = self.hash(ii + i2, jj + j2, kk + k2);
        let g3 = self.hash(ii + 1, jj + 1, kk + 1);

        let n0 = corner(g0, x0, y0, z0);
        let n1 = corner(g1, x1, y1, z1);
        let n2 = corner(g2, x2, y2, z2);
        let n3 = corner(g3, x3, y3, z3);

        32.0 * (n0 + n1 + n2 + n3)
    }
}

#[inline]
fn corner(gi: usize, x: f32, y: f32, z: f32) -> f32 {
    let t = 0.6 - x * x - y * y - z * z;
    if t < 0.0 {
        return 0.0;
    }
    let g = GRAD3[gi];
    let t2 = t * t;
    t2 * t2 * (g[0] * x + g[1] * y + g[2] * z)
}
