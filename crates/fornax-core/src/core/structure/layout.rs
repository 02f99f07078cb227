use super::pairtable::PairTable;
use nalgebra::Point2;
use std::f64::consts::{FRAC_PI_2, PI};

const INIT_ANGLE: f64 = 0.0;
const INIT_X: f64 = 100.0;
const INIT_Y: f64 = 100.0;
/// Distance between consecutive nucleotides along the backbone.
pub const BACKBONE_STEP: f64 = 15.0;

/// Computes initial coordinates for every position of a nested pairtable.
///
/// Loops are drawn as regular polygons and stems as straight ladders; the backbone
/// is walked with a fixed step while turning by the accumulated bend angle at every
/// position. Crossing pairs should be removed first, since the layout has no way to
/// draw them.
pub fn simple_xy_coordinates(pairtable: &PairTable) -> Vec<Point2<f64>> {
    let len = pairtable.len();
    if len == 0 {
        return Vec::new();
    }

    let mut bender = Bender {
        pairtable,
        len: len as i64,
        angle: vec![0.0; len + 5],
    };
    bender.lay_loop(0, len as i64 + 1);

    let mut positions = Vec::with_capacity(len);
    let mut alpha = INIT_ANGLE;
    let mut current = Point2::new(INIT_X, INIT_Y);
    positions.push(current);
    for i in 1..len {
        current = Point2::new(
            current.x + BACKBONE_STEP * alpha.cos(),
            current.y + BACKBONE_STEP * alpha.sin(),
        );
        positions.push(current);
        alpha += PI - bender.angle[i + 1];
    }
    positions
}

struct Bender<'a> {
    pairtable: &'a PairTable,
    len: i64,
    angle: Vec<f64>,
}

impl Bender<'_> {
    fn partner(&self, position: i64) -> i64 {
        if position < 1 || position > self.len {
            return 0;
        }
        self.pairtable.partner(position as usize).unwrap_or(0) as i64
    }

    fn bend(&mut self, position: i64, by: f64) {
        if let Some(a) = self.angle.get_mut(position as usize) {
            *a += by;
        }
    }

    fn straighten(&mut self, position: i64) {
        if let Some(a) = self.angle.get_mut(position as usize) {
            *a = PI;
        }
    }

    /// Lays out the loop enclosed by the pair `(i - 1, j + 1)`.
    fn lay_loop(&mut self, mut i: i64, j: i64) {
        // The closing pair already contributes two polygon vertices.
        let mut count: i64 = 2;
        let mut remember: Vec<i64> = vec![0];
        let i_old = i - 1;
        let end = j + 1;

        while i != end {
            let partner = self.partner(i);
            if partner == 0 || i == 0 {
                i += 1;
                count += 1;
                continue;
            }

            count += 2;
            let (mut k, mut l) = (i, partner);
            remember.push(k);
            remember.push(l);
            i = partner + 1;

            let (start_k, start_l) = (k, l);
            let mut ladder: i64 = 0;
            loop {
                k += 1;
                l -= 1;
                ladder += 1;
                let next = self.partner(k);
                if !(next == l && next > k) {
                    break;
                }
            }

            let mut fill = ladder - 2;
            if ladder >= 2 {
                self.bend(start_k + 1 + fill, FRAC_PI_2);
                self.bend(start_l - 1 - fill, FRAC_PI_2);
                self.bend(start_k, FRAC_PI_2);
                self.bend(start_l, FRAC_PI_2);
                if ladder > 2 {
                    while fill >= 1 {
                        self.straighten(start_k + fill);
                        self.straighten(start_l - fill);
                        fill -= 1;
                    }
                }
            }
            if k <= l {
                self.lay_loop(k, l);
            }
        }

        let polygon = PI * (count - 2) as f64 / count as f64;
        remember.push(end);
        let last = remember.len() - 1;
        let mut begin = i_old.max(0);
        let mut v = 1;
        while v <= last {
            let diff = remember[v] - begin;
            for fill in 0..=diff {
                self.bend(begin + fill, polygon);
            }
            if v + 1 > last {
                break;
            }
            begin = remember[v + 1];
            v += 2;
        }
    }
}
