//! Edge-anchored stability.
//!
//! A disc is counted as stable when it sits on an edge and is connected to an
//! occupied corner of the same colour by an unbroken run of that colour. Such
//! discs can never be flipped. The test is conservative: interior stable discs
//! are not detected.

use crate::bitboard::{shift_e, shift_n, shift_s, shift_w};

/// Each corner with the two edge directions leading away from it.
const CORNER_RAYS: [(u64, [fn(u64) -> u64; 2]); 4] = [
    // a1: row 0 runs east, column a runs toward row 7
    (1 << 56, [shift_e, shift_s]),
    // h1
    (1 << 63, [shift_w, shift_s]),
    // a8
    (1 << 0, [shift_e, shift_n]),
    // h8
    (1 << 7, [shift_w, shift_n]),
];

/// Returns the discs of `own` that are stable along the edges.
///
/// # Arguments
///
/// * `own` - Discs of one colour.
///
/// # Returns
///
/// Mask of the corner-anchored edge runs.
pub fn edge_stable_discs(own: u64) -> u64 {
    let mut stable = 0;
    for (corner, rays) in CORNER_RAYS {
        if own & corner == 0 {
            continue;
        }
        stable |= corner;
        for shift in rays {
            let mut x = shift(corner);
            while x & own != 0 {
                stable |= x;
                x = shift(x);
            }
        }
    }
    stable
}
