//! Full-search block motion estimation, used by inter-coded video frames.
//!
//! Grounded on the reference encoder's `findBestMotionVector`/`calculateSAD`:
//! for each block in the current frame, every candidate displacement within
//! `search_range` of the origin is scored by sum-of-absolute-differences
//! against the previous reconstructed frame, clipped to stay within the
//! plane. Ties are broken by scan order (the first candidate seen, since a
//! strictly-less-than comparison never displaces an earlier tie).

/// A block displacement, in pixels, relative to the block's own position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MotionVector {
    pub dx: i32,
    pub dy: i32,
}

/// Sum of absolute differences between the block at `(block_x, block_y)` in
/// `current` and the block at `(block_x + dx, block_y + dy)` in `reference`,
/// both of size `block_width x block_height` in a plane of the given `width`
/// and `height`. Candidate positions that would read outside the reference
/// plane are rejected by the caller before this is invoked.
#[allow(clippy::too_many_arguments)]
fn calculate_sad(
    current: &[u8],
    reference: &[u8],
    width: usize,
    block_x: usize,
    block_y: usize,
    block_width: usize,
    block_height: usize,
    dx: i32,
    dy: i32,
) -> u64 {
    let mut sad: u64 = 0;
    for by in 0..block_height {
        for bx in 0..block_width {
            let cx = block_x + bx;
            let cy = block_y + by;
            let rx = (cx as i32 + dx) as usize;
            let ry = (cy as i32 + dy) as usize;
            let c = current[cy * width + cx] as i32;
            let r = reference[ry * width + rx] as i32;
            sad += (c - r).unsigned_abs() as u64;
        }
    }
    sad
}

/// Searches every displacement in `-search_range..=search_range` on both
/// axes for the one that minimises SAD against `reference`, clipping
/// candidates that would read outside the plane. Returns the best vector and
/// its SAD.
#[allow(clippy::too_many_arguments)]
pub fn find_best_motion_vector(
    current: &[u8],
    reference: &[u8],
    width: usize,
    height: usize,
    block_x: usize,
    block_y: usize,
    block_width: usize,
    block_height: usize,
    search_range: i32,
) -> (MotionVector, u64) {
    let mut best = MotionVector::default();
    let mut best_sad = u64::MAX;

    for dy in -search_range..=search_range {
        let ry_start = block_y as i32 + dy;
        let ry_end = ry_start + block_height as i32 - 1;
        if ry_start < 0 || ry_end >= height as i32 {
            continue;
        }

        for dx in -search_range..=search_range {
            let rx_start = block_x as i32 + dx;
            let rx_end = rx_start + block_width as i32 - 1;
            if rx_start < 0 || rx_end >= width as i32 {
                continue;
            }

            let sad = calculate_sad(
                current,
                reference,
                width,
                block_x,
                block_y,
                block_width,
                block_height,
                dx,
                dy,
            );

            if sad < best_sad {
                best_sad = sad;
                best = MotionVector { dx, dy };
            }
        }
    }

    (best, best_sad)
}

/// Extracts the motion-compensated prediction for a block, i.e. the block of
/// `reference` displaced by `mv` relative to `(block_x, block_y)`. The
/// displacement is assumed already validated in-bounds by whoever produced
/// `mv` (e.g. [`find_best_motion_vector`]).
#[allow(clippy::too_many_arguments)]
pub fn get_predicted_block(
    reference: &[u8],
    width: usize,
    block_x: usize,
    block_y: usize,
    block_width: usize,
    block_height: usize,
    mv: MotionVector,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(block_width * block_height);
    for by in 0..block_height {
        for bx in 0..block_width {
            let rx = (block_x as i32 + bx as i32 + mv.dx) as usize;
            let ry = (block_y as i32 + by as i32 + mv.dy) as usize;
            out.push(reference[ry * width + rx]);
        }
    }
    out
}

#[test]
fn test_zero_motion_is_found_for_identical_frames() {
    let width = 8;
    let height = 8;
    let plane: Vec<u8> = (0..64).map(|x| (x * 3) as u8).collect();

    let (mv, sad) = find_best_motion_vector(&plane, &plane, width, height, 2, 2, 4, 4, 3);

    assert_eq!(sad, 0);
    assert_eq!(mv, MotionVector { dx: 0, dy: 0 });
}

#[test]
fn test_search_finds_translated_block() {
    let width = 10;
    let height = 10;
    let mut reference = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            reference[y * width + x] = ((x + y * 2) % 251) as u8;
        }
    }

    // `current` is `reference` shifted right by 2, down by 1; a block that
    // sat at (4, 4) in the reference now appears at (6, 5) in `current`.
    let mut current = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let sx = x as i32 - 2;
            let sy = y as i32 - 1;
            if sx >= 0 && sy >= 0 && (sx as usize) < width && (sy as usize) < height {
                current[y * width + x] = reference[sy as usize * width + sx as usize];
            }
        }
    }

    let (mv, sad) =
        find_best_motion_vector(&current, &reference, width, height, 6, 5, 3, 3, 4);

    assert_eq!(mv, MotionVector { dx: 2, dy: 1 });
    assert_eq!(sad, 0);
}

#[test]
fn test_search_range_is_clipped_at_plane_edges() {
    let width = 6;
    let height = 6;
    let plane = vec![9u8; width * height];

    // block at the very corner: any negative displacement must be skipped
    // without panicking on out-of-bounds access.
    let (mv, sad) = find_best_motion_vector(&plane, &plane, width, height, 0, 0, 2, 2, 5);
    assert_eq!(sad, 0);
    assert!(mv.dx >= 0 && mv.dy >= 0);
}

#[test]
fn test_get_predicted_block_reads_displaced_region() {
    let width = 4;
    let reference: Vec<u8> = (0..16).collect();
    let block = get_predicted_block(&reference, width, 0, 0, 2, 2, MotionVector { dx: 1, dy: 1 });
    assert_eq!(block, vec![5, 6, 9, 10]);
}
