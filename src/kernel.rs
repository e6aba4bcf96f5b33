//! The numerical core: stencil forces, integration, and drift removal.
//!
//! Every function here works on plain slices over an index range, so the
//! worker pool can fan disjoint ranges out across threads and the tests
//! can run the same code single-threaded over the full grid. Neighbor
//! heights are read from a snapshot taken before the force phase, which
//! makes the result independent of how the grid is partitioned.
//!
//! The model is a heuristic grid stencil, not an exact fluid solver: each
//! cell accelerates toward the average height of its non-static neighbors,
//! then sheds a fraction of its kinetic and potential energy separately.
//! The two loss halves are deliberately kept as square roots of remaining
//! energy; collapsing them into one multiplicative damping changes the
//! visible behavior near crests.

/// Run the force step over `[first, first + height.len())`.
///
/// `prev`, `mass`, `loss` and `fixity` span the whole grid; `height` and
/// `velocity` are the sub-slices owned by the caller's partition. For each
/// cell: static cells are pinned to zero height; dynamic cells accelerate
/// toward the average of their non-static neighbors (read from `prev`),
/// capped so a cell never overshoots a symmetric bounce, then kinetic and
/// potential loss are applied. Inconsistent ranges are a no-op.
pub fn step_range(
    prev: &[f32],
    mass: &[f32],
    loss: &[f32],
    fixity: &[f32],
    height: &mut [f32],
    velocity: &mut [f32],
    size: usize,
    first: usize,
) {
    let cells = size * size;
    if prev.len() != cells
        || mass.len() != cells
        || loss.len() != cells
        || fixity.len() != cells
        || height.len() != velocity.len()
        || first + height.len() > cells
    {
        return;
    }

    for k in 0..height.len() {
        let i = first + k;
        if fixity[i] != 0.0 {
            height[k] = 0.0;
            continue;
        }
        let x = i % size;
        let y = i / size;

        let up = y > 0 && fixity[i - size] == 0.0;
        let down = y + 1 < size && fixity[i + size] == 0.0;
        let left = x > 0 && fixity[i - 1] == 0.0;
        let right = x + 1 < size && fixity[i + 1] == 0.0;

        let mut sum = 0.0f32;
        let mut count = 0u32;
        if up {
            sum += prev[i - size];
            count += 1;
        }
        if down {
            sum += prev[i + size];
            count += 1;
        }
        if left {
            sum += prev[i - 1];
            count += 1;
        }
        if right {
            sum += prev[i + 1];
            count += 1;
        }
        // Diagonals participate only when both of their orthogonal sides
        // do; a wave cannot slip through the corner gap between two
        // obstacle cells.
        if up && left && fixity[i - size - 1] == 0.0 {
            sum += prev[i - size - 1];
            count += 1;
        }
        if up && right && fixity[i - size + 1] == 0.0 {
            sum += prev[i - size + 1];
            count += 1;
        }
        if down && left && fixity[i + size - 1] == 0.0 {
            sum += prev[i + size - 1];
            count += 1;
        }
        if down && right && fixity[i + size + 1] == 0.0 {
            sum += prev[i + size + 1];
            count += 1;
        }

        let (delta, mut accel) = if count > 0 {
            let d = prev[i] - sum / count as f32;
            (d, -d / mass[i])
        } else {
            (0.0, 0.0)
        };

        // |a| <= 2|delta|, sign preserved: never overshoot the mirror
        // image of the current displacement.
        let limit = 2.0 * delta.abs();
        if accel.abs() > limit {
            accel = limit * accel.signum();
        }

        let remaining = 1.0 - loss[i];
        let m = mass[i];

        let mut v = velocity[k] + accel;
        let kinetic = 0.5 * m * v * v;
        v = v.signum() * (2.0 * kinetic * remaining / m).sqrt();
        velocity[k] = v;

        let potential = 0.5 * delta * delta;
        height[k] += delta.signum() * (2.0 * potential * remaining).sqrt() - delta;
    }
}

/// Run the move step: add velocity to height across the partition.
/// Mismatched sub-slices are a no-op.
pub fn advance_range(height: &mut [f32], velocity: &[f32]) {
    if height.len() != velocity.len() {
        return;
    }
    for (h, v) in height.iter_mut().zip(velocity) {
        *h += *v;
    }
}

/// Remove DC drift by subtracting the grid mean from every cell.
///
/// The stencil slowly pushes the whole surface away from zero; this pulls
/// it back after each cycle. Runs single-threaded on the conductor and
/// must stay optional so energy-accounting tests can disable it.
pub fn shift_to_origin(height: &mut [f32]) {
    if height.is_empty() {
        return;
    }
    let sum: f64 = height.iter().map(|&h| h as f64).sum();
    let shift = -(sum / height.len() as f64) as f32;
    for h in height {
        *h += shift;
    }
}
