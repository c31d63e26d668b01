use crate::geometry::{BoxCoords, Point, closest_pt_on_box, closest_pt_on_line, compare_slope};

/// Candidates at or beyond this squared distance never form a gate.
const GATE_DIST_CAP: i64 = 0xFFFF;
/// Linear distances closer than this count as a parallel pair.
const GATE_EPSILON: i64 = 4;

/// Crossing boundary between two adjacent boxes, one segment per side.
/// Index 0 of each segment lies on box A's side, index 1 on box B's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub a: [Point; 2],
    pub b: [Point; 2],
}

/// Derives the gate between `box_a` and `box_b` from the three closest
/// corner-to-perimeter candidates.
pub fn compute_gate(box_a: &BoxCoords, box_b: &BoxCoords) -> Gate {
    let mut corners = [Point::default(); 8];
    let mut closest = [Point::default(); 8];
    let mut dist = [0i64; 8];

    // Eight candidates: each corner of one box paired with the nearest point
    // on the other box's perimeter.
    for (i, corner) in box_a.corners().into_iter().enumerate() {
        let (d, pt) = closest_pt_on_box(box_b, corner);
        corners[i] = corner;
        closest[i] = pt;
        dist[i] = d;
    }
    for (i, corner) in box_b.corners().into_iter().enumerate() {
        let (d, pt) = closest_pt_on_box(box_a, corner);
        corners[i + 4] = corner;
        closest[i + 4] = pt;
        dist[i + 4] = d;
    }

    // Pick the three closest candidates under the cap, remembering which box
    // each corner came from. Comparisons below run on linear distances.
    let mut pick = [0usize; 3];
    let mut from_b = [false; 3];
    let mut min_dist = [0i64; 3];
    for j in 0..3 {
        let mut best = 0usize;
        let mut best_dist = GATE_DIST_CAP;
        for (i, &d) in dist.iter().enumerate() {
            if d < best_dist {
                best_dist = d;
                best = i;
            }
        }
        min_dist[j] = (best_dist as f64).sqrt() as i64;
        pick[j] = best;
        from_b[j] = best >= 4;
        dist[best] = GATE_DIST_CAP;
    }

    // Tie-break ladder. The order decides which near-equal pair wins and
    // therefore where actors cut the corner; with no qualifying pair the
    // best candidate serves as both sides.
    let (line1, line2) = if from_b[0] == from_b[1] && (min_dist[0] - min_dist[1]).abs() < GATE_EPSILON
    {
        (pick[0], pick[1])
    } else if from_b[0] == from_b[1] && min_dist[0] == min_dist[1] {
        (pick[0], pick[1])
    } else if from_b[0] == from_b[2] && min_dist[0] == min_dist[2] {
        (pick[0], pick[2])
    } else if from_b[1] == from_b[2] && min_dist[1] == min_dist[2] {
        (pick[1], pick[2])
    } else if from_b[0] == from_b[2] && (min_dist[0] - min_dist[2]).abs() < GATE_EPSILON {
        (pick[0], pick[2])
    } else if from_b[1] == from_b[2] && (min_dist[1] - min_dist[2]).abs() < GATE_EPSILON {
        (pick[1], pick[2])
    } else {
        (pick[0], pick[0])
    };

    Gate {
        a: orient(line1, corners[line1], closest[line1]),
        b: orient(line2, corners[line2], closest[line2]),
    }
}

// Candidates 0..4 start from box A corners, 4..8 from box B corners; swap so
// index 0 always sits on box A's side.
fn orient(candidate: usize, corner: Point, closest: Point) -> [Point; 2] {
    if candidate < 4 {
        [corner, closest]
    } else {
        [closest, corner]
    }
}

/// Waypoints for one hop of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLeg {
    /// The actor already walks between both gate segments of its final hop;
    /// head straight for the true destination.
    Direct,
    /// Cross the gate: swing around `near` first when present, then head for
    /// `far`.
    Via { near: Option<Point>, far: Point },
}

/// Refines the hop from `box_a` into `box_b` down to concrete waypoints.
/// `toward_final` is set when `box_b` is the destination box and the room's
/// mask rule permits a direct leg.
pub fn refine_path_leg(
    box_a: &BoxCoords,
    box_b: &BoxCoords,
    toward_final: bool,
    actor: Point,
    dest: Point,
) -> PathLeg {
    let gate = compute_gate(box_a, box_b);

    if toward_final {
        let near_split =
            compare_slope(actor, dest, gate.a[0]) != compare_slope(actor, dest, gate.b[0]);
        let far_split =
            compare_slope(actor, dest, gate.a[1]) != compare_slope(actor, dest, gate.b[1]);
        if near_split && far_split {
            return PathLeg::Direct;
        }
    }

    let far = closest_pt_on_line(gate.a[1], gate.b[1], actor);
    // Only detour through the near segment when the actor is on the same side
    // of the projected heading for both of its endpoints.
    let near = if compare_slope(actor, far, gate.a[0]) == compare_slope(actor, far, gate.b[0]) {
        Some(closest_pt_on_line(gate.a[0], gate.b[0], actor))
    } else {
        None
    };

    PathLeg::Via { near, far }
}
