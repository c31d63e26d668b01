//! Compass-degree facing math. Zero points up and angles grow clockwise, so
//! 90 is right, 180 is down and 270 is left.

/// How many principal directions an actor's sprite set provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionMode {
    FourWay,
    EightWay,
}

impl DirectionMode {
    pub fn step_count(self) -> i32 {
        match self {
            DirectionMode::FourWay => 4,
            DirectionMode::EightWay => 8,
        }
    }
}

// Inclusive sector fences. Angles outside every pair belong to the
// wrap-around sector straddling zero.
const EIGHT_WAY_FENCES: [i32; 8] = [22, 72, 107, 157, 202, 252, 287, 337];
const FOUR_WAY_FENCES: [i32; 4] = [71, 109, 251, 289];

/// Snaps any angle to the nearest of the eight principal directions.
pub fn normalize_angle(angle: i32) -> i32 {
    let reduced = angle.rem_euclid(360);
    to_simple_dir(DirectionMode::EightWay, reduced) * 45
}

/// Bins an angle in [0, 360) into a discrete direction index. Angles outside
/// every fence pair fall into the wrap-around sector and return 0; callers
/// treat 0 as a direction like any other.
pub fn to_simple_dir(mode: DirectionMode, angle: i32) -> i32 {
    match mode {
        DirectionMode::EightWay => {
            for i in 0..7 {
                if angle >= EIGHT_WAY_FENCES[i] && angle <= EIGHT_WAY_FENCES[i + 1] {
                    return i as i32 + 1;
                }
            }
        }
        DirectionMode::FourWay => {
            for i in 0..3 {
                if angle >= FOUR_WAY_FENCES[i] && angle <= FOUR_WAY_FENCES[i + 1] {
                    return i as i32 + 1;
                }
            }
        }
    }
    0
}

/// Maps a direction index back onto the degree grid: 90 degree steps in
/// four-way mode, 45 in eight-way.
pub fn from_simple_dir(mode: DirectionMode, index: i32) -> i32 {
    match mode {
        DirectionMode::FourWay => index * 90,
        DirectionMode::EightWay => index * 45,
    }
}

/// Heading of a movement delta. The atan form follows the delta smoothly and
/// snaps to the eight-way grid; the coarse form is the axis heuristic legacy
/// four-direction sprite sets were animated against.
pub fn angle_from_delta(dx: i32, dy: i32, use_atan: bool) -> i32 {
    if use_atan {
        let raw = (dx as f64).atan2(-(dy as f64)).to_degrees();
        normalize_angle(raw as i32)
    } else if dy.abs() * 2 < dx.abs() {
        if dx > 0 { 90 } else { 270 }
    } else if dy > 0 {
        180
    } else {
        0
    }
}
