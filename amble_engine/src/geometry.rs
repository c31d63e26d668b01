/// Integer pixel coordinates. Walk legs accumulate sub-pixel travel in fixed
/// point; everything at rest lives on this grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }
}

/// Corner coordinates of one walkbox in winding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxCoords {
    pub ul: Point,
    pub ur: Point,
    pub lr: Point,
    pub ll: Point,
}

impl BoxCoords {
    pub fn new(corners: [[i32; 2]; 4]) -> BoxCoords {
        BoxCoords {
            ul: Point::new(corners[0][0], corners[0][1]),
            ur: Point::new(corners[1][0], corners[1][1]),
            lr: Point::new(corners[2][0], corners[2][1]),
            ll: Point::new(corners[3][0], corners[3][1]),
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [self.ul, self.ur, self.lr, self.ll]
    }
}

/// Half-plane test: true when `p3` sits on or left of the edge `p1 -> p2`.
/// All containment and gate separation checks reduce to this predicate.
pub fn compare_slope(p1: Point, p2: Point, p3: Point) -> bool {
    (p2.y - p1.y) as i64 * (p3.x - p1.x) as i64 <= (p3.y - p1.y) as i64 * (p2.x - p1.x) as i64
}

pub fn sqr_dist(a: Point, b: Point) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

/// Chebyshev metric, max(|dx|, |dy|). Scripts use it for "is the actor
/// there yet" checks; it is not a path cost.
pub fn chebyshev_dist(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// Projects `p` onto the segment `start -> end` using the dominant-axis
/// parametric form, then clamps along that axis so the result never leaves
/// the segment's coordinate range. Axis-aligned segments snap exactly; a
/// zero-length segment returns `start`.
pub fn closest_pt_on_line(start: Point, end: Point, p: Point) -> Point {
    let ldx = (end.x - start.x) as i64;
    let ldy = (end.y - start.y) as i64;

    let mut result = if ldx == 0 && ldy == 0 {
        return start;
    } else if ldx == 0 {
        Point::new(start.x, p.y)
    } else if ldy == 0 {
        Point::new(p.x, start.y)
    } else {
        let dist = ldx * ldx + ldy * ldy;
        if ldx.abs() > ldy.abs() {
            let a = start.x as i64 * ldy / ldx;
            let b = p.x as i64 * ldx / ldy;
            let c = (a + b - start.y as i64 + p.y as i64) * ldy * ldx / dist;
            Point::new(c as i32, (c * ldy / ldx - a + start.y as i64) as i32)
        } else {
            let a = start.y as i64 * ldx / ldy;
            let b = p.y as i64 * ldy / ldx;
            let c = (a + b - start.x as i64 + p.x as i64) * ldx * ldy / dist;
            Point::new((c * ldx / ldy - a + start.x as i64) as i32, c as i32)
        }
    };

    if ldy.abs() < ldx.abs() {
        if ldx > 0 {
            if result.x < start.x {
                result = start;
            } else if result.x > end.x {
                result = end;
            }
        } else if result.x > start.x {
            result = start;
        } else if result.x < end.x {
            result = end;
        }
    } else if ldy > 0 {
        if result.y < start.y {
            result = start;
        } else if result.y > end.y {
            result = end;
        }
    } else if result.y > start.y {
        result = start;
    } else if result.y < end.y {
        result = end;
    }

    result
}

/// Closest point on the box's perimeter to `p`, with its squared distance.
/// Edges are tried in upper, right, lower, left order; the strict compare
/// keeps the earliest edge on ties.
pub fn closest_pt_on_box(coords: &BoxCoords, p: Point) -> (i64, Point) {
    let edges = [
        (coords.ul, coords.ur),
        (coords.ur, coords.lr),
        (coords.lr, coords.ll),
        (coords.ll, coords.ul),
    ];
    let mut best_dist = i64::MAX;
    let mut best = p;
    for (start, end) in edges {
        let candidate = closest_pt_on_line(start, end, p);
        let dist = sqr_dist(p, candidate);
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }
    (best_dist, best)
}

/// Convex containment test with the box's own winding. Points on an edge
/// count as inside.
pub fn point_in_box(coords: &BoxCoords, p: Point) -> bool {
    let BoxCoords { ul, ur, lr, ll } = *coords;

    if p.x < ul.x && p.x < ur.x && p.x < lr.x && p.x < ll.x {
        return false;
    }
    if p.x > ul.x && p.x > ur.x && p.x > lr.x && p.x > ll.x {
        return false;
    }
    if p.y < ul.y && p.y < ur.y && p.y < lr.y && p.y < ll.y {
        return false;
    }
    if p.y > ul.y && p.y > ur.y && p.y > lr.y && p.y > ll.y {
        return false;
    }

    // Boxes authored as a bare segment still count as floor when the point
    // sits within two pixels of the line.
    if (ul == ur && lr == ll) || (ul == ll && ur == lr) {
        let on_line = closest_pt_on_line(ul, lr, p);
        return sqr_dist(p, on_line) <= 4;
    }

    compare_slope(ul, ur, p)
        && compare_slope(ur, lr, p)
        && compare_slope(lr, ll, p)
        && compare_slope(ll, ul, p)
}

/// True when `p` is guaranteed to be more than `threshold` pixels from the
/// box, letting callers skip the exact edge math.
pub fn quick_reject_near_box(coords: &BoxCoords, p: Point, threshold: i32) -> bool {
    if threshold <= 0 {
        return false;
    }
    let BoxCoords { ul, ur, lr, ll } = *coords;

    let t = p.x - threshold;
    if t > ul.x && t > ur.x && t > lr.x && t > ll.x {
        return true;
    }
    let t = p.x + threshold;
    if t < ul.x && t < ur.x && t < lr.x && t < ll.x {
        return true;
    }
    let t = p.y - threshold;
    if t > ul.y && t > ur.y && t > lr.y && t > ll.y {
        return true;
    }
    let t = p.y + threshold;
    if t < ul.y && t < ur.y && t < lr.y && t < ll.y {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(left: i32, top: i32, right: i32, bottom: i32) -> BoxCoords {
        BoxCoords {
            ul: Point::new(left, top),
            ur: Point::new(right, top),
            lr: Point::new(right, bottom),
            ll: Point::new(left, bottom),
        }
    }

    #[test]
    fn compare_slope_splits_the_plane() {
        let a = Point::new(0, 0);
        let b = Point::new(10, 0);
        assert!(compare_slope(a, b, Point::new(5, 5)));
        assert!(!compare_slope(a, b, Point::new(5, -5)));
        // Collinear points land on the inclusive side.
        assert!(compare_slope(a, b, Point::new(20, 0)));
    }

    #[test]
    fn closest_pt_on_line_snaps_axis_aligned_segments() {
        let a = Point::new(10, 0);
        let b = Point::new(10, 50);
        assert_eq!(closest_pt_on_line(a, b, Point::new(3, 20)), Point::new(10, 20));

        let a = Point::new(0, 7);
        let b = Point::new(40, 7);
        assert_eq!(closest_pt_on_line(a, b, Point::new(13, 30)), Point::new(13, 7));
    }

    #[test]
    fn closest_pt_on_line_clamps_to_endpoints() {
        let a = Point::new(0, 0);
        let b = Point::new(20, 20);
        assert_eq!(closest_pt_on_line(a, b, Point::new(-10, -30)), a);
        assert_eq!(closest_pt_on_line(a, b, Point::new(90, 70)), b);
    }

    #[test]
    fn closest_pt_on_line_handles_degenerate_segment() {
        let a = Point::new(5, 5);
        assert_eq!(closest_pt_on_line(a, a, Point::new(100, -3)), a);
    }

    #[test]
    fn closest_pt_on_line_stays_inside_segment_bounds() {
        let segments = [
            (Point::new(0, 0), Point::new(37, 11)),
            (Point::new(-20, 40), Point::new(15, -25)),
            (Point::new(8, -3), Point::new(-31, -17)),
            (Point::new(100, 200), Point::new(103, 260)),
        ];
        for (a, b) in segments {
            for px in (-60..=120).step_by(7) {
                for py in (-60..=260).step_by(11) {
                    let hit = closest_pt_on_line(a, b, Point::new(px, py));
                    assert!(hit.x >= a.x.min(b.x) && hit.x <= a.x.max(b.x));
                    assert!(hit.y >= a.y.min(b.y) && hit.y <= a.y.max(b.y));
                }
            }
        }
    }

    #[test]
    fn closest_pt_on_box_prefers_earlier_edges_on_ties() {
        let coords = rect(0, 0, 10, 10);
        // Equidistant from the upper and left edges; the upper edge is tried
        // first and a tie must not replace it.
        let (dist, hit) = closest_pt_on_box(&coords, Point::new(0, 0));
        assert_eq!(dist, 0);
        assert_eq!(hit, Point::new(0, 0));

        let (dist, hit) = closest_pt_on_box(&coords, Point::new(5, -4));
        assert_eq!(dist, 16);
        assert_eq!(hit, Point::new(5, 0));
    }

    #[test]
    fn point_in_box_accepts_interior_and_edges() {
        let coords = rect(0, 0, 100, 50);
        assert!(point_in_box(&coords, Point::new(50, 25)));
        assert!(point_in_box(&coords, Point::new(0, 0)));
        assert!(point_in_box(&coords, Point::new(100, 50)));
        assert!(!point_in_box(&coords, Point::new(101, 25)));
        assert!(!point_in_box(&coords, Point::new(50, -1)));
    }

    #[test]
    fn point_in_box_treats_segment_boxes_as_thin_floor() {
        // Degenerate quad: both upper corners coincide, both lower corners
        // coincide, leaving a diagonal line from (0,0) to (40,10).
        let line = BoxCoords {
            ul: Point::new(0, 0),
            ur: Point::new(0, 0),
            lr: Point::new(40, 10),
            ll: Point::new(40, 10),
        };
        assert!(point_in_box(&line, Point::new(20, 5)));
        assert!(point_in_box(&line, Point::new(20, 7)));
        assert!(!point_in_box(&line, Point::new(20, 9)));
    }

    #[test]
    fn quick_reject_is_conservative() {
        let coords = rect(100, 100, 200, 150);
        assert!(quick_reject_near_box(&coords, Point::new(0, 0), 30));
        assert!(!quick_reject_near_box(&coords, Point::new(80, 120), 30));
        // Inside is never rejected.
        assert!(!quick_reject_near_box(&coords, Point::new(150, 120), 30));
    }

    #[test]
    fn chebyshev_takes_the_larger_axis() {
        assert_eq!(chebyshev_dist(Point::new(0, 0), Point::new(3, -9)), 9);
        assert_eq!(chebyshev_dist(Point::new(5, 5), Point::new(5, 5)), 0);
    }
}
