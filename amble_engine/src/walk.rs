//! Per-tick walk machine: next-hop routing, gate refinement into legs, 16.16
//! fixed-point stepping, and one-notch facing interpolation.

use amble_formats::{BoxFlags, INVALID_BOX};

use crate::actor::{Actor, Leg, WalkPhase};
use crate::direction::{angle_from_delta, from_simple_dir, normalize_angle, to_simple_dir};
use crate::gate::{PathLeg, refine_path_leg};
use crate::geometry::Point;
use crate::room::Room;

/// Advances one actor by one tick. Lifecycle changes are appended to
/// `events` as `walk.enter`, `walk.stop`, `walk.faced` and `walk.blocked`
/// lines.
pub fn advance_walk(actor: &mut Actor, room: &Room, events: &mut Vec<String>) {
    if actor.phase == WalkPhase::Idle {
        return;
    }

    if actor.phase != WalkPhase::NewLeg {
        if actor.walk.leg.is_some() && walk_step(actor, room, events) {
            return;
        }
        match actor.phase {
            WalkPhase::LastLeg => {
                finish_walk(actor, events);
                return;
            }
            WalkPhase::Turning => {
                turn_step(actor, room, events);
                return;
            }
            _ => {}
        }
        // A buffered second waypoint continues the hop without re-routing.
        if let Some(waypoint) = actor.walk.point3.take() {
            if start_leg_toward(actor, room, waypoint, events) {
                actor.phase = WalkPhase::InLeg;
                return;
            }
        }
        let route_box = actor.walk.route_box;
        enter_box(actor, room, route_box, events);
    }

    route_next_leg(actor, room, events);
}

/// Follows the next-hop table from the actor's box toward the destination
/// box, refining each hop through its gate until a leg starts or the walk
/// degenerates to the final straight line.
fn route_next_leg(actor: &mut Actor, room: &Room, events: &mut Vec<String>) {
    let mut hops = 0;
    loop {
        hops += 1;
        if hops > room.box_count() + 1 {
            log::warn!("{}: next-hop table loops, stopping walk", actor.label);
            events.push(format!("walk.blocked {} cycle", actor.label));
            actor.phase = WalkPhase::LastLeg;
            return;
        }

        if actor.current_box == INVALID_BOX {
            // Off the grid there is nothing to route through.
            let dest_box = actor.walk.dest_box;
            actor.set_box(room, dest_box);
            actor.walk.route_box = dest_box;
            break;
        }
        if actor.current_box == actor.walk.dest_box {
            break;
        }

        let from = actor.current_box;
        let Some(next) = room.next_box(from, actor.walk.dest_box) else {
            events.push(format!(
                "walk.blocked {} no_route {} -> {}",
                actor.label, from, actor.walk.dest_box
            ));
            actor.walk.dest_box = from;
            actor.phase = WalkPhase::LastLeg;
            return;
        };

        let Ok(flags) = room.flags(next) else {
            events.push(format!("walk.blocked {} bad_box {}", actor.label, next));
            actor.phase = WalkPhase::LastLeg;
            return;
        };
        if flags.contains(BoxFlags::LOCKED)
            && !(flags.contains(BoxFlags::PLAYER_ONLY) && actor.is_player)
        {
            events.push(format!("walk.blocked {} locked {}", actor.label, next));
            actor.phase = WalkPhase::LastLeg;
            return;
        }

        actor.walk.route_box = next;

        let toward_final = next == actor.walk.dest_box && room.masks_allow_direct(from, next);
        let Some((from_coords, next_coords)) = room.coords(from).ok().zip(room.coords(next).ok())
        else {
            events.push(format!("walk.blocked {} bad_box {}", actor.label, next));
            actor.phase = WalkPhase::LastLeg;
            return;
        };

        match refine_path_leg(&from_coords, &next_coords, toward_final, actor.pos, actor.walk.dest)
        {
            PathLeg::Direct => break,
            PathLeg::Via { near, far } => {
                if let Some(near) = near {
                    if start_leg_toward(actor, room, near, events) {
                        actor.walk.point3 = Some(far);
                        actor.phase = WalkPhase::InLeg;
                        return;
                    }
                }
                if start_leg_toward(actor, room, far, events) {
                    actor.phase = WalkPhase::InLeg;
                    return;
                }
            }
        }

        // Already standing on both waypoints; take the hop and keep routing.
        enter_box(actor, room, next, events);
    }

    actor.phase = WalkPhase::LastLeg;
    let dest = actor.walk.dest;
    start_leg_toward(actor, room, dest, events);
}

/// Arms a straight leg from the actor's position to `to` and takes its first
/// step. Returns false when the actor already stands there.
///
/// The y velocity is the y speed outright; the x velocity follows the leg's
/// slope, capped at the x speed (with y recomputed to keep the slope).
fn start_leg_toward(actor: &mut Actor, room: &Room, to: Point, events: &mut Vec<String>) -> bool {
    if actor.pos == to {
        return false;
    }

    let diff_x = (to.x - actor.pos.x) as i64;
    let diff_y = (to.y - actor.pos.y) as i64;

    let mut delta_y = (actor.walk_speed_y as i64) << 16;
    if diff_y < 0 {
        delta_y = -delta_y;
    }
    let mut delta_x = delta_y * diff_x;
    if diff_y != 0 {
        delta_x /= diff_y;
    } else {
        delta_y = 0;
    }

    let cap = (actor.walk_speed_x as i64) << 16;
    if delta_x.abs() > cap {
        delta_x = if diff_x < 0 { -cap } else { cap };
        delta_y = delta_x * diff_y / diff_x;
    }

    actor.walk.leg = Some(Leg {
        start: actor.pos,
        end: to,
        delta_x: delta_x as i32,
        delta_y: delta_y as i32,
        frac_x: 0,
        frac_y: 0,
    });
    actor.target_facing =
        angle_from_delta(delta_x as i32, delta_y as i32, actor.variant.atan_headings());
    log::debug!("{}: new leg toward {},{}", actor.label, to.x, to.y);

    walk_step(actor, room, events)
}

/// One step along the active leg. Returns false once the leg has covered its
/// full span on both axes, clearing it.
fn walk_step(actor: &mut Actor, room: &Room, events: &mut Vec<String>) -> bool {
    let Some(mut leg) = actor.walk.leg else {
        return false;
    };

    let span_x = (leg.end.x - leg.start.x).abs();
    let span_y = (leg.end.y - leg.start.y).abs();
    if (actor.pos.x - leg.start.x).abs() >= span_x && (actor.pos.y - leg.start.y).abs() >= span_y {
        actor.walk.leg = None;
        return false;
    }

    actor.facing = next_facing_step(actor, room);

    // Sync the box as soon as the position crosses into the hop target.
    if actor.current_box != actor.walk.route_box
        && room.point_in_box(actor.walk.route_box, actor.pos).unwrap_or(false)
    {
        let route_box = actor.walk.route_box;
        enter_box(actor, room, route_box, events);
    }

    let step_x = ((leg.delta_x >> 8) as i64) * actor.scale as i64;
    let tmp_x = ((actor.pos.x as i64) << 16) + leg.frac_x as i64 + step_x;
    leg.frac_x = tmp_x as u16;
    actor.pos.x = (tmp_x >> 16) as i32;

    let step_y = ((leg.delta_y >> 8) as i64) * actor.scale as i64;
    let tmp_y = ((actor.pos.y as i64) << 16) + leg.frac_y as i64 + step_y;
    leg.frac_y = tmp_y as u16;
    actor.pos.y = (tmp_y >> 16) as i32;

    // Never run past the waypoint.
    if (actor.pos.x - leg.start.x).abs() > span_x {
        actor.pos.x = leg.end.x;
    }
    if (actor.pos.y - leg.start.y).abs() > span_y {
        actor.pos.y = leg.end.y;
    }

    actor.walk.leg = Some(leg);
    actor.refresh_scale(room);
    true
}

/// Facing after one tick of rotation toward the target, remapped through the
/// current box's flip flags and quantized to the variant's direction grid.
fn next_facing_step(actor: &Actor, room: &Room) -> i32 {
    let mut target = actor.target_facing;
    if !actor.ignore_boxes {
        if let Ok(flags) = room.flags(actor.current_box) {
            if flags.contains(BoxFlags::X_FLIP) {
                target = 360 - target;
            }
            if flags.contains(BoxFlags::Y_FLIP) {
                target = 180 - target;
            }
        }
    }

    let mode = actor.variant.direction_mode();
    let from = to_simple_dir(mode, normalize_angle(actor.facing));
    let to = to_simple_dir(mode, normalize_angle(target));
    let num = mode.step_count();

    // Rotate whichever way is shorter, one notch per tick.
    let mut diff = to - from;
    if diff.abs() > num / 2 {
        diff = -diff;
    }
    let next = if diff > 0 {
        from + 1
    } else if diff < 0 {
        from - 1
    } else {
        to
    };
    from_simple_dir(mode, (next + num) % num)
}

fn turn_step(actor: &mut Actor, room: &Room, events: &mut Vec<String>) {
    let next = next_facing_step(actor, room);
    if actor.facing != next {
        actor.facing = next;
    } else {
        actor.phase = WalkPhase::Idle;
        events.push(format!("walk.faced {} {}", actor.label, actor.facing));
    }
}

fn finish_walk(actor: &mut Actor, events: &mut Vec<String>) {
    actor.phase = WalkPhase::Idle;
    actor.walk.leg = None;
    actor.walk.point3 = None;
    match actor.current_box() {
        Some(id) => events.push(format!(
            "walk.stop {} {},{} box {}",
            actor.label, actor.pos.x, actor.pos.y, id
        )),
        None => events.push(format!(
            "walk.stop {} {},{}",
            actor.label, actor.pos.x, actor.pos.y
        )),
    }
    if let Some(dest_facing) = actor.walk.dest_facing {
        let dest_facing = normalize_angle(dest_facing);
        if dest_facing != actor.facing {
            actor.target_facing = dest_facing;
            actor.phase = WalkPhase::Turning;
        }
    }
}

fn enter_box(actor: &mut Actor, room: &Room, box_id: u8, events: &mut Vec<String>) {
    if actor.current_box != box_id {
        actor.set_box(room, box_id);
        if box_id != INVALID_BOX {
            events.push(format!("walk.enter {} {}", actor.label, box_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use amble_formats::{BoxDef, NextHopMatrix};

    use super::*;
    use crate::variant::{EightDirWalker, FourDirWalker};

    fn box_def(left: i16, top: i16, right: i16, bottom: i16) -> BoxDef {
        BoxDef::new([[left, top], [right, top], [right, bottom], [left, bottom]])
    }

    fn one_box_room() -> Room {
        Room::new(vec![box_def(0, 0, 100, 100)], Vec::new()).unwrap()
    }

    fn two_box_room() -> Room {
        let mut room = Room::new(
            vec![box_def(0, 0, 100, 100), box_def(100, 0, 200, 100)],
            Vec::new(),
        )
        .unwrap();
        let hops = NextHopMatrix::from_rows(&[vec![0, 1], vec![0, 1]]).unwrap();
        room.rebuild_matrix(&hops).unwrap();
        room
    }

    fn walker(label: &str) -> Actor {
        Actor::new(label, Rc::new(EightDirWalker))
    }

    /// Ticks until the actor goes idle, returning the tick count.
    fn run(actor: &mut Actor, room: &Room, events: &mut Vec<String>, max_ticks: usize) -> usize {
        for tick in 1..=max_ticks {
            advance_walk(actor, room, events);
            if !actor.is_moving() {
                return tick;
            }
        }
        max_ticks
    }

    #[test]
    fn straight_leg_arrives_and_stops() {
        let room = one_box_room();
        let mut actor = walker("a");
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(10, 50));
        actor.start_walk(&room, Point::new(90, 50), None);

        let ticks = run(&mut actor, &room, &mut events, 50);
        assert!(ticks < 50);
        assert_eq!(actor.pos(), Point::new(90, 50));
        assert!(!actor.is_moving());
        assert!(events.iter().any(|e| e == "walk.stop a 90,50 box 0"));
    }

    #[test]
    fn facing_rotates_one_notch_per_tick() {
        let room = one_box_room();
        let mut actor = walker("a");
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(10, 50));
        assert_eq!(actor.facing(), 180);
        actor.start_walk(&room, Point::new(90, 50), None);

        advance_walk(&mut actor, &room, &mut events);
        assert_eq!(actor.facing(), 135);
        advance_walk(&mut actor, &room, &mut events);
        assert_eq!(actor.facing(), 90);
        advance_walk(&mut actor, &room, &mut events);
        assert_eq!(actor.facing(), 90);
    }

    #[test]
    fn four_way_walker_converges_on_right_angles() {
        let room = one_box_room();
        let mut actor = Actor::new("a", Rc::new(FourDirWalker));
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(10, 50));
        actor.start_walk(&room, Point::new(90, 50), None);

        advance_walk(&mut actor, &room, &mut events);
        assert_eq!(actor.facing(), 90);
    }

    #[test]
    fn arrival_turn_fires_faced_event() {
        let room = one_box_room();
        let mut actor = walker("a");
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(10, 50));
        actor.start_walk(&room, Point::new(90, 50), Some(0));

        run(&mut actor, &room, &mut events, 50);
        assert_eq!(actor.facing(), 0);
        assert!(events.iter().any(|e| e == "walk.faced a 0"));
    }

    #[test]
    fn turn_in_place_converges() {
        let room = one_box_room();
        let mut actor = walker("a");
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(50, 50));
        actor.turn_to(0);

        let ticks = run(&mut actor, &room, &mut events, 10);
        assert_eq!(actor.facing(), 0);
        assert!(ticks <= 6);
        assert!(events.iter().any(|e| e == "walk.faced a 0"));
    }

    #[test]
    fn locked_box_blocks_the_walk() {
        let mut room = two_box_room();
        room.set_box_flags(1, BoxFlags::LOCKED).unwrap();
        let mut actor = walker("a");
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(50, 50));
        actor.start_walk(&room, Point::new(150, 50), None);

        run(&mut actor, &room, &mut events, 10);
        assert_eq!(actor.pos(), Point::new(50, 50));
        assert_eq!(actor.current_box(), Some(0));
        assert!(events.iter().any(|e| e == "walk.blocked a locked 1"));
    }

    #[test]
    fn player_crosses_player_only_locked_box() {
        let mut room = two_box_room();
        room.set_box_flags(1, BoxFlags::LOCKED.with(BoxFlags::PLAYER_ONLY))
            .unwrap();
        let mut actor = walker("player");
        actor.is_player = true;
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(50, 50));
        actor.start_walk(&room, Point::new(150, 50), None);

        let ticks = run(&mut actor, &room, &mut events, 400);
        assert!(ticks < 400);
        assert_eq!(actor.pos(), Point::new(150, 50));
        assert_eq!(actor.current_box(), Some(1));
        assert!(events.iter().any(|e| e == "walk.enter player 1"));
    }

    #[test]
    fn no_route_stops_in_place() {
        let mut room = two_box_room();
        let hops = NextHopMatrix::from_rows(&[vec![0, INVALID_BOX], vec![0, 1]]).unwrap();
        room.rebuild_matrix(&hops).unwrap();
        let mut actor = walker("a");
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(50, 50));
        actor.start_walk(&room, Point::new(150, 50), None);

        run(&mut actor, &room, &mut events, 10);
        assert_eq!(actor.pos(), Point::new(50, 50));
        assert!(events.iter().any(|e| e == "walk.blocked a no_route 0 -> 1"));
    }

    #[test]
    fn self_referencing_hop_row_trips_the_cycle_guard() {
        let boxes = vec![box_def(10, 10, 10, 10), box_def(40, 40, 60, 60)];
        let mut room = Room::new(boxes, Vec::new()).unwrap();
        let hops = NextHopMatrix::from_rows(&[vec![0, 0], vec![0, 1]]).unwrap();
        room.rebuild_matrix(&hops).unwrap();
        let mut actor = walker("a");
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(10, 10));
        actor.start_walk(&room, Point::new(50, 50), None);

        run(&mut actor, &room, &mut events, 10);
        assert_eq!(actor.pos(), Point::new(10, 10));
        assert!(!actor.is_moving());
        assert!(events.iter().any(|e| e == "walk.blocked a cycle"));
    }

    #[test]
    fn x_flip_box_mirrors_walk_facing() {
        let mut room = one_box_room();
        room.set_box_flags(0, BoxFlags::X_FLIP).unwrap();
        let mut actor = walker("a");
        let mut events = Vec::new();
        actor.put_at(&room, Point::new(10, 50));
        actor.start_walk(&room, Point::new(90, 50), None);

        run(&mut actor, &room, &mut events, 50);
        // Walked east, but the box mirrors headings across the vertical axis.
        assert_eq!(actor.pos(), Point::new(90, 50));
        assert_eq!(actor.facing(), 270);
    }
}
