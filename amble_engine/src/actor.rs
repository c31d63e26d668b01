use std::rc::Rc;

use amble_formats::{BoxId, INVALID_BOX};

use crate::geometry::Point;
use crate::room::Room;
use crate::variant::WalkVariant;

/// Stage of the walk state machine, advanced once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkPhase {
    #[default]
    Idle,
    /// A new destination was accepted; route the first hop next tick.
    NewLeg,
    /// Following a straight leg toward the current waypoint.
    InLeg,
    /// Rotating in place toward the target facing.
    Turning,
    /// Final approach; when its leg ends the walk stops and turns.
    LastLeg,
}

/// Fixed-point motion state for one straight leg. Deltas are 16.16 per-tick
/// velocities before scale is applied; fractions carry sub-pixel remainders
/// between ticks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Leg {
    pub(crate) start: Point,
    pub(crate) end: Point,
    pub(crate) delta_x: i32,
    pub(crate) delta_y: i32,
    pub(crate) frac_x: u16,
    pub(crate) frac_y: u16,
}

/// Route bookkeeping that survives phase changes within one walk.
#[derive(Debug)]
pub(crate) struct WalkData {
    pub(crate) dest: Point,
    pub(crate) dest_box: BoxId,
    pub(crate) dest_facing: Option<i32>,
    /// Box the current leg leads into; the actor's box is synced to it as
    /// soon as its position crosses the boundary.
    pub(crate) route_box: BoxId,
    /// Buffered second waypoint of a two-point hop refinement.
    pub(crate) point3: Option<Point>,
    pub(crate) leg: Option<Leg>,
}

impl Default for WalkData {
    fn default() -> WalkData {
        WalkData {
            dest: Point::default(),
            dest_box: INVALID_BOX,
            dest_facing: None,
            route_box: INVALID_BOX,
            point3: None,
            leg: None,
        }
    }
}

/// One walking character. Position rests on the pixel grid; sub-pixel travel
/// accumulates in the active leg.
#[derive(Debug)]
pub struct Actor {
    pub(crate) label: String,
    pub(crate) variant: Rc<dyn WalkVariant>,
    pub(crate) pos: Point,
    pub(crate) facing: i32,
    pub(crate) target_facing: i32,
    pub(crate) walk_speed_x: i32,
    pub(crate) walk_speed_y: i32,
    pub(crate) scale: u8,
    pub(crate) is_player: bool,
    pub(crate) ignore_boxes: bool,
    pub(crate) current_box: BoxId,
    pub(crate) phase: WalkPhase,
    pub(crate) walk: WalkData,
}

impl Actor {
    pub fn new(label: impl Into<String>, variant: Rc<dyn WalkVariant>) -> Actor {
        Actor {
            label: label.into(),
            variant,
            pos: Point::default(),
            facing: 180,
            target_facing: 180,
            walk_speed_x: 8,
            walk_speed_y: 2,
            scale: 255,
            is_player: false,
            ignore_boxes: false,
            current_box: INVALID_BOX,
            phase: WalkPhase::Idle,
            walk: WalkData::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pos(&self) -> Point {
        self.pos
    }

    pub fn facing(&self) -> i32 {
        self.facing
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn phase(&self) -> WalkPhase {
        self.phase
    }

    pub fn is_moving(&self) -> bool {
        self.phase != WalkPhase::Idle
    }

    pub fn is_player(&self) -> bool {
        self.is_player
    }

    pub fn ignores_boxes(&self) -> bool {
        self.ignore_boxes
    }

    /// Box the actor currently stands in, if it is on the walkbox grid.
    pub fn current_box(&self) -> Option<BoxId> {
        if self.current_box == INVALID_BOX {
            None
        } else {
            Some(self.current_box)
        }
    }

    /// Destination of the walk in flight, if any.
    pub fn destination(&self) -> Option<Point> {
        if self.is_moving() {
            Some(self.walk.dest)
        } else {
            None
        }
    }

    /// Per-tick speed in pixels along each axis, before scale.
    pub fn set_walk_speed(&mut self, x: i32, y: i32) {
        self.walk_speed_x = x.max(1);
        self.walk_speed_y = y.max(1);
    }

    /// Detaches the actor from (or reattaches it to) the walkbox grid.
    /// Off-grid actors walk straight lines and ignore locks and scale.
    pub fn set_ignore_boxes(&mut self, room: &Room, on: bool) {
        self.ignore_boxes = on;
        self.put_at(room, self.pos);
    }

    /// Begins (or retargets) a walk toward `dest`, optionally facing a given
    /// direction on arrival. The point is snapped into the walkbox grid
    /// first; a zero-distance walk reduces to a turn.
    pub fn start_walk(&mut self, room: &Room, dest: Point, facing: Option<i32>) {
        let (dest, dest_box) = if self.ignore_boxes {
            self.current_box = INVALID_BOX;
            (dest, INVALID_BOX)
        } else {
            let reuse = self.walk.dest_box != INVALID_BOX
                && room.point_in_box(self.walk.dest_box, dest).unwrap_or(false);
            let (adjusted, found) = if reuse {
                (dest, Some(self.walk.dest_box))
            } else {
                room.adjust_point_to_box(dest, self.is_player)
            };
            // Re-issuing the walk already in flight is a no-op.
            if self.is_moving() && self.walk.dest_facing == facing && self.walk.dest == adjusted {
                return;
            }
            (adjusted, found.unwrap_or(INVALID_BOX))
        };

        if self.pos == dest {
            if let Some(facing) = facing {
                if facing != self.facing {
                    self.turn_to(facing);
                }
            }
            return;
        }

        self.walk.dest = dest;
        self.walk.dest_box = dest_box;
        self.walk.dest_facing = facing;
        self.walk.point3 = None;
        self.walk.route_box = self.current_box;
        self.phase = WalkPhase::NewLeg;
    }

    /// Teleports the actor, dropping any walk in flight and re-deriving its
    /// box (and scale) from the new position.
    pub fn put_at(&mut self, room: &Room, p: Point) {
        self.walk = WalkData::default();
        self.phase = WalkPhase::Idle;
        if self.ignore_boxes {
            self.pos = p;
            self.current_box = INVALID_BOX;
        } else {
            let (adjusted, found) = room.adjust_point_to_box(p, self.is_player);
            self.pos = adjusted;
            let box_id = found.unwrap_or(INVALID_BOX);
            self.walk.dest_box = box_id;
            self.set_box(room, box_id);
        }
    }

    /// Turns in place toward `facing` degrees, cancelling any walk.
    pub fn turn_to(&mut self, facing: i32) {
        self.target_facing = facing;
        self.walk.leg = None;
        self.walk.point3 = None;
        self.phase = WalkPhase::Turning;
    }

    /// Freezes the actor where it stands.
    pub fn stop_moving(&mut self) {
        self.walk.leg = None;
        self.walk.point3 = None;
        self.phase = WalkPhase::Idle;
    }

    /// Moves the actor onto `box_id` and lets its variant re-derive scale.
    pub(crate) fn set_box(&mut self, room: &Room, box_id: BoxId) {
        self.current_box = box_id;
        self.refresh_scale(room);
    }

    /// Re-derives scale from the current box and position. Slot ramps change
    /// as the actor moves, so this runs every step, not just on box changes.
    pub(crate) fn refresh_scale(&mut self, room: &Room) {
        let variant = self.variant.clone();
        if let Some(scale) = variant.setup_scale(self, room) {
            self.scale = scale;
        }
    }
}
