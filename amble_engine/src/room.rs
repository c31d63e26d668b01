use amble_formats::{
    BoxDef, BoxFlags, BoxId, BoxMatrix, BoxScale, INVALID_BOX, MAX_BOXES, NextHopMatrix, ScaleSlot,
};
use thiserror::Error;

use crate::geometry::{
    BoxCoords, Point, closest_pt_on_box, point_in_box, quick_reject_near_box,
};

/// Search thresholds for snapping a point into a box, widest last. Zero means
/// unbounded.
const ADJUST_THRESHOLDS: [i32; 3] = [30, 80, 0];
/// Edge candidates at or beyond this squared distance are never tracked.
const ADJUST_DIST_CAP: i64 = 0xFFFF;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("box {0} does not exist in this room")]
    BadBox(BoxId),
    #[error("scale slot {0} does not exist in this room")]
    BadScaleSlot(u16),
    #[error("scale slot {0} has coincident calibration points")]
    DegenerateScaleSlot(u16),
    #[error("room declares {0} boxes, more than the {MAX_BOXES} limit")]
    TooManyBoxes(usize),
    #[error("next-hop matrix covers {matrix} boxes but the room has {boxes}")]
    MatrixSizeMismatch { boxes: usize, matrix: usize },
}

#[derive(Debug, Clone)]
struct WalkBox {
    coords: BoxCoords,
    mask: u8,
    flags: BoxFlags,
    scale: BoxScale,
}

/// Static floor of one room: walkboxes, scale calibration and the compressed
/// routing table. Box ids are indices and never change; connectivity edits
/// go through flags plus an explicit matrix rebuild.
#[derive(Debug)]
pub struct Room {
    boxes: Vec<WalkBox>,
    scale_slots: Vec<ScaleSlot>,
    matrix: BoxMatrix,
    masks_must_match: bool,
}

impl Room {
    /// Builds a room from decoded box and scale-slot records. The routing
    /// table starts empty; install one with [`Room::rebuild_matrix`].
    pub fn new(boxes: Vec<BoxDef>, scale_slots: Vec<ScaleSlot>) -> Result<Room, RoomError> {
        if boxes.len() > MAX_BOXES {
            return Err(RoomError::TooManyBoxes(boxes.len()));
        }
        for def in &boxes {
            if let BoxScale::Slot(slot) = def.scale {
                if slot as usize >= scale_slots.len() {
                    return Err(RoomError::BadScaleSlot(slot));
                }
            }
        }
        let count = boxes.len();
        let boxes = boxes
            .into_iter()
            .map(|def| WalkBox {
                coords: BoxCoords::new([
                    [def.corners[0][0] as i32, def.corners[0][1] as i32],
                    [def.corners[1][0] as i32, def.corners[1][1] as i32],
                    [def.corners[2][0] as i32, def.corners[2][1] as i32],
                    [def.corners[3][0] as i32, def.corners[3][1] as i32],
                ]),
                mask: def.mask,
                flags: def.flags,
                scale: def.scale,
            })
            .collect();
        Ok(Room {
            boxes,
            scale_slots,
            matrix: BoxMatrix::empty(count),
            masks_must_match: false,
        })
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn coords(&self, id: BoxId) -> Result<BoxCoords, RoomError> {
        self.walk_box(id).map(|b| b.coords)
    }

    pub fn flags(&self, id: BoxId) -> Result<BoxFlags, RoomError> {
        self.walk_box(id).map(|b| b.flags)
    }

    pub fn mask(&self, id: BoxId) -> Result<u8, RoomError> {
        self.walk_box(id).map(|b| b.mask)
    }

    pub fn point_in_box(&self, id: BoxId, p: Point) -> Result<bool, RoomError> {
        self.walk_box(id).map(|b| point_in_box(&b.coords, p))
    }

    /// Turns strict depth-mask matching on. Rooms layered like a maze refuse
    /// direct final legs across differing masks.
    pub fn set_masks_must_match(&mut self, on: bool) {
        self.masks_must_match = on;
    }

    /// True when a direct final leg between the two boxes is permitted under
    /// the room's mask rule.
    pub fn masks_allow_direct(&self, a: BoxId, b: BoxId) -> bool {
        if !self.masks_must_match {
            return true;
        }
        match (self.mask(a), self.mask(b)) {
            (Ok(mask_a), Ok(mask_b)) => mask_a == mask_b,
            _ => false,
        }
    }

    pub fn set_box_flags(&mut self, id: BoxId, flags: BoxFlags) -> Result<(), RoomError> {
        self.walk_box_mut(id)?.flags = flags;
        Ok(())
    }

    /// Points a box at a new scale descriptor. Slot references are validated
    /// here so later lookups cannot dangle.
    pub fn set_box_scale(&mut self, id: BoxId, scale: BoxScale) -> Result<(), RoomError> {
        if let BoxScale::Slot(slot) = scale {
            if slot as usize >= self.scale_slots.len() {
                return Err(RoomError::BadScaleSlot(slot));
            }
        }
        self.walk_box_mut(id)?.scale = scale;
        Ok(())
    }

    /// Replaces the routing table from a freshly computed dense matrix.
    /// Walks already in flight keep following the old hops until their next
    /// routing decision.
    pub fn rebuild_matrix(&mut self, hops: &NextHopMatrix) -> Result<(), RoomError> {
        if hops.box_count() != self.boxes.len() {
            return Err(RoomError::MatrixSizeMismatch {
                boxes: self.boxes.len(),
                matrix: hops.box_count(),
            });
        }
        self.matrix = BoxMatrix::from_next_hops(hops);
        log::debug!(
            "rebuilt routing table: {} rows, {} bytes encoded",
            self.matrix.box_count(),
            self.matrix.encode().len()
        );
        Ok(())
    }

    /// Current routing table; encode it for save games.
    pub fn matrix(&self) -> &BoxMatrix {
        &self.matrix
    }

    /// Next hop from `from` toward `dest`, or `None` when no route exists.
    /// Same-box walks short-circuit and off-grid actors route straight at
    /// the destination.
    pub fn next_box(&self, from: BoxId, dest: BoxId) -> Option<BoxId> {
        if dest == INVALID_BOX {
            return None;
        }
        if from == INVALID_BOX || from == dest {
            return Some(dest);
        }
        if from as usize >= self.boxes.len() || dest as usize >= self.boxes.len() {
            return None;
        }
        self.matrix.next_hop(from, dest)
    }

    /// Snaps `p` into the best walkbox, widening the search threshold pass by
    /// pass. Returns the possibly moved point and the chosen box, or the
    /// original point and `None` when no box qualifies.
    pub fn adjust_point_to_box(&self, p: Point, is_player: bool) -> (Point, Option<BoxId>) {
        if self.boxes.is_empty() {
            return (p, None);
        }
        let mut adjusted = p;
        for threshold in ADJUST_THRESHOLDS {
            let mut best_dist = ADJUST_DIST_CAP;
            let mut best_box = None;
            for id in (0..self.boxes.len()).rev() {
                let walk_box = &self.boxes[id];

                // Invisible boxes are skipped, except that player-only ones
                // stay usable for everyone but the player.
                if walk_box.flags.contains(BoxFlags::INVISIBLE)
                    && !(walk_box.flags.contains(BoxFlags::PLAYER_ONLY) && !is_player)
                {
                    continue;
                }
                if threshold > 0 && quick_reject_near_box(&walk_box.coords, p, threshold) {
                    continue;
                }
                if point_in_box(&walk_box.coords, p) {
                    return (p, Some(id as BoxId));
                }

                let (dist, edge_point) = closest_pt_on_box(&walk_box.coords, p);
                if dist < best_dist {
                    adjusted = edge_point;
                    if dist == 0 {
                        return (adjusted, Some(id as BoxId));
                    }
                    best_dist = dist;
                    best_box = Some(id as BoxId);
                }
            }
            if threshold == 0 || (threshold as i64 * threshold as i64) >= best_dist {
                return (adjusted, best_box);
            }
        }
        (adjusted, None)
    }

    /// Sprite scale at `pos` inside the given box, clamped to 1..=255.
    pub fn scale_at(&self, id: BoxId, pos: Point) -> Result<u8, RoomError> {
        let raw = match self.walk_box(id)?.scale {
            BoxScale::Constant(value) => value as i32,
            BoxScale::Slot(slot) => self.scale_from_slot(slot, pos)?,
        };
        Ok(raw.clamp(1, 255) as u8)
    }

    fn scale_from_slot(&self, slot: u16, pos: Point) -> Result<i32, RoomError> {
        let s = self
            .scale_slots
            .get(slot as usize)
            .ok_or(RoomError::BadScaleSlot(slot))?;
        if s.x1 == s.x2 && s.y1 == s.y2 {
            return Err(RoomError::DegenerateScaleSlot(slot));
        }
        let (x1, y1, scale1) = (s.x1 as i32, s.y1 as i32, s.scale1 as i32);
        let (x2, y2, scale2) = (s.x2 as i32, s.y2 as i32, s.scale2 as i32);

        let mut scale_x = 0;
        let mut scale_y = 0;
        if y1 != y2 {
            let y = pos.y.max(0);
            scale_y = (scale2 - scale1) * (y - y1) / (y2 - y1) + scale1;
        }
        if x1 != x2 {
            scale_x = (scale2 - scale1) * (pos.x - x1) / (x2 - x1) + scale1;
        }

        Ok(if x1 == x2 {
            scale_y
        } else if y1 == y2 {
            scale_x
        } else {
            (scale_x + scale_y) / 2
        })
    }

    fn walk_box(&self, id: BoxId) -> Result<&WalkBox, RoomError> {
        self.boxes.get(id as usize).ok_or(RoomError::BadBox(id))
    }

    fn walk_box_mut(&mut self, id: BoxId) -> Result<&mut WalkBox, RoomError> {
        self.boxes.get_mut(id as usize).ok_or(RoomError::BadBox(id))
    }
}
