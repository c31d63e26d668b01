use std::fmt;

use amble_formats::BoxFlags;

use crate::actor::Actor;
use crate::direction::DirectionMode;
use crate::room::Room;

/// Per-sprite-set walk behavior, chosen when an actor is spawned. The walk
/// machine itself is shared; variants only decide how headings are derived
/// and where the sprite scale comes from.
pub trait WalkVariant {
    /// How many principal directions the sprite set can face.
    fn direction_mode(&self) -> DirectionMode;

    /// Whether leg headings come from atan2 or the coarse axis heuristic.
    fn atan_headings(&self) -> bool;

    /// Scale the actor should use after a box change, or `None` to keep the
    /// current value.
    fn setup_scale(&self, actor: &Actor, room: &Room) -> Option<u8>;
}

impl fmt::Debug for dyn WalkVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WalkVariant")
    }
}

/// Eight-direction sprite sets: smooth atan headings, scale driven by the
/// room's ramps.
#[derive(Debug, Default)]
pub struct EightDirWalker;

impl WalkVariant for EightDirWalker {
    fn direction_mode(&self) -> DirectionMode {
        DirectionMode::EightWay
    }

    fn atan_headings(&self) -> bool {
        true
    }

    fn setup_scale(&self, actor: &Actor, room: &Room) -> Option<u8> {
        box_driven_scale(actor, room)
    }
}

/// Legacy four-direction sprite sets: coarse axis headings, scale left to
/// whatever scripts set.
#[derive(Debug, Default)]
pub struct FourDirWalker;

impl WalkVariant for FourDirWalker {
    fn direction_mode(&self) -> DirectionMode {
        DirectionMode::FourWay
    }

    fn atan_headings(&self) -> bool {
        false
    }

    fn setup_scale(&self, _actor: &Actor, _room: &Room) -> Option<u8> {
        None
    }
}

fn box_driven_scale(actor: &Actor, room: &Room) -> Option<u8> {
    if actor.ignores_boxes() {
        return None;
    }
    let box_id = actor.current_box()?;
    let flags = room.flags(box_id).ok()?;
    if flags.contains(BoxFlags::IGNORE_SCALE) {
        return None;
    }
    match room.scale_at(box_id, actor.pos()) {
        Ok(scale) => Some(scale),
        Err(err) => {
            log::warn!("scale lookup failed in box {box_id}: {err}");
            None
        }
    }
}
