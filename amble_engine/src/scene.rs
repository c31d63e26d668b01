//! Scene host: owns one room and the actors walking in it, advances them in
//! lockstep, and records an ordered event log for the embedding layer.

use std::collections::BTreeMap;
use std::rc::Rc;

use amble_formats::{BoxFlags, BoxId, BoxScale, NextHopMatrix};
use serde::Serialize;

use crate::actor::Actor;
use crate::geometry::{Point, chebyshev_dist};
use crate::room::{Room, RoomError};
use crate::variant::WalkVariant;
use crate::walk::advance_walk;

/// Opaque actor handle, stable for the scene's lifetime.
pub type ActorHandle = u32;

/// Snapshot of one actor at a tick, shaped for JSON walk logs.
#[derive(Debug, Clone, Serialize)]
pub struct WalkSample {
    pub tick: u64,
    pub label: String,
    pub position: [i32; 2],
    pub facing: i32,
    pub moving: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_id: Option<BoxId>,
}

#[derive(Debug)]
pub struct Scene {
    room: Room,
    actors: BTreeMap<ActorHandle, Actor>,
    labels: BTreeMap<String, ActorHandle>,
    player: Option<ActorHandle>,
    next_handle: ActorHandle,
    events: Vec<String>,
    tick: u64,
}

impl Scene {
    pub fn new(room: Room) -> Scene {
        Scene {
            room,
            actors: BTreeMap::new(),
            labels: BTreeMap::new(),
            player: None,
            next_handle: 1,
            events: Vec::new(),
            tick: 0,
        }
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Everything that happened since the scene was created, in order.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn actor(&self, handle: ActorHandle) -> Option<&Actor> {
        self.actors.get(&handle)
    }

    pub fn actor_by_label(&self, label: &str) -> Option<&Actor> {
        self.actors.get(self.labels.get(label)?)
    }

    pub fn player_handle(&self) -> Option<ActorHandle> {
        self.player
    }

    /// Adds an actor at the grid origin; it stays off the walkbox grid until
    /// the first `put_actor`. Re-using a label rebinds it to the new actor.
    pub fn spawn_actor(
        &mut self,
        label: impl Into<String>,
        variant: Rc<dyn WalkVariant>,
    ) -> ActorHandle {
        let label = label.into();
        let handle = self.next_handle;
        self.next_handle += 1;
        self.events.push(format!("actor.spawn {label} #{handle}"));
        self.labels.insert(label.clone(), handle);
        self.actors.insert(handle, Actor::new(label, variant));
        handle
    }

    /// Marks one actor as player-controlled; box rules treat it specially.
    pub fn select_player(&mut self, handle: ActorHandle) -> bool {
        if !self.actors.contains_key(&handle) {
            self.events.push(format!("scene.unknown_actor #{handle}"));
            return false;
        }
        if let Some(previous) = self.player.take() {
            if let Some(actor) = self.actors.get_mut(&previous) {
                actor.is_player = false;
            }
        }
        let Some(actor) = self.actors.get_mut(&handle) else {
            return false;
        };
        actor.is_player = true;
        self.player = Some(handle);
        self.events
            .push(format!("actor.select {} #{handle}", actor.label()));
        true
    }

    pub fn start_walk(&mut self, handle: ActorHandle, dest: Point, facing: Option<i32>) -> bool {
        let Some(actor) = self.actors.get_mut(&handle) else {
            self.events.push(format!("scene.unknown_actor #{handle}"));
            return false;
        };
        actor.start_walk(&self.room, dest, facing);
        true
    }

    pub fn put_actor(&mut self, handle: ActorHandle, p: Point) -> bool {
        let Some(actor) = self.actors.get_mut(&handle) else {
            self.events.push(format!("scene.unknown_actor #{handle}"));
            return false;
        };
        actor.put_at(&self.room, p);
        self.events.push(format!(
            "actor.put {} {},{}",
            actor.label(),
            actor.pos().x,
            actor.pos().y
        ));
        true
    }

    pub fn stop_actor(&mut self, handle: ActorHandle) -> bool {
        let Some(actor) = self.actors.get_mut(&handle) else {
            self.events.push(format!("scene.unknown_actor #{handle}"));
            return false;
        };
        actor.stop_moving();
        true
    }

    pub fn turn_actor(&mut self, handle: ActorHandle, facing: i32) -> bool {
        let Some(actor) = self.actors.get_mut(&handle) else {
            self.events.push(format!("scene.unknown_actor #{handle}"));
            return false;
        };
        actor.turn_to(facing);
        true
    }

    pub fn set_walk_speed(&mut self, handle: ActorHandle, x: i32, y: i32) -> bool {
        let Some(actor) = self.actors.get_mut(&handle) else {
            self.events.push(format!("scene.unknown_actor #{handle}"));
            return false;
        };
        actor.set_walk_speed(x, y);
        true
    }

    pub fn set_ignore_boxes(&mut self, handle: ActorHandle, on: bool) -> bool {
        let Some(actor) = self.actors.get_mut(&handle) else {
            self.events.push(format!("scene.unknown_actor #{handle}"));
            return false;
        };
        actor.set_ignore_boxes(&self.room, on);
        true
    }

    /// Changes a box's flags mid-scene. Walks in flight pick the change up on
    /// their next routing step.
    pub fn set_box_flags(&mut self, id: BoxId, flags: BoxFlags) -> Result<(), RoomError> {
        self.room.set_box_flags(id, flags)?;
        self.events.push(format!("box.flags {id} {:#04x}", flags.0));
        self.refresh_scales();
        Ok(())
    }

    pub fn set_box_scale(&mut self, id: BoxId, scale: BoxScale) -> Result<(), RoomError> {
        self.room.set_box_scale(id, scale)?;
        match scale {
            BoxScale::Constant(value) => {
                self.events.push(format!("box.scale {id} const {value}"))
            }
            BoxScale::Slot(slot) => self.events.push(format!("box.scale {id} slot {slot}")),
        }
        self.refresh_scales();
        Ok(())
    }

    /// Scale derives from room state, so standing actors must not keep a
    /// stale value after the room changes under them.
    fn refresh_scales(&mut self) {
        for actor in self.actors.values_mut() {
            actor.refresh_scale(&self.room);
        }
    }

    pub fn set_masks_must_match(&mut self, on: bool) {
        self.room.set_masks_must_match(on);
        self.events.push(format!("room.masks {on}"));
    }

    /// Installs a freshly computed next-hop table, replacing the compressed
    /// routing rows wholesale.
    pub fn rebuild_matrix(&mut self, hops: &NextHopMatrix) -> Result<(), RoomError> {
        self.room.rebuild_matrix(hops)?;
        self.events
            .push(format!("matrix.rebuild {} boxes", hops.box_count()));
        Ok(())
    }

    /// Runs one tick of the walk machine for every actor, in handle order.
    pub fn advance_all(&mut self) {
        self.tick += 1;
        for actor in self.actors.values_mut() {
            advance_walk(actor, &self.room, &mut self.events);
        }
    }

    pub fn any_moving(&self) -> bool {
        self.actors.values().any(|actor| actor.is_moving())
    }

    /// First actor (lowest handle) within `radius` of `p`, by Chebyshev
    /// distance.
    pub fn actor_near_point(&self, p: Point, radius: i32) -> Option<ActorHandle> {
        self.actors
            .iter()
            .find(|(_, actor)| chebyshev_dist(actor.pos(), p) <= radius)
            .map(|(handle, _)| *handle)
    }

    pub fn sample(&self, handle: ActorHandle) -> Option<WalkSample> {
        let actor = self.actors.get(&handle)?;
        Some(WalkSample {
            tick: self.tick,
            label: actor.label().to_string(),
            position: [actor.pos().x, actor.pos().y],
            facing: actor.facing(),
            moving: actor.is_moving(),
            box_id: actor.current_box(),
        })
    }

    /// Snapshot of every actor, in handle order.
    pub fn samples(&self) -> Vec<WalkSample> {
        self.actors
            .keys()
            .filter_map(|handle| self.sample(*handle))
            .collect()
    }
}
