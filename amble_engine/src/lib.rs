pub mod actor;
pub mod direction;
pub mod gate;
pub mod geometry;
pub mod room;
pub mod scene;
pub mod variant;
pub mod walk;

pub use actor::{Actor, WalkPhase};
pub use direction::DirectionMode;
pub use gate::{Gate, PathLeg, compute_gate, refine_path_leg};
pub use geometry::{BoxCoords, Point};
pub use room::{Room, RoomError};
pub use scene::{ActorHandle, Scene, WalkSample};
pub use variant::{EightDirWalker, FourDirWalker, WalkVariant};
pub use walk::advance_walk;
