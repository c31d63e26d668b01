pub mod boxes;
pub mod matrix;

pub use boxes::{
    BoxDef, BoxFlags, BoxScale, ScaleSlot, decode_box_block, decode_scale_slot_block,
    encode_box_block, encode_scale_slot_block,
};
pub use matrix::{BoxId, BoxMatrix, INVALID_BOX, MAX_BOXES, MatrixSpan, NextHopMatrix};
