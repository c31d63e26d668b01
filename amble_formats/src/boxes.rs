use std::io::Cursor;

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::matrix::MAX_BOXES;

/// Byte size of one walkbox record in the box block.
pub const BOX_RECORD_SIZE: usize = 20;
/// Byte size of one scale-slot record in the slot block.
pub const SCALE_SLOT_RECORD_SIZE: usize = 12;

const SCALE_SLOT_BIT: u16 = 0x8000;

/// Per-box flag byte. Bits combine; scripts usually write the whole byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoxFlags(pub u8);

impl BoxFlags {
    pub const NONE: BoxFlags = BoxFlags(0);
    /// Excluded from point-to-box adjustment and from connectivity rebuilds.
    pub const INVISIBLE: BoxFlags = BoxFlags(0x01);
    /// Mirrors walk headings horizontally while the actor stands in this box.
    pub const X_FLIP: BoxFlags = BoxFlags(0x08);
    /// Mirrors walk headings vertically while the actor stands in this box.
    pub const Y_FLIP: BoxFlags = BoxFlags(0x10);
    /// Actors keep their current scale inside this box.
    pub const IGNORE_SCALE: BoxFlags = BoxFlags(0x20);
    /// Only the player-controlled actor may enter.
    pub const PLAYER_ONLY: BoxFlags = BoxFlags(0x40);
    /// No actor may route through this box (player-only boxes exempt the player).
    pub const LOCKED: BoxFlags = BoxFlags(0x80);

    pub fn contains(self, other: BoxFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: BoxFlags) -> BoxFlags {
        BoxFlags(self.0 | other.0)
    }

    pub fn without(self, other: BoxFlags) -> BoxFlags {
        BoxFlags(self.0 & !other.0)
    }
}

/// Scale descriptor stored per box: a constant, or a reference into the room's
/// scale-slot table (raw form sets bit 15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxScale {
    Constant(u16),
    Slot(u16),
}

impl BoxScale {
    pub fn from_raw(raw: u16) -> BoxScale {
        if raw & SCALE_SLOT_BIT != 0 {
            BoxScale::Slot(raw & !SCALE_SLOT_BIT)
        } else {
            BoxScale::Constant(raw)
        }
    }

    pub fn to_raw(self) -> u16 {
        match self {
            BoxScale::Constant(value) => value & !SCALE_SLOT_BIT,
            BoxScale::Slot(slot) => SCALE_SLOT_BIT | (slot & !SCALE_SLOT_BIT),
        }
    }
}

impl Default for BoxScale {
    fn default() -> Self {
        BoxScale::Constant(255)
    }
}

/// Scale ramp between two calibration points. Actor scale at a position is
/// interpolated per axis and clamped to 1..=255 by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleSlot {
    pub x1: u16,
    pub y1: u16,
    pub scale1: u16,
    pub x2: u16,
    pub y2: u16,
    pub scale2: u16,
}

/// One convex walkbox as persisted in the box block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxDef {
    /// Corner order: upper-left, upper-right, lower-right, lower-left.
    pub corners: [[i16; 2]; 4],
    /// Depth/layer mask; equal masks mark boxes on the same visual plane.
    pub mask: u8,
    pub flags: BoxFlags,
    pub scale: BoxScale,
}

impl BoxDef {
    pub fn new(corners: [[i16; 2]; 4]) -> BoxDef {
        BoxDef {
            corners,
            mask: 0,
            flags: BoxFlags::NONE,
            scale: BoxScale::default(),
        }
    }
}

/// Parses a box block: `count:u16 LE` followed by `count` 20-byte records.
pub fn decode_box_block(bytes: &[u8]) -> Result<Vec<BoxDef>> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_u16::<LittleEndian>().context("reading box count")? as usize;
    ensure!(
        count <= MAX_BOXES,
        "box block declares {count} boxes, more than the {MAX_BOXES}-box limit"
    );
    let expected = 2 + count * BOX_RECORD_SIZE;
    ensure!(
        bytes.len() == expected,
        "box block is {} bytes, expected {expected} for {count} boxes",
        bytes.len()
    );

    let mut boxes = Vec::with_capacity(count);
    for index in 0..count {
        boxes.push(
            read_box_record(&mut cursor).with_context(|| format!("reading box record {index}"))?,
        );
    }
    Ok(boxes)
}

fn read_box_record(cursor: &mut Cursor<&[u8]>) -> Result<BoxDef> {
    let mut corners = [[0i16; 2]; 4];
    for corner in corners.iter_mut() {
        corner[0] = cursor.read_i16::<LittleEndian>()?;
        corner[1] = cursor.read_i16::<LittleEndian>()?;
    }
    let mask = cursor.read_u8()?;
    let flags = BoxFlags(cursor.read_u8()?);
    let scale = BoxScale::from_raw(cursor.read_u16::<LittleEndian>()?);
    Ok(BoxDef {
        corners,
        mask,
        flags,
        scale,
    })
}

/// Serializes a box block in the layout `decode_box_block` accepts.
pub fn encode_box_block(boxes: &[BoxDef]) -> Result<Vec<u8>> {
    ensure!(
        boxes.len() <= MAX_BOXES,
        "cannot encode {} boxes, the block caps at {MAX_BOXES}",
        boxes.len()
    );
    let mut bytes = Vec::with_capacity(2 + boxes.len() * BOX_RECORD_SIZE);
    bytes
        .write_u16::<LittleEndian>(boxes.len() as u16)
        .context("writing box count")?;
    for box_def in boxes {
        for corner in &box_def.corners {
            bytes.write_i16::<LittleEndian>(corner[0])?;
            bytes.write_i16::<LittleEndian>(corner[1])?;
        }
        bytes.write_u8(box_def.mask)?;
        bytes.write_u8(box_def.flags.0)?;
        bytes.write_u16::<LittleEndian>(box_def.scale.to_raw())?;
    }
    Ok(bytes)
}

/// Parses a scale-slot block: `count:u8` followed by `count` 12-byte records.
pub fn decode_scale_slot_block(bytes: &[u8]) -> Result<Vec<ScaleSlot>> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_u8().context("reading scale slot count")? as usize;
    let expected = 1 + count * SCALE_SLOT_RECORD_SIZE;
    ensure!(
        bytes.len() == expected,
        "scale slot block is {} bytes, expected {expected} for {count} slots",
        bytes.len()
    );

    let mut slots = Vec::with_capacity(count);
    for index in 0..count {
        slots.push(
            read_scale_slot(&mut cursor)
                .with_context(|| format!("reading scale slot {index}"))?,
        );
    }
    Ok(slots)
}

fn read_scale_slot(cursor: &mut Cursor<&[u8]>) -> Result<ScaleSlot> {
    Ok(ScaleSlot {
        x1: cursor.read_u16::<LittleEndian>()?,
        y1: cursor.read_u16::<LittleEndian>()?,
        scale1: cursor.read_u16::<LittleEndian>()?,
        x2: cursor.read_u16::<LittleEndian>()?,
        y2: cursor.read_u16::<LittleEndian>()?,
        scale2: cursor.read_u16::<LittleEndian>()?,
    })
}

/// Serializes a scale-slot block in the layout `decode_scale_slot_block` accepts.
pub fn encode_scale_slot_block(slots: &[ScaleSlot]) -> Result<Vec<u8>> {
    ensure!(
        slots.len() <= u8::MAX as usize,
        "cannot encode {} scale slots, the block caps at {}",
        slots.len(),
        u8::MAX
    );
    let mut bytes = Vec::with_capacity(1 + slots.len() * SCALE_SLOT_RECORD_SIZE);
    bytes.write_u8(slots.len() as u8).context("writing scale slot count")?;
    for slot in slots {
        bytes.write_u16::<LittleEndian>(slot.x1)?;
        bytes.write_u16::<LittleEndian>(slot.y1)?;
        bytes.write_u16::<LittleEndian>(slot.scale1)?;
        bytes.write_u16::<LittleEndian>(slot.x2)?;
        bytes.write_u16::<LittleEndian>(slot.y2)?;
        bytes.write_u16::<LittleEndian>(slot.scale2)?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_box() -> BoxDef {
        BoxDef {
            corners: [[50, 50], [250, 50], [250, 150], [50, 150]],
            mask: 2,
            flags: BoxFlags::LOCKED.with(BoxFlags::PLAYER_ONLY),
            scale: BoxScale::Slot(1),
        }
    }

    #[test]
    fn decodes_handwritten_box_block() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_le_bytes());
        for coord in [50i16, 50, 250, 50, 250, 150, 50, 150] {
            data.extend_from_slice(&coord.to_le_bytes());
        }
        data.push(2); // mask
        data.push(0xC0); // locked | player-only
        data.extend_from_slice(&0x8001u16.to_le_bytes()); // slot 1

        let boxes = decode_box_block(&data).unwrap();
        assert_eq!(boxes, vec![sample_box()]);
    }

    #[test]
    fn box_block_round_trips() {
        let mut second = BoxDef::new([[250, 50], [350, 50], [350, 150], [250, 150]]);
        second.flags = BoxFlags::X_FLIP;
        second.scale = BoxScale::Constant(180);
        let boxes = vec![sample_box(), second];

        let bytes = encode_box_block(&boxes).unwrap();
        assert_eq!(bytes.len(), 2 + 2 * BOX_RECORD_SIZE);
        assert_eq!(decode_box_block(&bytes).unwrap(), boxes);
    }

    #[test]
    fn rejects_truncated_box_block() {
        let bytes = encode_box_block(&[sample_box()]).unwrap();
        let err = decode_box_block(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(err.to_string().contains("expected"), "unexpected error: {err}");
    }

    #[test]
    fn scale_raw_form_tags_slots() {
        assert_eq!(BoxScale::from_raw(255), BoxScale::Constant(255));
        assert_eq!(BoxScale::from_raw(0x8003), BoxScale::Slot(3));
        assert_eq!(BoxScale::Slot(3).to_raw(), 0x8003);
        assert_eq!(BoxScale::Constant(180).to_raw(), 180);
    }

    #[test]
    fn flag_set_operations() {
        let flags = BoxFlags::LOCKED.with(BoxFlags::INVISIBLE);
        assert!(flags.contains(BoxFlags::LOCKED));
        assert!(flags.contains(BoxFlags::INVISIBLE));
        assert!(!flags.contains(BoxFlags::PLAYER_ONLY));
        assert_eq!(flags.without(BoxFlags::INVISIBLE), BoxFlags::LOCKED);
    }

    #[test]
    fn scale_slot_block_round_trips() {
        let slots = vec![
            ScaleSlot {
                x1: 0,
                y1: 60,
                scale1: 40,
                x2: 0,
                y2: 180,
                scale2: 255,
            },
            ScaleSlot {
                x1: 10,
                y1: 0,
                scale1: 90,
                x2: 600,
                y2: 0,
                scale2: 140,
            },
        ];
        let bytes = encode_scale_slot_block(&slots).unwrap();
        assert_eq!(bytes.len(), 1 + 2 * SCALE_SLOT_RECORD_SIZE);
        assert_eq!(decode_scale_slot_block(&bytes).unwrap(), slots);
    }

    #[test]
    fn rejects_oversized_slot_block_length() {
        let mut bytes = encode_scale_slot_block(&[]).unwrap();
        bytes.push(0);
        assert!(decode_scale_slot_block(&bytes).is_err());
    }
}
