use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Walkbox index. Box ids double as routing-table row indices, so they stay
/// byte-sized; `0xFF` is reserved as the invalid-box sentinel.
pub type BoxId = u8;

/// "No box" marker. Also the row terminator in the encoded table, which is why
/// no real box may carry this id.
pub const INVALID_BOX: BoxId = 0xFF;

/// Closes each row in the encoded routing table.
pub const ROW_TERMINATOR: u8 = 0xFF;

/// Upper bound on boxes per room: ids 0..=254, with 0xFF reserved.
pub const MAX_BOXES: usize = 255;

/// Dense `box_count x box_count` next-hop matrix supplied by the routing
/// collaborator. Entry `[from, to]` is the next box on the shortest path from
/// `from` toward `to`, or `INVALID_BOX` when `to` is unreachable. Well-formed
/// input keeps `[i, i] == i` on the diagonal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextHopMatrix {
    box_count: usize,
    hops: Vec<BoxId>,
}

impl NextHopMatrix {
    /// Creates a matrix with every pair unreachable except the diagonal.
    /// `box_count` must not exceed [`MAX_BOXES`].
    pub fn new(box_count: usize) -> NextHopMatrix {
        debug_assert!(box_count <= MAX_BOXES);
        let mut hops = vec![INVALID_BOX; box_count * box_count];
        for id in 0..box_count {
            hops[id * box_count + id] = id as BoxId;
        }
        NextHopMatrix { box_count, hops }
    }

    /// Builds a matrix from explicit rows, e.g. deserialized room data.
    pub fn from_rows(rows: &[Vec<BoxId>]) -> Result<NextHopMatrix> {
        let box_count = rows.len();
        ensure!(
            box_count <= MAX_BOXES,
            "next-hop matrix has {box_count} rows, more than the {MAX_BOXES}-box limit"
        );
        let mut hops = Vec::with_capacity(box_count * box_count);
        for (index, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == box_count,
                "next-hop row {index} has {} columns, expected {box_count}",
                row.len()
            );
            hops.extend_from_slice(row);
        }
        Ok(NextHopMatrix { box_count, hops })
    }

    pub fn box_count(&self) -> usize {
        self.box_count
    }

    pub fn get(&self, from: usize, to: usize) -> BoxId {
        self.hops[from * self.box_count + to]
    }

    pub fn set(&mut self, from: usize, to: usize, via: BoxId) {
        self.hops[from * self.box_count + to] = via;
    }
}

/// One run-length triplet: destinations in `low..=high` route through `via`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatrixSpan {
    pub low: BoxId,
    pub high: BoxId,
    pub via: BoxId,
}

/// Compressed routing table: one span row per box, in ascending box-id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxMatrix {
    rows: Vec<Vec<MatrixSpan>>,
}

impl BoxMatrix {
    /// A table with the given number of rows and no reachable pairs.
    pub fn empty(box_count: usize) -> BoxMatrix {
        BoxMatrix {
            rows: vec![Vec::new(); box_count],
        }
    }

    /// Run-length encodes a dense next-hop matrix. Runs of consecutive
    /// destination columns merge while the next hop stays the same; an
    /// unreachable column ends the current run. Rebuilt in full on every call.
    pub fn from_next_hops(matrix: &NextHopMatrix) -> BoxMatrix {
        let box_count = matrix.box_count();
        let mut rows = Vec::with_capacity(box_count);
        for from in 0..box_count {
            let mut spans = Vec::new();
            let mut run: Option<(usize, BoxId)> = None;
            for to in 0..box_count {
                let via = matrix.get(from, to);
                if via == INVALID_BOX {
                    if let Some((first, run_via)) = run.take() {
                        spans.push(MatrixSpan {
                            low: first as BoxId,
                            high: (to - 1) as BoxId,
                            via: run_via,
                        });
                    }
                    continue;
                }
                match run {
                    Some((_, run_via)) if run_via == via => {}
                    Some((first, run_via)) => {
                        spans.push(MatrixSpan {
                            low: first as BoxId,
                            high: (to - 1) as BoxId,
                            via: run_via,
                        });
                        run = Some((to, via));
                    }
                    None => run = Some((to, via)),
                }
            }
            if let Some((first, run_via)) = run {
                spans.push(MatrixSpan {
                    low: first as BoxId,
                    high: (box_count - 1) as BoxId,
                    via: run_via,
                });
            }
            rows.push(spans);
        }
        BoxMatrix { rows }
    }

    pub fn box_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<MatrixSpan>] {
        &self.rows
    }

    /// Raw row scan: the via of the last span whose range covers `to`.
    /// Zero-hop and invalid-box handling live in the runtime, not here.
    pub fn next_hop(&self, from: BoxId, to: BoxId) -> Option<BoxId> {
        let row = self.rows.get(from as usize)?;
        let mut dest = None;
        for span in row {
            if span.low <= to && to <= span.high {
                dest = if span.via == INVALID_BOX {
                    None
                } else {
                    Some(span.via)
                };
            }
        }
        dest
    }

    /// Flat byte form: each row's triplets in ascending destination order,
    /// each row closed by [`ROW_TERMINATOR`]. Byte-identical output for a
    /// given input matrix; save games store this verbatim.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for row in &self.rows {
            for span in row {
                bytes.push(span.low);
                bytes.push(span.high);
                bytes.push(span.via);
            }
            bytes.push(ROW_TERMINATOR);
        }
        bytes
    }

    /// Parses the flat byte form back into spans. Row boundaries are
    /// positional, so the caller must know the box count.
    pub fn decode(bytes: &[u8], box_count: usize) -> Result<BoxMatrix> {
        ensure!(
            box_count <= MAX_BOXES,
            "box count {box_count} exceeds the {MAX_BOXES}-box limit"
        );
        let mut rows = Vec::with_capacity(box_count);
        let mut offset = 0usize;
        for row_index in 0..box_count {
            let mut spans = Vec::new();
            loop {
                ensure!(
                    offset < bytes.len(),
                    "routing table truncated in row {row_index} at byte {offset}"
                );
                if bytes[offset] == ROW_TERMINATOR {
                    offset += 1;
                    break;
                }
                ensure!(
                    offset + 3 <= bytes.len(),
                    "routing table truncated inside a triplet in row {row_index} at byte {offset}"
                );
                let span = MatrixSpan {
                    low: bytes[offset],
                    high: bytes[offset + 1],
                    via: bytes[offset + 2],
                };
                ensure!(
                    span.low <= span.high,
                    "row {row_index} span {}..{} is inverted",
                    span.low,
                    span.high
                );
                spans.push(span);
                offset += 3;
            }
            rows.push(spans);
        }
        ensure!(
            offset == bytes.len(),
            "routing table has {} trailing bytes after the last row",
            bytes.len() - offset
        );
        Ok(BoxMatrix { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 - 1 - 2 corridor: every hop goes through the middle box.
    fn corridor_hops() -> NextHopMatrix {
        NextHopMatrix::from_rows(&[vec![0, 1, 1], vec![0, 1, 2], vec![1, 1, 2]]).unwrap()
    }

    #[test]
    fn corridor_encodes_to_known_bytes() {
        let table = BoxMatrix::from_next_hops(&corridor_hops());
        assert_eq!(
            table.encode(),
            vec![
                0, 0, 0, 1, 2, 1, 0xFF, // row 0
                0, 0, 0, 1, 1, 1, 2, 2, 2, 0xFF, // row 1
                0, 1, 1, 2, 2, 2, 0xFF, // row 2
            ]
        );
    }

    #[test]
    fn identical_hops_collapse_to_one_span_per_row() {
        let hops =
            NextHopMatrix::from_rows(&[vec![2, 2, 2], vec![0, 0, 0], vec![1, 1, 1]]).unwrap();
        let table = BoxMatrix::from_next_hops(&hops);
        for row in table.rows() {
            assert_eq!(row.len(), 1);
            assert_eq!((row[0].low, row[0].high), (0, 2));
        }
    }

    #[test]
    fn unreachable_columns_split_runs() {
        let hops = NextHopMatrix::from_rows(&[
            vec![0, INVALID_BOX, 2],
            vec![INVALID_BOX, 1, INVALID_BOX],
            vec![0, INVALID_BOX, 2],
        ])
        .unwrap();
        let table = BoxMatrix::from_next_hops(&hops);
        assert_eq!(
            table.rows()[0],
            vec![
                MatrixSpan { low: 0, high: 0, via: 0 },
                MatrixSpan { low: 2, high: 2, via: 2 },
            ]
        );
        assert_eq!(table.next_hop(0, 1), None);
        assert_eq!(table.next_hop(1, 1), Some(1));
    }

    #[test]
    fn byte_form_round_trips() {
        let table = BoxMatrix::from_next_hops(&corridor_hops());
        let bytes = table.encode();
        let decoded = BoxMatrix::decode(&bytes, 3).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn lookups_reproduce_the_source_matrix() {
        let hops = corridor_hops();
        let table = BoxMatrix::from_next_hops(&hops);
        for from in 0..3 {
            for to in 0..3 {
                let expected = match hops.get(from, to) {
                    INVALID_BOX => None,
                    via => Some(via),
                };
                assert_eq!(table.next_hop(from as BoxId, to as BoxId), expected);
            }
        }
    }

    #[test]
    fn decode_rejects_truncated_table() {
        let mut bytes = BoxMatrix::from_next_hops(&corridor_hops()).encode();
        bytes.pop();
        let err = BoxMatrix::decode(&bytes, 3).unwrap_err();
        assert!(err.to_string().contains("truncated"), "unexpected error: {err}");
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = BoxMatrix::from_next_hops(&corridor_hops()).encode();
        bytes.push(0);
        let err = BoxMatrix::decode(&bytes, 3).unwrap_err();
        assert!(err.to_string().contains("trailing"), "unexpected error: {err}");
    }

    #[test]
    fn empty_rows_encode_as_bare_terminators() {
        let table = BoxMatrix::empty(2);
        assert_eq!(table.encode(), vec![0xFF, 0xFF]);
        assert_eq!(BoxMatrix::decode(&[0xFF, 0xFF], 2).unwrap(), table);
        assert_eq!(table.next_hop(0, 1), None);
    }
}
