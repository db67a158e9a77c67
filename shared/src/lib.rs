use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

pub const KEY_LEFT: u32 = 37;
pub const KEY_UP: u32 = 38;
pub const KEY_RIGHT: u32 = 39;
pub const KEY_DOWN: u32 = 40;

/// A grid cell address. Rows grow downwards, columns grow to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: i32,
    pub col: i32,
}

impl Coordinate {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Returns the neighbouring cell one step towards `direction`.
    pub fn step(self, direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::new(self.row - 1, self.col),
            Direction::Down => Self::new(self.row + 1, self.col),
            Direction::Left => Self::new(self.row, self.col - 1),
            Direction::Right => Self::new(self.row, self.col + 1),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Maps browser arrow-key codes (37..=40) to a direction.
    pub fn from_key_code(code: u32) -> Option<Self> {
        match code {
            KEY_LEFT => Some(Direction::Left),
            KEY_UP => Some(Direction::Up),
            KEY_RIGHT => Some(Direction::Right),
            KEY_DOWN => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn key_code(self) -> u32 {
        match self {
            Direction::Left => KEY_LEFT,
            Direction::Up => KEY_UP,
            Direction::Right => KEY_RIGHT,
            Direction::Down => KEY_DOWN,
        }
    }
}

/// Rendering hint attached to each group of coordinates in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellLabel {
    /// Cell holds at least one body segment
    Lime,
    /// Cell holds food
    Yellow,
    /// Cell became empty
    Black,
}

impl CellLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            CellLabel::Lime => "Lime",
            CellLabel::Yellow => "Yellow",
            CellLabel::Black => "Black",
        }
    }
}

impl fmt::Display for CellLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label plus a flat `col,row,col,row,...` point list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledGroup {
    pub label: CellLabel,
    pub points: String,
}

impl LabeledGroup {
    pub fn from_coordinates(label: CellLabel, coords: &[Coordinate]) -> Self {
        let points = coords
            .iter()
            .map(|c| format!("{},{}", c.col, c.row))
            .collect::<Vec<_>>()
            .join(",");
        Self { label, points }
    }

    /// Parses the point list back into coordinates, skipping a dangling value.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        let values: Vec<i32> = self
            .points
            .split(',')
            .filter_map(|v| v.trim().parse().ok())
            .collect();
        values
            .chunks_exact(2)
            .map(|pair| Coordinate::new(pair[1], pair[0]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.coordinates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A versioned description of changed cells, or of the whole grid when `full`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDiff {
    pub version: u64,
    pub timestamp: u64,
    pub full: bool,
    pub groups: Vec<LabeledGroup>,
}

impl VersionDiff {
    pub fn group(&self, label: CellLabel) -> Option<&LabeledGroup> {
        self.groups.iter().find(|g| g.label == label)
    }

    pub fn coordinates(&self, label: CellLabel) -> Vec<Coordinate> {
        self.group(label)
            .map(LabeledGroup::coordinates)
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        name: String,
    },
    Control {
        code: u32,
    },
    SnapshotRequest,
    HistoryRequest {
        versions: Vec<u64>,
    },
    Heartbeat {
        timestamp: u64,
    },
    Disconnect,

    Connected {
        client_id: u32,
    },
    Diff {
        diff: VersionDiff,
    },
    Snapshot {
        snapshot: VersionDiff,
    },
    History {
        diffs: Vec<VersionDiff>,
    },
    Disconnected {
        reason: String,
    },
}
