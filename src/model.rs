use chrono::NaiveDateTime;
#[cfg(feature = "ssr")]
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::SquaresError;

pub const GRID_WIDTH: usize = 10;
pub const GRID_SIZE: usize = GRID_WIDTH * GRID_WIDTH;
pub const QUARTER_COUNT: usize = 4;
pub const MAX_SQUARES_PER_PLAYER: u32 = GRID_SIZE as u32;

pub const DEFAULT_TITLE: &str = "Monday Night Football Squares";
pub const DEFAULT_COLUMN_TEAM: &str = "Chiefs";
pub const DEFAULT_ROW_TEAM: &str = "Jaguars";

/// A roster entry. The name is kept as typed; it is trimmed when squares are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    #[serde(deserialize_with = "deserialize_squares")]
    pub squares: u32,
}

// Stored or submitted counts get the same 1..=100 clamp as typed ones.
fn deserialize_squares<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u32::deserialize(deserializer).map(|squares| squares.clamp(1, MAX_SQUARES_PER_PLAYER))
}

impl Participant {
    pub fn new(name: impl Into<String>, squares: u32) -> Self {
        Participant {
            name: name.into(),
            squares: squares.clamp(1, MAX_SQUARES_PER_PLAYER),
        }
    }

    /// Parses a square count typed into the roster editor. Anything unparseable becomes 1.
    pub fn parse_squares(input: &str) -> u32 {
        input
            .trim()
            .parse::<u32>()
            .unwrap_or(1)
            .clamp(1, MAX_SQUARES_PER_PLAYER)
    }

    /// The trimmed name, or None when the entry is still blank.
    pub fn display_name(&self) -> Option<&str> {
        let trimmed = self.name.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// The 10x10 board. Cell `i` sits at row `i / 10`, column `i % 10`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Option<String>>", into = "Vec<Option<String>>")]
pub struct Grid(Vec<Option<String>>);

impl Grid {
    pub fn empty() -> Self {
        Grid(vec![None; GRID_SIZE])
    }

    pub fn cells(&self) -> &[Option<String>] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|cell| cell.as_deref())
    }

    pub fn assigned_count(&self) -> usize {
        self.0.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn count_for(&self, name: &str) -> usize {
        self.0
            .iter()
            .filter(|cell| cell.as_deref() == Some(name))
            .count()
    }

    /// Distinct names on the board, in the order they first appear.
    pub fn unique_players(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for name in self.0.iter().flatten() {
            if !seen.iter().any(|s| s == name) {
                seen.push(name.clone());
            }
        }
        seen
    }

    pub fn is_empty(&self) -> bool {
        self.assigned_count() == 0
    }
}

impl Default for Grid {
    fn default() -> Self {
        Grid::empty()
    }
}

// Stored grids of the wrong length are padded with empty cells or truncated.
impl From<Vec<Option<String>>> for Grid {
    fn from(mut cells: Vec<Option<String>>) -> Self {
        cells.resize(GRID_SIZE, None);
        Grid(cells)
    }
}

impl From<Grid> for Vec<Option<String>> {
    fn from(grid: Grid) -> Self {
        grid.0
    }
}

/// Digits shown along one edge of the grid. Always a permutation of 0-9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Labels([u8; GRID_WIDTH]);

impl Labels {
    pub fn identity() -> Self {
        Labels([0, 1, 2, 3, 4, 5, 6, 7, 8, 9])
    }

    pub fn from_digits(digits: &[u8]) -> Result<Self, SquaresError> {
        if digits.len() != GRID_WIDTH {
            return Err(SquaresError::InvalidLabels);
        }
        let mut seen = [false; GRID_WIDTH];
        let mut out = [0u8; GRID_WIDTH];
        for (i, &digit) in digits.iter().enumerate() {
            let slot = seen
                .get_mut(digit as usize)
                .ok_or(SquaresError::InvalidLabels)?;
            if *slot {
                return Err(SquaresError::InvalidLabels);
            }
            *slot = true;
            out[i] = digit;
        }
        Ok(Labels(out))
    }

    pub fn digits(&self) -> &[u8; GRID_WIDTH] {
        &self.0
    }

    pub fn digit_at(&self, position: usize) -> Option<u8> {
        self.0.get(position).copied()
    }

    /// Position along the edge whose label is `digit`.
    pub fn position_of(&self, digit: u8) -> Option<usize> {
        self.0.iter().position(|&d| d == digit)
    }
}

impl Default for Labels {
    fn default() -> Self {
        Labels::identity()
    }
}

impl TryFrom<Vec<u8>> for Labels {
    type Error = SquaresError;

    fn try_from(digits: Vec<u8>) -> Result<Self, Self::Error> {
        Labels::from_digits(&digits)
    }
}

impl From<Labels> for Vec<u8> {
    fn from(labels: Labels) -> Self {
        labels.0.to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; QUARTER_COUNT] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn label(self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Both teams' score at the end of a quarter. Only counts once both sides are entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterScore {
    pub column: Option<u32>,
    pub row: Option<u32>,
}

impl QuarterScore {
    pub fn new(column: u32, row: u32) -> Self {
        QuarterScore {
            column: Some(column),
            row: Some(row),
        }
    }

    /// The (column, row) pair when both scores are present.
    pub fn pair(&self) -> Option<(u32, u32)> {
        Some((self.column?, self.row?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    /// Team whose score picks the column, shown across the top.
    pub column: String,
    /// Team whose score picks the row, shown down the side.
    pub row: String,
}

impl Default for Teams {
    fn default() -> Self {
        Teams {
            column: DEFAULT_COLUMN_TEAM.to_string(),
            row: DEFAULT_ROW_TEAM.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub quarter: Quarter,
    pub column_score: u32,
    pub row_score: u32,
    pub cell_index: usize,
    pub winner: Option<String>,
}

/// One square held by a player, as the digits a final score must end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSquare {
    pub column_digit: u8,
    pub row_digit: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// Season-long definition (title, teams, roster) that weeks are created from.
    Template,
    #[default]
    Week,
}

impl PoolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PoolKind::Template => "template",
            PoolKind::Week => "week",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "template" => Some(PoolKind::Template),
            "week" => Some(PoolKind::Week),
            _ => None,
        }
    }
}

/// Everything persisted for one pool. Missing fields in a stored record take these defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSnapshot {
    pub kind: PoolKind,
    pub title: String,
    pub teams: Teams,
    pub roster: Vec<Participant>,
    pub grid: Grid,
    pub row_labels: Labels,
    pub column_labels: Labels,
    pub quarters: [QuarterScore; QUARTER_COUNT],
    pub completed: bool,
}

impl Default for PoolSnapshot {
    fn default() -> Self {
        PoolSnapshot {
            kind: PoolKind::Week,
            title: DEFAULT_TITLE.to_string(),
            teams: Teams::default(),
            roster: Vec::new(),
            grid: Grid::empty(),
            row_labels: Labels::identity(),
            column_labels: Labels::identity(),
            quarters: [QuarterScore::default(); QUARTER_COUNT],
            completed: false,
        }
    }
}

impl PoolSnapshot {
    pub fn template() -> Self {
        PoolSnapshot {
            kind: PoolKind::Template,
            ..PoolSnapshot::default()
        }
    }

    /// A fresh weekly pool that keeps this pool's title, teams and roster.
    pub fn new_week(&self) -> Self {
        PoolSnapshot {
            kind: PoolKind::Week,
            title: self.title.clone(),
            teams: self.teams.clone(),
            roster: self.roster.clone(),
            ..PoolSnapshot::default()
        }
    }
}

/// Versioned wrapper around the stored JSON blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum PoolRecord {
    #[serde(rename = "1")]
    V1(PoolSnapshot),
}

impl PoolRecord {
    pub const CURRENT_VERSION: &'static str = "1";

    pub fn encode(snapshot: &PoolSnapshot) -> Result<String, serde_json::Error> {
        serde_json::to_string(&PoolRecord::V1(snapshot.clone()))
    }

    /// Decodes a stored blob. Blobs written before versioning carry no tag and are read as v1.
    pub fn decode(json: &str) -> Result<PoolSnapshot, serde_json::Error> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(object) = value.as_object_mut() {
            object
                .entry("version")
                .or_insert_with(|| serde_json::Value::from(Self::CURRENT_VERSION));
        }
        match serde_json::from_value(value)? {
            PoolRecord::V1(snapshot) => Ok(snapshot),
        }
    }
}

/// A row of the pool listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub key: String,
    pub kind: PoolKind,
    pub title: String,
    pub completed: bool,
    pub assigned: usize,
    pub updated_at: NaiveDateTime,
}

#[cfg(feature = "ssr")]
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::pools)]
pub struct PoolRow {
    pub week_key: String,
    pub kind: String,
    pub record: String,
    pub updated_at: NaiveDateTime,
}

#[cfg(feature = "ssr")]
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::pools)]
pub struct NewPoolRow<'a> {
    pub week_key: &'a str,
    pub kind: &'a str,
    pub record: &'a str,
    pub updated_at: NaiveDateTime,
}

#[cfg(feature = "ssr")]
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::admin_sessions)]
pub struct NewAdminSession {
    pub token: String,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_from_digits() {
        let labels = Labels::from_digits(&[3, 1, 4, 0, 5, 9, 2, 6, 8, 7]).expect("valid labels");
        assert_eq!(labels.position_of(3), Some(0));
        assert_eq!(labels.position_of(7), Some(9));
        assert_eq!(labels.digit_at(2), Some(4));
        assert_eq!(labels.digit_at(10), None);

        // Duplicates, out-of-range digits and wrong lengths are all rejected.
        assert_eq!(
            Labels::from_digits(&[0, 0, 2, 3, 4, 5, 6, 7, 8, 9]),
            Err(SquaresError::InvalidLabels)
        );
        assert_eq!(
            Labels::from_digits(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 10]),
            Err(SquaresError::InvalidLabels)
        );
        assert_eq!(
            Labels::from_digits(&[0, 1, 2]),
            Err(SquaresError::InvalidLabels)
        );
    }

    #[test]
    fn test_participant_parse_squares() {
        assert_eq!(Participant::parse_squares("5"), 5);
        assert_eq!(Participant::parse_squares(" 12 "), 12);
        assert_eq!(Participant::parse_squares(""), 1);
        assert_eq!(Participant::parse_squares("abc"), 1);
        assert_eq!(Participant::parse_squares("0"), 1);
        assert_eq!(Participant::parse_squares("250"), 100);
        assert_eq!(Participant::new("Alice", 0).squares, 1);
    }

    #[test]
    fn test_participant_deserialize_clamps_squares() {
        let zero: Participant =
            serde_json::from_str(r#"{"name": "Alice", "squares": 0}"#).expect("valid json");
        assert_eq!(zero.squares, 1);
        let huge: Participant =
            serde_json::from_str(r#"{"name": "Bob", "squares": 500}"#).expect("valid json");
        assert_eq!(huge.squares, MAX_SQUARES_PER_PLAYER);

        let snapshot = PoolRecord::decode(r#"{"roster": [{"name": "Cy", "squares": 0}]}"#)
            .expect("decode");
        assert_eq!(snapshot.roster, vec![Participant::new("Cy", 1)]);
    }

    #[test]
    fn test_participant_display_name() {
        assert_eq!(Participant::new("  Alice ", 1).display_name(), Some("Alice"));
        assert_eq!(Participant::new("   ", 1).display_name(), None);
    }

    #[test]
    fn test_grid_counts() {
        let mut cells = vec![None; GRID_SIZE];
        cells[4] = Some("Bob".to_string());
        cells[10] = Some("Alice".to_string());
        cells[42] = Some("Bob".to_string());
        let grid = Grid::from(cells);

        assert_eq!(grid.assigned_count(), 3);
        assert_eq!(grid.count_for("Bob"), 2);
        assert_eq!(grid.count_for("Carol"), 0);
        assert_eq!(grid.unique_players(), vec!["Bob".to_string(), "Alice".to_string()]);
        assert_eq!(grid.get(10), Some("Alice"));
        assert_eq!(grid.get(11), None);
        assert!(!grid.is_empty());
        assert!(Grid::empty().is_empty());
    }

    #[test]
    fn test_grid_from_wrong_length_is_normalized() {
        let short = Grid::from(vec![Some("Alice".to_string())]);
        assert_eq!(short.cells().len(), GRID_SIZE);
        assert_eq!(short.get(0), Some("Alice"));

        let long = Grid::from(vec![Some("Bob".to_string()); GRID_SIZE + 5]);
        assert_eq!(long.cells().len(), GRID_SIZE);
        assert_eq!(long.count_for("Bob"), GRID_SIZE);
    }

    #[test]
    fn test_quarter_score_pair() {
        assert_eq!(QuarterScore::new(13, 27).pair(), Some((13, 27)));
        let half = QuarterScore {
            column: Some(7),
            row: None,
        };
        assert_eq!(half.pair(), None);
        assert_eq!(QuarterScore::default().pair(), None);
    }

    #[test]
    fn test_pool_record_roundtrip_is_tagged() {
        let mut snapshot = PoolSnapshot::default();
        snapshot.roster.push(Participant::new("Alice", 2));
        snapshot.quarters[0] = QuarterScore::new(13, 27);

        let json = PoolRecord::encode(&snapshot).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["version"], "1");
        assert_eq!(value["kind"], "week");

        assert_eq!(PoolRecord::decode(&json).expect("decode"), snapshot);
    }

    #[test]
    fn test_pool_record_decode_untagged_with_defaults() {
        let json = r#"{"title": "Week 3", "grid": ["Alice", null], "roster": [{"name": "Alice", "squares": 1}]}"#;
        let snapshot = PoolRecord::decode(json).expect("decode legacy blob");

        assert_eq!(snapshot.title, "Week 3");
        assert_eq!(snapshot.kind, PoolKind::Week);
        assert_eq!(snapshot.teams, Teams::default());
        assert_eq!(snapshot.grid.cells().len(), GRID_SIZE);
        assert_eq!(snapshot.grid.get(0), Some("Alice"));
        assert_eq!(snapshot.row_labels, Labels::identity());
        assert_eq!(snapshot.column_labels, Labels::identity());
        assert!(snapshot.quarters.iter().all(|q| q.pair().is_none()));
        assert!(!snapshot.completed);
    }

    #[test]
    fn test_pool_record_decode_rejects_bad_labels_and_versions() {
        let bad_labels = r#"{"version": "1", "row_labels": [1, 1, 2, 3, 4, 5, 6, 7, 8, 9]}"#;
        assert!(PoolRecord::decode(bad_labels).is_err());

        let future = r#"{"version": "7"}"#;
        assert!(PoolRecord::decode(future).is_err());
    }

    #[test]
    fn test_new_week_from_template() {
        let mut template = PoolSnapshot::template();
        template.title = "Season 2024".to_string();
        template.roster = vec![Participant::new("Alice", 2), Participant::new("Bob", 3)];
        template.completed = true;

        let week = template.new_week();
        assert_eq!(week.kind, PoolKind::Week);
        assert_eq!(week.title, "Season 2024");
        assert_eq!(week.roster, template.roster);
        assert!(week.grid.is_empty());
        assert!(!week.completed);
    }

    #[test]
    fn test_pool_kind_parse() {
        assert_eq!(PoolKind::parse("template"), Some(PoolKind::Template));
        assert_eq!(PoolKind::parse(PoolKind::Week.as_str()), Some(PoolKind::Week));
        assert_eq!(PoolKind::parse("season"), None);
    }
}
