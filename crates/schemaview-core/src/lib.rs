use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

pub mod error;
pub mod settings;

pub use error::{ParseLayoutModeError, SettingsError};
pub use settings::{ForceSettings, GridSettings, HierarchicalSettings, LayoutSettings, SeedBounds};

/// Identifier of one entity in the schema. The layout engine treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1:N", alias = "one_to_many")]
    OneToMany,
    #[serde(rename = "N:1", alias = "many_to_one")]
    ManyToOne,
    #[serde(rename = "N:N", alias = "many_to_many")]
    ManyToMany,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneToMany => write!(f, "1:N"),
            Self::ManyToOne => write!(f, "N:1"),
            Self::ManyToMany => write!(f, "N:N"),
        }
    }
}

/// A typed relationship between two entities. Parallel relationships between
/// the same pair are allowed and each one counts on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: NodeId,
    pub to: NodeId,
    pub cardinality: Cardinality,
}

impl Relationship {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, cardinality: Cardinality) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            cardinality,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Node positions produced by one layout pass, keyed by node id.
///
/// Ordered by id so that serialized output and equality checks do not depend
/// on hashing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionMap(BTreeMap<NodeId, Position>);

impl PositionMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, id: NodeId, position: Position) -> Option<Position> {
        self.0.insert(id, position)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Position> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Position)> {
        self.0.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.0.keys()
    }
}

impl FromIterator<(NodeId, Position)> for PositionMap {
    fn from_iter<T: IntoIterator<Item = (NodeId, Position)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Index<&NodeId> for PositionMap {
    type Output = Position;

    fn index(&self, id: &NodeId) -> &Self::Output {
        &self.0[id]
    }
}

impl IntoIterator for PositionMap {
    type Item = (NodeId, Position);
    type IntoIter = std::collections::btree_map::IntoIter<NodeId, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PositionMap {
    type Item = (&'a NodeId, &'a Position);
    type IntoIter = std::collections::btree_map::Iter<'a, NodeId, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Which placement strategy owns node positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Force,
    Grid,
    Hierarchical,
    /// Positions are arranged by the user and never recomputed.
    Manual,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 4] = [
        LayoutMode::Force,
        LayoutMode::Grid,
        LayoutMode::Hierarchical,
        LayoutMode::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Force => "force",
            Self::Grid => "grid",
            Self::Hierarchical => "hierarchical",
            Self::Manual => "manual",
        }
    }

    pub fn is_automatic(&self) -> bool {
        !matches!(self, Self::Manual)
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = ParseLayoutModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "force" => Ok(Self::Force),
            "grid" => Ok(Self::Grid),
            "hierarchical" => Ok(Self::Hierarchical),
            "manual" => Ok(Self::Manual),
            _ => Err(ParseLayoutModeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_mode_round_trips_through_str() {
        for mode in LayoutMode::ALL {
            assert_eq!(mode.as_str().parse::<LayoutMode>().unwrap(), mode);
        }
        assert_eq!(" Grid ".parse::<LayoutMode>().unwrap(), LayoutMode::Grid);
        assert!("spiral".parse::<LayoutMode>().is_err());
    }

    #[test]
    fn test_cardinality_accepts_short_and_long_names() {
        let short: Relationship =
            serde_json::from_str(r#"{"from":"contact","to":"account","cardinality":"N:1"}"#)
                .unwrap();
        let long: Relationship = serde_json::from_str(
            r#"{"from":"contact","to":"account","cardinality":"many_to_one"}"#,
        )
        .unwrap();
        assert_eq!(short, long);
        assert_eq!(short.cardinality, Cardinality::ManyToOne);
        assert_eq!(
            serde_json::to_string(&Cardinality::OneToMany).unwrap(),
            "\"1:N\""
        );
    }

    #[test]
    fn test_position_map_serializes_as_plain_object() {
        let mut map = PositionMap::new();
        map.insert(NodeId::from("b"), Position::new(1.0, 2.0));
        map.insert(NodeId::from("a"), Position::new(3.0, 4.0));

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a":{"x":3.0,"y":4.0},"b":{"x":1.0,"y":2.0}}"#);

        let back: PositionMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
