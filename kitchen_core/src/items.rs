use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Position;

/// Name under which the delivery point is registered.
pub const DELIVERY_POINT: &str = "star";

/// What a named entry in the item table refers to, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Ingredient,
    Plate,
    Counter,
    CuttingSurface,
    Delivery,
}

impl ItemKind {
    pub fn of(name: &str) -> ItemKind {
        if name == DELIVERY_POINT {
            ItemKind::Delivery
        } else if name.starts_with("cutboard") {
            ItemKind::CuttingSurface
        } else if name.starts_with("counter") {
            ItemKind::Counter
        } else if name.starts_with("plate") {
            ItemKind::Plate
        } else {
            ItemKind::Ingredient
        }
    }

    /// Movable entries can be held by an agent; the rest are fixtures.
    pub fn is_movable(self) -> bool {
        matches!(self, ItemKind::Ingredient | ItemKind::Plate)
    }
}

/// Progress of an item towards being sliced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    #[default]
    Unplaced,
    /// Put down on the named fixture or plate.
    PlacedOn(String),
    /// Sliced on the named cutting board; kept wherever the item goes next.
    SlicedOn(String),
}

impl ItemStatus {
    pub fn is_sliced(&self) -> bool {
        matches!(self, ItemStatus::SlicedOn(_))
    }
}

static UNPLACED: ItemStatus = ItemStatus::Unplaced;

/// Known locations of named kitchen items, shared by both agents.
///
/// Seeded from the level, then updated as agents pick items up and put them
/// down. An item held by an agent has no entry here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLocations {
    positions: BTreeMap<String, Position>,
    status: BTreeMap<String, ItemStatus>,
}

impl ItemLocations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, position: Position) {
        self.positions.insert(name.into(), position);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<Position> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Position)> {
        self.positions.iter().map(|(name, pos)| (name.as_str(), *pos))
    }

    /// Names of every entry located at `position`.
    pub fn names_at(&self, position: Position) -> Vec<&str> {
        self.iter()
            .filter(|(_, pos)| *pos == position)
            .map(|(name, _)| name)
            .collect()
    }

    /// Names of the movable entries located at `position`.
    pub fn movables_at(&self, position: Position) -> Vec<String> {
        self.names_at(position)
            .into_iter()
            .filter(|name| ItemKind::of(name).is_movable())
            .map(str::to_string)
            .collect()
    }

    /// The surface an item put down at `position` rests on: a fixture, or else a plate.
    pub fn surface_at(&self, position: Position) -> Option<&str> {
        let names = self.names_at(position);
        names
            .iter()
            .find(|name| !ItemKind::of(name).is_movable())
            .or_else(|| names.iter().find(|name| ItemKind::of(name) == ItemKind::Plate))
            .copied()
    }

    /// Removes an entry, returning where it was.
    pub fn take(&mut self, name: &str) -> Option<Position> {
        self.positions.remove(name)
    }

    pub fn status(&self, name: &str) -> &ItemStatus {
        self.status.get(name).unwrap_or(&UNPLACED)
    }

    /// Records that `name` was put down on `surface`. A sliced item stays sliced.
    pub fn mark_placed(&mut self, name: &str, surface: &str) {
        let status = self.status.entry(name.to_string()).or_default();
        if !status.is_sliced() {
            *status = ItemStatus::PlacedOn(surface.to_string());
        }
    }

    pub fn mark_sliced(&mut self, name: &str, board: &str) {
        self.status
            .insert(name.to_string(), ItemStatus::SlicedOn(board.to_string()));
    }
}

impl<S: Into<String>> FromIterator<(S, Position)> for ItemLocations {
    fn from_iter<I: IntoIterator<Item = (S, Position)>>(iter: I) -> Self {
        let mut table = ItemLocations::new();
        for (name, position) in iter {
            table.insert(name, position);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> ItemLocations {
        [
            ("lettuce", Position::new(6, 1)),
            ("counter0", Position::new(3, 1)),
            ("cutboard0", Position::new(0, 1)),
            ("plate0", Position::new(5, 6)),
            ("star", Position::new(0, 3)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn kinds_follow_names() {
        assert_eq!(ItemKind::of("cutboard1"), ItemKind::CuttingSurface);
        assert_eq!(ItemKind::of("counter3"), ItemKind::Counter);
        assert_eq!(ItemKind::of("plate0"), ItemKind::Plate);
        assert_eq!(ItemKind::of("star"), ItemKind::Delivery);
        assert_eq!(ItemKind::of("tomato"), ItemKind::Ingredient);
        assert!(ItemKind::of("plate1").is_movable());
        assert!(!ItemKind::of("counter0").is_movable());
    }

    #[test]
    fn names_at_lists_co_located_entries() {
        let mut table = small_table();
        table.insert("tomato", Position::new(3, 1));
        assert_eq!(table.names_at(Position::new(3, 1)), vec!["counter0", "tomato"]);
        assert_eq!(table.movables_at(Position::new(3, 1)), vec!["tomato".to_string()]);
        assert_eq!(table.surface_at(Position::new(3, 1)), Some("counter0"));
        assert!(table.names_at(Position::new(2, 2)).is_empty());
    }

    #[test]
    fn surface_falls_back_to_plate() {
        let mut table = small_table();
        table.insert("lettuce", Position::new(5, 6));
        assert_eq!(table.surface_at(Position::new(5, 6)), Some("plate0"));
    }

    #[test]
    fn take_removes_entry() {
        let mut table = small_table();
        assert_eq!(table.take("lettuce"), Some(Position::new(6, 1)));
        assert!(!table.contains("lettuce"));
        assert_eq!(table.take("lettuce"), None);
    }

    #[test]
    fn sliced_status_is_sticky() {
        let mut table = small_table();
        assert_eq!(table.status("lettuce"), &ItemStatus::Unplaced);
        table.mark_placed("lettuce", "cutboard0");
        assert_eq!(
            table.status("lettuce"),
            &ItemStatus::PlacedOn("cutboard0".to_string())
        );
        table.mark_sliced("lettuce", "cutboard0");
        table.take("lettuce");
        table.mark_placed("lettuce", "plate0");
        assert_eq!(
            table.status("lettuce"),
            &ItemStatus::SlicedOn("cutboard0".to_string())
        );
        assert!(table.status("lettuce").is_sliced());
    }
}
