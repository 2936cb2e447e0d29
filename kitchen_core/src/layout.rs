use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::{
    AgentId, Position,
    items::{DELIVERY_POINT, ItemLocations},
    kitchen::{Fixture, FoodKind, Kitchen, KitchenError, Object, Station},
    map::Grid,
};

/// Agents every level must place.
pub const AGENT_IDS: [AgentId; 2] = [1, 2];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Map string is empty")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{token}' at position ({x}, {y})")]
    UnknownToken { token: String, x: usize, y: usize },
    #[error("Item '{0}' is placed more than once")]
    DuplicateItem(String),
    #[error("Agent {0} has more than one start position")]
    DuplicateStart(AgentId),
    #[error("No start position for agent {0}")]
    MissingStart(AgentId),
    #[error(transparent)]
    Kitchen(#[from] KitchenError),
}

/// A loaded level: the world, the seeded item table and where the agents start.
#[derive(Debug, Clone)]
pub struct Level {
    pub kitchen: Kitchen,
    pub items: ItemLocations,
    pub starts: BTreeMap<AgentId, Position>,
}

struct Cell {
    fixture: Fixture,
    name: Option<String>,
    object: Option<Object>,
    agent: Option<AgentId>,
}

impl Cell {
    fn plain(fixture: Fixture) -> Self {
        Cell {
            fixture,
            name: None,
            object: None,
            agent: None,
        }
    }

    fn named(fixture: Fixture, name: String) -> Self {
        Cell {
            name: Some(name),
            ..Cell::plain(fixture)
        }
    }

    fn holding(name: String, object: Object) -> Self {
        Cell {
            object: Some(object),
            ..Cell::named(Fixture::Counter, name)
        }
    }
}

fn parse_token(token: &str) -> Option<Cell> {
    let cell = match token {
        ".." => Cell::plain(Fixture::Floor),
        "WL" => Cell::plain(Fixture::Counter),
        "DL" => Cell::named(Fixture::Delivery, DELIVERY_POINT.to_string()),
        "TM" => Cell::holding(FoodKind::Tomato.name().to_string(), Object::food(FoodKind::Tomato)),
        "LT" => Cell::holding(
            FoodKind::Lettuce.name().to_string(),
            Object::food(FoodKind::Lettuce),
        ),
        _ => {
            let mut chars = token.chars();
            let (Some(code), Some(digit), None) = (chars.next(), chars.next(), chars.next()) else {
                return None;
            };
            let index = digit.to_digit(10)?;
            match code {
                'C' => Cell::named(Fixture::Counter, format!("counter{index}")),
                'B' => Cell::named(Fixture::Cutboard, format!("cutboard{index}")),
                'P' => Cell::holding(format!("plate{index}"), Object::plate()),
                'A' => Cell {
                    agent: Some(index as AgentId),
                    ..Cell::plain(Fixture::Floor)
                },
                _ => return None,
            }
        }
    };
    Some(cell)
}

/// Loads a level from its text map.
///
/// Each line is one row of whitespace-separated two-character codes:
/// `..` floor, `WL` counter, `C<n>` named counter, `B<n>` cutboard,
/// `DL` delivery point, `TM` tomato, `LT` lettuce, `P<n>` plate and
/// `A<n>` the start of agent `n`. Lines starting with `#` are ignored.
pub fn load_level_from_string(map_string: &str) -> Result<Level, MapError> {
    let rows: Vec<Vec<&str>> = map_string
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split_whitespace().collect())
        .collect();
    let width = rows.first().map_or(0, Vec::len);
    if width == 0 {
        return Err(MapError::Empty);
    }
    let height = rows.len();

    let mut fixtures = Vec::with_capacity(width * height);
    let mut objects = Vec::new();
    let mut items = ItemLocations::new();
    let mut starts = BTreeMap::new();

    for (y, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(MapError::RaggedRow {
                row: y,
                expected: width,
                found: row.len(),
            });
        }
        for (x, token) in row.iter().enumerate() {
            let pos = Position { x, y };
            let cell = parse_token(token).ok_or_else(|| MapError::UnknownToken {
                token: token.to_string(),
                x,
                y,
            })?;
            fixtures.push(cell.fixture);
            if let Some(name) = cell.name {
                if items.contains(&name) {
                    return Err(MapError::DuplicateItem(name));
                }
                items.insert(name, pos);
            }
            if let Some(object) = cell.object {
                objects.push((pos, object));
            }
            if let Some(id) = cell.agent {
                if starts.insert(id, pos).is_some() {
                    return Err(MapError::DuplicateStart(id));
                }
            }
        }
    }

    let stations = Grid::from_generator(width, height, |pos| {
        Station::new(fixtures[pos.y * width + pos.x])
    });
    let mut kitchen = Kitchen::new(stations);
    for (pos, object) in objects {
        kitchen.place_object(pos, object)?;
    }
    for id in AGENT_IDS {
        let start = *starts.get(&id).ok_or(MapError::MissingStart(id))?;
        kitchen.add_agent(id, start)?;
    }

    Ok(Level {
        kitchen,
        items,
        starts,
    })
}

const OPEN_DIVIDER: &str = "
WL WL WL WL WL TM WL
B0 A1 .. C0 .. .. LT
B1 .. .. C1 .. .. WL
DL .. .. C2 .. A2 WL
WL .. .. C3 .. .. WL
WL .. .. .. .. .. P1
WL WL WL WL WL P0 WL
";

const FULL_DIVIDER: &str = "
WL WL WL WL WL TM WL
B0 A1 .. C0 .. .. LT
B1 .. .. C1 .. .. WL
DL .. .. C2 .. A2 WL
WL .. .. C3 .. .. WL
WL .. .. WL .. .. P1
WL WL WL WL WL P0 WL
";

const OPEN_DIVIDER_LARGE: &str = "
WL WL WL WL WL WL WL WL WL WL WL WL TM WL
B0 .. .. .. .. .. .. .. .. .. .. .. .. LT
B1 .. A1 .. .. .. .. .. .. .. .. .. .. WL
WL .. .. .. .. .. .. .. .. .. .. .. .. WL
WL .. .. .. .. .. .. .. .. .. .. .. .. WL
WL .. .. .. .. .. WL .. .. .. A2 .. .. WL
WL .. .. .. .. .. C0 .. .. .. .. .. .. WL
WL .. .. .. .. .. C1 .. .. .. .. .. .. WL
WL .. .. .. .. .. C2 .. .. .. .. .. .. WL
DL .. .. .. .. .. C3 .. .. .. .. .. .. P1
WL WL WL WL WL WL WL WL WL WL WL WL P0 WL
";

const PARTIAL_DIVIDER_LARGE: &str = "
WL WL WL WL WL WL WL WL WL WL WL WL TM WL
B0 .. .. WL .. .. .. .. .. WL .. .. .. LT
B1 .. .. WL A1 .. .. .. .. WL .. .. .. WL
WL .. .. WL .. .. .. .. .. WL .. .. .. WL
WL .. .. WL .. .. WL .. .. WL .. A2 .. WL
WL .. .. WL .. .. WL .. .. WL .. .. .. WL
WL .. .. WL .. .. C0 .. .. WL .. .. .. WL
WL .. .. .. .. .. C1 .. .. .. .. .. .. WL
WL .. .. .. .. .. C2 .. .. .. .. .. .. WL
DL .. .. .. .. .. C3 .. .. .. .. .. .. P1
WL WL WL WL WL WL WL WL WL WL WL WL P0 WL
";

/// Built-in kitchens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// 7x7, the divider counters leave a gap at the bottom.
    OpenDivider,
    /// 7x7, the divider runs wall to wall; items cross over the counters.
    FullDivider,
    /// 14x11, open room; a counter caps the divider so cooks reach counter0
    /// from opposite sides.
    OpenDividerLarge,
    PartialDividerLarge,
}

impl Layout {
    pub const ALL: [Layout; 4] = [
        Layout::OpenDivider,
        Layout::FullDivider,
        Layout::OpenDividerLarge,
        Layout::PartialDividerLarge,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Layout::OpenDivider => "open-divider",
            Layout::FullDivider => "full-divider",
            Layout::OpenDividerLarge => "open-divider-large",
            Layout::PartialDividerLarge => "partial-divider-large",
        }
    }

    pub fn map(self) -> &'static str {
        match self {
            Layout::OpenDivider => OPEN_DIVIDER,
            Layout::FullDivider => FULL_DIVIDER,
            Layout::OpenDividerLarge => OPEN_DIVIDER_LARGE,
            Layout::PartialDividerLarge => PARTIAL_DIVIDER_LARGE,
        }
    }

    /// Step budget that fits the built-in salad plan on this layout.
    pub fn default_max_steps(self) -> u64 {
        match self {
            Layout::OpenDivider | Layout::FullDivider => 100,
            Layout::OpenDividerLarge | Layout::PartialDividerLarge => 200,
        }
    }

    pub fn level(self) -> Result<Level, MapError> {
        load_level_from_string(self.map())
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown layout '{0}'")]
pub struct UnknownLayout(pub String);

impl FromStr for Layout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::ALL
            .into_iter()
            .find(|layout| layout.name() == s)
            .ok_or_else(|| UnknownLayout(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kitchen::Environment;

    #[test]
    fn small_layout_seeds_item_table() {
        let level = Layout::OpenDivider.level().unwrap();
        let expected = [
            ("tomato", (5, 0)),
            ("lettuce", (6, 1)),
            ("cutboard0", (0, 1)),
            ("cutboard1", (0, 2)),
            ("plate0", (5, 6)),
            ("plate1", (6, 5)),
            ("counter0", (3, 1)),
            ("counter1", (3, 2)),
            ("counter2", (3, 3)),
            ("counter3", (3, 4)),
            ("star", (0, 3)),
        ];
        assert_eq!(level.items.len(), expected.len());
        for (name, (x, y)) in expected {
            assert_eq!(level.items.position(name), Some(Position::new(x, y)), "{name}");
        }
        assert_eq!(level.starts[&1], Position::new(1, 1));
        assert_eq!(level.starts[&2], Position::new(5, 3));
    }

    #[test]
    fn large_layout_seeds_item_table() {
        let level = Layout::PartialDividerLarge.level().unwrap();
        let expected = [
            ("tomato", (12, 0)),
            ("lettuce", (13, 1)),
            ("cutboard0", (0, 1)),
            ("cutboard1", (0, 2)),
            ("plate0", (12, 10)),
            ("plate1", (13, 9)),
            ("counter0", (6, 6)),
            ("counter1", (6, 7)),
            ("counter2", (6, 8)),
            ("counter3", (6, 9)),
            ("star", (0, 9)),
        ];
        for (name, (x, y)) in expected {
            assert_eq!(level.items.position(name), Some(Position::new(x, y)), "{name}");
        }
        let grid = level.kitchen.walkable_grid();
        assert_eq!((grid.width(), grid.height()), (14, 11));
        assert!(!grid.is_walkable(Position::new(6, 4)));
        assert!(grid.is_walkable(Position::new(3, 7)));
    }

    #[test]
    fn every_builtin_layout_loads() {
        for layout in Layout::ALL {
            let level = layout.level().unwrap_or_else(|e| panic!("{layout}: {e}"));
            assert_eq!(level.kitchen.agents().count(), 2);
            assert_eq!(layout.name().parse::<Layout>(), Ok(layout));
        }
        assert!("kitchen-nightmare".parse::<Layout>().is_err());
    }

    #[test]
    fn stations_carry_objects() {
        let level = Layout::OpenDivider.level().unwrap();
        let stations = level.kitchen.stations();
        assert_eq!(
            stations[Position::new(6, 1)].object,
            Some(Object::food(FoodKind::Lettuce))
        );
        assert_eq!(stations[Position::new(5, 6)].object, Some(Object::plate()));
        assert!(stations[Position::new(0, 1)].fixture.is_cutting_surface());
        assert!(stations[Position::new(0, 3)].fixture.is_delivery());
        assert!(stations[Position::new(3, 2)].object.is_none());
    }

    #[test]
    fn map_errors_are_reported() {
        assert_eq!(
            load_level_from_string("# nothing\n").unwrap_err(),
            MapError::Empty
        );
        assert_eq!(
            load_level_from_string("A1 A2\n..").unwrap_err(),
            MapError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            load_level_from_string("A1 A2 ZZ").unwrap_err(),
            MapError::UnknownToken {
                token: "ZZ".to_string(),
                x: 2,
                y: 0
            }
        );
        assert_eq!(
            load_level_from_string("A1 A2 B0 B0").unwrap_err(),
            MapError::DuplicateItem("cutboard0".to_string())
        );
        assert_eq!(
            load_level_from_string("A1 .. A1").unwrap_err(),
            MapError::DuplicateStart(1)
        );
        assert_eq!(
            load_level_from_string("A1 .. WL").unwrap_err(),
            MapError::MissingStart(2)
        );
    }
}
