use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Action, AgentId, Position,
    interaction::{self, InteractionEvent},
    map::{Grid, Terrain},
};

/// Errors raised while assembling a kitchen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KitchenError {
    #[error("Position {0} is out of bounds")]
    OutOfBounds(Position),
    #[error("Agent {id} must start on a floor cell, {position} is a station")]
    NotFloor { id: AgentId, position: Position },
    #[error("Position {0} is already occupied by an agent")]
    Occupied(Position),
    #[error("Agent ID {0} is already in use")]
    DuplicateAgent(AgentId),
    #[error("Objects can only rest on stations, {0} is floor")]
    NotAStation(Position),
    #[error("Station at {0} already holds an object")]
    StationFull(Position),
}

/// Static role of a cell, exposed as capabilities rather than identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Fixture {
    #[default]
    Floor,
    Counter,
    Cutboard,
    Delivery,
}

impl Fixture {
    pub fn is_floor(self) -> bool {
        self == Fixture::Floor
    }

    pub fn is_delivery(self) -> bool {
        self == Fixture::Delivery
    }

    pub fn is_cutting_surface(self) -> bool {
        self == Fixture::Cutboard
    }

    pub fn can_hold_item(self) -> bool {
        !self.is_floor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FoodKind {
    Tomato,
    Lettuce,
}

impl FoodKind {
    pub fn name(self) -> &'static str {
        match self {
            FoodKind::Tomato => "tomato",
            FoodKind::Lettuce => "lettuce",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    pub kind: FoodKind,
    pub chopped: bool,
}

/// Something that can be carried: an optional plate with foods on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub plate: bool,
    pub foods: Vec<Food>,
}

impl Object {
    pub fn food(kind: FoodKind) -> Self {
        Object {
            plate: false,
            foods: vec![Food {
                kind,
                chopped: false,
            }],
        }
    }

    pub fn plate() -> Self {
        Object {
            plate: true,
            foods: Vec::new(),
        }
    }

    /// Generic names of the contents, foods first.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.foods.iter().map(|f| f.kind.name().to_string()).collect();
        if self.plate {
            names.push("plate".to_string());
        }
        names
    }

    /// A single raw food lying on its own.
    pub fn needs_chopping(&self) -> bool {
        !self.plate && matches!(self.foods.as_slice(), [food] if !food.chopped)
    }

    pub fn chop(&mut self) {
        for food in &mut self.foods {
            food.chopped = true;
        }
    }

    pub fn is_deliverable(&self) -> bool {
        self.plate && !self.foods.is_empty() && self.foods.iter().all(|f| f.chopped)
    }

    pub fn mergeable(&self, other: &Object) -> bool {
        if self.plate && other.plate {
            return false;
        }
        let all_chopped = self.foods.iter().chain(&other.foods).all(|f| f.chopped);
        let overlapping = self
            .foods
            .iter()
            .any(|a| other.foods.iter().any(|b| a.kind == b.kind));
        all_chopped && !overlapping
    }

    pub fn merge(mut self, other: Object) -> Object {
        self.plate |= other.plate;
        self.foods.extend(other.foods);
        self
    }
}

/// A grid cell: its fixture and the object resting on it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Station {
    pub fixture: Fixture,
    pub object: Option<Object>,
}

impl Station {
    pub fn new(fixture: Fixture) -> Self {
        Station {
            fixture,
            object: None,
        }
    }
}

/// Physical state of an agent inside the kitchen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBody {
    pub id: AgentId,
    pub position: Position,
    pub holding: Option<Object>,
}

/// What one agent observed during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFeedback {
    pub location: Position,
    pub event: InteractionEvent,
}

pub type ActionMap = BTreeMap<AgentId, Action>;
pub type StepFeedback = BTreeMap<AgentId, AgentFeedback>;

/// The world the task executor drives.
pub trait Environment {
    /// Applies one tick of actions and reports what every agent observed.
    fn step(&mut self, actions: &ActionMap) -> StepFeedback;

    /// Pathing view of the world: floor is walkable, everything else is a wall.
    fn walkable_grid(&self) -> Grid<Terrain>;
}

/// Manages the kitchen simulation.
#[derive(Debug, Clone)]
pub struct Kitchen {
    stations: Grid<Station>,
    agents: BTreeMap<AgentId, AgentBody>,
    delivered: Vec<Object>,
    ticks: u64,
}

impl Kitchen {
    pub fn new(stations: Grid<Station>) -> Self {
        Kitchen {
            stations,
            agents: BTreeMap::new(),
            delivered: Vec::new(),
            ticks: 0,
        }
    }

    /// Adds an agent standing on a free floor cell.
    pub fn add_agent(&mut self, id: AgentId, position: Position) -> Result<(), KitchenError> {
        let station = self
            .stations
            .get(position)
            .ok_or(KitchenError::OutOfBounds(position))?;
        if !station.fixture.is_floor() {
            return Err(KitchenError::NotFloor { id, position });
        }
        if self.agent_at(position).is_some() {
            return Err(KitchenError::Occupied(position));
        }
        if self.agents.contains_key(&id) {
            return Err(KitchenError::DuplicateAgent(id));
        }
        self.agents.insert(
            id,
            AgentBody {
                id,
                position,
                holding: None,
            },
        );
        Ok(())
    }

    /// Places an object on an empty station.
    pub fn place_object(&mut self, position: Position, object: Object) -> Result<(), KitchenError> {
        let station = self
            .stations
            .get_mut(position)
            .ok_or(KitchenError::OutOfBounds(position))?;
        if !station.fixture.can_hold_item() {
            return Err(KitchenError::NotAStation(position));
        }
        if station.object.is_some() {
            return Err(KitchenError::StationFull(position));
        }
        station.object = Some(object);
        Ok(())
    }

    pub fn stations(&self) -> &Grid<Station> {
        &self.stations
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentBody> {
        self.agents.values()
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentBody> {
        self.agents.get(&id)
    }

    pub fn agent_at(&self, position: Position) -> Option<AgentId> {
        self.agents
            .values()
            .find(|body| body.position == position)
            .map(|body| body.id)
    }

    /// Objects handed in at the delivery point, oldest first.
    pub fn delivered(&self) -> &[Object] {
        &self.delivered
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Processes a single action for a given agent.
    fn process_action(&mut self, id: AgentId, action: Action) -> InteractionEvent {
        let Action::Move { dx, dy } = action else {
            return InteractionEvent::None;
        };
        let Some(current) = self.agents.get(&id).map(|body| body.position) else {
            tracing::warn!(agent = id, "action for unknown agent ignored");
            return InteractionEvent::None;
        };
        let Some(target) = current.offset(dx, dy).filter(|pos| self.stations.contains(*pos)) else {
            tracing::debug!(agent = id, %current, %action, "target outside the kitchen");
            return InteractionEvent::None;
        };
        let blocked = self.agent_at(target).is_some_and(|other| other != id);

        let (Some(body), Some(station)) = (self.agents.get_mut(&id), self.stations.get_mut(target))
        else {
            return InteractionEvent::None;
        };
        let event = interaction::resolve(body, target, station, blocked);

        if matches!(event, InteractionEvent::Delivered { .. }) {
            if let Some(object) = station.object.take() {
                tracing::info!(agent = id, items = ?object.names(), "delivered");
                self.delivered.push(object);
            }
        }
        event
    }
}

impl Environment for Kitchen {
    fn step(&mut self, actions: &ActionMap) -> StepFeedback {
        self.ticks += 1;
        let mut events: BTreeMap<AgentId, InteractionEvent> = BTreeMap::new();
        for (&id, &action) in actions {
            let event = self.process_action(id, action);
            tracing::debug!(tick = self.ticks, agent = id, %action, ?event, "resolved");
            events.insert(id, event);
        }
        self.agents
            .values()
            .map(|body| {
                let event = events.remove(&body.id).unwrap_or_default();
                (
                    body.id,
                    AgentFeedback {
                        location: body.position,
                        event,
                    },
                )
            })
            .collect()
    }

    fn walkable_grid(&self) -> Grid<Terrain> {
        self.stations.map(|station| {
            if station.fixture.is_floor() {
                Terrain::Floor
            } else {
                Terrain::Wall
            }
        })
    }
}
