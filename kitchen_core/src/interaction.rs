//! Resolution of a single agent action against the cell in front of it.
//!
//! Exactly one effect fires per call. Objects change hands with
//! [`Option::take`] inside one `&mut` borrow, so no observer can see an object
//! owned by both the agent and a station.

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    kitchen::{AgentBody, Object, Station},
};

/// Outcome of one agent's action during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionEvent {
    #[default]
    None,
    Moved { to: Position },
    PickedUp { items: Vec<String>, at: Position },
    PutDown { items: Vec<String>, at: Position },
    Merged { items: Vec<String>, at: Position },
    Sliced { items: Vec<String>, at: Position },
    Delivered { items: Vec<String>, at: Position },
}

impl InteractionEvent {
    /// Cell the action was applied to, `None` if nothing happened.
    pub fn location(&self) -> Option<Position> {
        match self {
            InteractionEvent::None => None,
            InteractionEvent::Moved { to } => Some(*to),
            InteractionEvent::PickedUp { at, .. }
            | InteractionEvent::PutDown { at, .. }
            | InteractionEvent::Merged { at, .. }
            | InteractionEvent::Sliced { at, .. }
            | InteractionEvent::Delivered { at, .. } => Some(*at),
        }
    }

    pub fn items(&self) -> &[String] {
        match self {
            InteractionEvent::None | InteractionEvent::Moved { .. } => &[],
            InteractionEvent::PickedUp { items, .. }
            | InteractionEvent::PutDown { items, .. }
            | InteractionEvent::Merged { items, .. }
            | InteractionEvent::Sliced { items, .. }
            | InteractionEvent::Delivered { items, .. } => items,
        }
    }

    /// Short text form. The leading verb is stable and is what history entries start with.
    pub fn description(&self) -> Option<String> {
        let items = self.items().join(", ");
        let text = match self {
            InteractionEvent::None => return None,
            InteractionEvent::Moved { .. } => "moved to".to_string(),
            InteractionEvent::PickedUp { .. } => format!("picked up {items}"),
            InteractionEvent::PutDown { .. } => format!("put {items} onto"),
            InteractionEvent::Merged { .. } => format!("merged {items} with"),
            InteractionEvent::Sliced { .. } => format!("sliced {items} on"),
            InteractionEvent::Delivered { .. } => format!("delivered {items} at"),
        };
        Some(text)
    }
}

/// Applies `body`'s action aimed at `target`, whose station is `station`.
///
/// `blocked` is true when another agent stands on `target`.
pub fn resolve(
    body: &mut AgentBody,
    target: Position,
    station: &mut Station,
    blocked: bool,
) -> InteractionEvent {
    if station.fixture.is_floor() {
        if blocked {
            tracing::warn!(agent = body.id, %target, "move blocked by another agent");
            return InteractionEvent::None;
        }
        body.position = target;
        return InteractionEvent::Moved { to: target };
    }

    match body.holding.take() {
        Some(held) => release(held, &mut body.holding, target, station),
        None => acquire(&mut body.holding, target, station),
    }
}

/// Hand is full: deliver, merge, or put down.
fn release(
    held: Object,
    holding: &mut Option<Object>,
    at: Position,
    station: &mut Station,
) -> InteractionEvent {
    if station.fixture.is_delivery() {
        if !held.is_deliverable() {
            *holding = Some(held);
            return InteractionEvent::None;
        }
        let items = held.names();
        station.object = Some(held);
        return InteractionEvent::Delivered { items, at };
    }

    match station.object.take() {
        Some(resting) if resting.mergeable(&held) => {
            let items = held.names();
            station.object = Some(resting.merge(held));
            InteractionEvent::Merged { items, at }
        }
        Some(resting) => {
            station.object = Some(resting);
            *holding = Some(held);
            InteractionEvent::None
        }
        None => {
            let items = held.names();
            station.object = Some(held);
            InteractionEvent::PutDown { items, at }
        }
    }
}

/// Hand is empty: slice in place or pick up.
fn acquire(holding: &mut Option<Object>, at: Position, station: &mut Station) -> InteractionEvent {
    if station.fixture.is_delivery() {
        return InteractionEvent::None;
    }
    let Some(resting) = station.object.as_mut() else {
        return InteractionEvent::None;
    };
    if station.fixture.is_cutting_surface() && resting.needs_chopping() {
        resting.chop();
        return InteractionEvent::Sliced {
            items: resting.names(),
            at,
        };
    }
    let Some(picked) = station.object.take() else {
        return InteractionEvent::None;
    };
    let items = picked.names();
    *holding = Some(picked);
    InteractionEvent::PickedUp { items, at }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kitchen::{Fixture, FoodKind};

    fn body_at(x: usize, y: usize, holding: Option<Object>) -> AgentBody {
        AgentBody {
            id: 1,
            position: Position::new(x, y),
            holding,
        }
    }

    fn station(fixture: Fixture, object: Option<Object>) -> Station {
        Station { fixture, object }
    }

    fn chopped(kind: FoodKind) -> Object {
        let mut food = Object::food(kind);
        food.chop();
        food
    }

    #[test]
    fn floor_moves_agent() {
        let mut body = body_at(1, 1, None);
        let mut floor = station(Fixture::Floor, None);
        let event = resolve(&mut body, Position::new(2, 1), &mut floor, false);
        assert_eq!(event, InteractionEvent::Moved { to: Position::new(2, 1) });
        assert_eq!(body.position, Position::new(2, 1));
        assert_eq!(event.description().as_deref(), Some("moved to"));
    }

    #[test]
    fn occupied_floor_blocks_move() {
        let mut body = body_at(1, 1, None);
        let mut floor = station(Fixture::Floor, None);
        let event = resolve(&mut body, Position::new(2, 1), &mut floor, true);
        assert_eq!(event, InteractionEvent::None);
        assert_eq!(body.position, Position::new(1, 1));
        assert_eq!(event.description(), None);
    }

    #[test]
    fn empty_hand_picks_up_from_counter() {
        let mut body = body_at(5, 1, None);
        let mut counter = station(Fixture::Counter, Some(Object::food(FoodKind::Lettuce)));
        let event = resolve(&mut body, Position::new(6, 1), &mut counter, false);
        assert_eq!(
            event,
            InteractionEvent::PickedUp {
                items: vec!["lettuce".to_string()],
                at: Position::new(6, 1)
            }
        );
        assert!(counter.object.is_none());
        assert_eq!(body.holding, Some(Object::food(FoodKind::Lettuce)));
        assert_eq!(event.description().as_deref(), Some("picked up lettuce"));
    }

    #[test]
    fn raw_food_on_cutboard_is_sliced_in_place() {
        let mut body = body_at(1, 1, None);
        let mut board = station(Fixture::Cutboard, Some(Object::food(FoodKind::Tomato)));
        let event = resolve(&mut body, Position::new(0, 1), &mut board, false);
        assert_eq!(event.description().as_deref(), Some("sliced tomato on"));
        assert!(body.holding.is_none());
        assert_eq!(board.object, Some(chopped(FoodKind::Tomato)));

        // Once chopped, the next interaction picks it up.
        let event = resolve(&mut body, Position::new(0, 1), &mut board, false);
        assert!(matches!(event, InteractionEvent::PickedUp { .. }));
        assert_eq!(body.holding, Some(chopped(FoodKind::Tomato)));
    }

    #[test]
    fn held_item_is_put_down_on_empty_station() {
        let mut body = body_at(4, 1, Some(Object::food(FoodKind::Lettuce)));
        let mut counter = station(Fixture::Counter, None);
        let event = resolve(&mut body, Position::new(3, 1), &mut counter, false);
        assert_eq!(event.description().as_deref(), Some("put lettuce onto"));
        assert!(body.holding.is_none());
        assert_eq!(counter.object, Some(Object::food(FoodKind::Lettuce)));
    }

    #[test]
    fn raw_food_is_put_on_cutboard_not_sliced() {
        let mut body = body_at(1, 1, Some(Object::food(FoodKind::Lettuce)));
        let mut board = station(Fixture::Cutboard, None);
        let event = resolve(&mut body, Position::new(0, 1), &mut board, false);
        assert!(matches!(event, InteractionEvent::PutDown { .. }));
        assert_eq!(board.object, Some(Object::food(FoodKind::Lettuce)));
    }

    #[test]
    fn chopped_food_merges_onto_plate() {
        let mut body = body_at(4, 1, Some(chopped(FoodKind::Lettuce)));
        let mut counter = station(Fixture::Counter, Some(Object::plate()));
        let event = resolve(&mut body, Position::new(3, 1), &mut counter, false);
        assert_eq!(event.description().as_deref(), Some("merged lettuce with"));
        assert!(body.holding.is_none());
        let merged = counter.object.as_ref().unwrap();
        assert_eq!(merged.names(), vec!["lettuce", "plate"]);
        assert!(merged.is_deliverable());
    }

    #[test]
    fn unmergeable_target_keeps_hand_full() {
        let mut body = body_at(4, 1, Some(Object::food(FoodKind::Lettuce)));
        let mut counter = station(Fixture::Counter, Some(Object::plate()));
        let event = resolve(&mut body, Position::new(3, 1), &mut counter, false);
        assert_eq!(event, InteractionEvent::None);
        assert_eq!(body.holding, Some(Object::food(FoodKind::Lettuce)));
        assert_eq!(counter.object, Some(Object::plate()));
    }

    #[test]
    fn only_deliverable_objects_are_delivered() {
        let mut body = body_at(1, 3, Some(chopped(FoodKind::Lettuce)));
        let mut star = station(Fixture::Delivery, None);
        assert_eq!(
            resolve(&mut body, Position::new(0, 3), &mut star, false),
            InteractionEvent::None
        );
        assert!(body.holding.is_some());

        let salad = Object::plate().merge(chopped(FoodKind::Lettuce));
        body.holding = Some(salad);
        let event = resolve(&mut body, Position::new(0, 3), &mut star, false);
        assert_eq!(
            event.description().as_deref(),
            Some("delivered lettuce, plate at")
        );
        assert!(body.holding.is_none());
        assert!(star.object.is_some());
    }

    #[test]
    fn empty_station_with_empty_hand_does_nothing() {
        let mut body = body_at(1, 1, None);
        let mut counter = station(Fixture::Counter, None);
        assert_eq!(
            resolve(&mut body, Position::new(1, 0), &mut counter, false),
            InteractionEvent::None
        );
        let mut star = station(Fixture::Delivery, Some(Object::plate()));
        assert_eq!(
            resolve(&mut body, Position::new(0, 3), &mut star, false),
            InteractionEvent::None
        );
    }
}
