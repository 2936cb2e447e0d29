use tracing::{debug, error, warn};

use crate::{
    Action, AgentId, Position,
    interaction::InteractionEvent,
    items::{DELIVERY_POINT, ItemKind, ItemLocations, ItemStatus},
    kitchen::AgentFeedback,
    map::{Grid, Terrain},
    pathfinding::find_path,
    task::{Skill, Task},
};

/// Provides a read-only view of the kitchen relevant to a skill.
#[derive(Debug, Clone, Copy)]
pub struct KitchenView<'a> {
    pub grid: &'a Grid<Terrain>,
    pub items: &'a ItemLocations,
}

/// What a skill asks for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillStep {
    pub complete: bool,
    pub action: Action,
}

impl SkillStep {
    pub fn done() -> Self {
        SkillStep {
            complete: true,
            action: Action::Wait,
        }
    }

    pub fn done_with(action: Action) -> Self {
        SkillStep {
            complete: true,
            action,
        }
    }

    pub fn moving(action: Action) -> Self {
        SkillStep {
            complete: false,
            action,
        }
    }

    pub fn wait() -> Self {
        SkillStep::moving(Action::Wait)
    }
}

/// What one agent knows about itself, rebuilt tick by tick from kitchen feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentState {
    id: AgentId,
    location: Option<Position>,
    held: Vec<String>,
    history: Vec<String>,
    previous: Option<AgentFeedback>,
    pending: Option<Action>,
}

impl AgentState {
    pub fn new(id: AgentId) -> Self {
        AgentState {
            id,
            location: None,
            held: Vec::new(),
            history: Vec::new(),
            previous: None,
            pending: None,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn location(&self) -> Option<Position> {
        self.location
    }

    /// Names of the items in hand, in pickup order.
    pub fn held(&self) -> &[String] {
        &self.held
    }

    /// True if a held name starts with `item`, so `"plate"` matches `"plate0"`.
    pub fn is_holding(&self, item: &str) -> bool {
        self.held.iter().any(|held| held.starts_with(item))
    }

    /// Every interaction this agent has taken part in, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The last action a skill produced since the most recent reset.
    pub fn pending(&self) -> Option<Action> {
        self.pending
    }

    /// Folds one tick of feedback into the agent's state and the shared item table.
    ///
    /// Feedback identical to the previously processed one is ignored, so the
    /// same tick can safely be delivered more than once.
    pub fn set_state(&mut self, feedback: &AgentFeedback, items: &mut ItemLocations) {
        self.location = Some(feedback.location);
        let Some(at) = feedback.event.location() else {
            return;
        };
        if self.previous.as_ref() == Some(feedback) {
            return;
        }

        let description = describe(&feedback.event, at, items);
        debug!(agent = self.id, %description, "state updated");
        self.history.push(description);

        match &feedback.event {
            InteractionEvent::PickedUp { items: names, .. } => {
                let mut picked = items.movables_at(at);
                if picked.is_empty() {
                    picked = names.iter().filter(|n| items.contains(n)).cloned().collect();
                }
                if picked.is_empty() {
                    warn!(agent = self.id, %at, ?names, "picked up an item the table does not know");
                }
                for name in picked {
                    items.take(&name);
                    self.held.push(name);
                }
            }
            InteractionEvent::PutDown { .. } | InteractionEvent::Merged { .. } => {
                let surface = items.surface_at(at).map(str::to_string);
                for name in self.held.drain(..) {
                    if let Some(surface) = &surface {
                        items.mark_placed(&name, surface);
                    }
                    items.insert(name, at);
                }
            }
            InteractionEvent::Sliced { items: names, .. } => {
                let board = items.surface_at(at).unwrap_or_default().to_string();
                let mut sliced: Vec<String> = items
                    .movables_at(at)
                    .into_iter()
                    .filter(|name| ItemKind::of(name) == ItemKind::Ingredient)
                    .collect();
                if sliced.is_empty() {
                    sliced = names.iter().filter(|n| items.contains(n)).cloned().collect();
                }
                for name in sliced {
                    items.mark_sliced(&name, &board);
                }
            }
            InteractionEvent::Delivered { .. } => self.held.clear(),
            InteractionEvent::Moved { .. } | InteractionEvent::None => {}
        }

        if !self.held.is_empty() {
            debug!(agent = self.id, held = ?self.held, "on hand");
        }
        self.previous = Some(feedback.clone());
    }

    /// Clears transient movement state at the start of a newly assigned task.
    pub fn reset_state(&mut self, clear_inventory: bool) {
        self.location = None;
        self.pending = None;
        if clear_inventory {
            self.held.clear();
        }
    }

    /// Runs the task's skill for one tick.
    pub fn run(&mut self, task: &Task, view: &KitchenView<'_>) -> SkillStep {
        let step = match (task.skill, task.argument.as_deref()) {
            (Skill::Deliver, _) => self.deliver(view),
            (skill, None) => {
                error!(agent = self.id, %skill, "missing item argument, dropping task");
                SkillStep::done()
            }
            (Skill::Fetch, Some(item)) => self.fetch(item, view),
            (Skill::PutOnto, Some(item)) => self.put_onto(item, view),
            (Skill::SliceOn, Some(item)) => self.slice_on(item, view),
        };
        self.pending = Some(step.action);
        step
    }

    /// Walks to `item` and picks it up; complete once it is in hand.
    pub fn fetch(&self, item: &str, view: &KitchenView<'_>) -> SkillStep {
        if self.is_holding(item) {
            return SkillStep::done();
        }
        let Some(destination) = view.items.position(item) else {
            error!(agent = self.id, item, "fetch: invalid item");
            return SkillStep::done();
        };
        self.approach(destination, view)
    }

    /// Carries whatever is in hand onto `item`; complete once the hand is empty.
    pub fn put_onto(&self, item: &str, view: &KitchenView<'_>) -> SkillStep {
        if self.held.is_empty() {
            return SkillStep::done();
        }
        let Some(destination) = view.items.position(item) else {
            error!(agent = self.id, item, "put_onto: invalid item");
            return SkillStep::done();
        };
        self.approach(destination, view)
    }

    /// Slices the ingredient resting on cutting board `item`.
    ///
    /// Complete once an ingredient sliced on this board is on it or in hand.
    /// An unsliced ingredient carried by this agent is first put down on the
    /// board. With nothing to slice, the agent waits for one to be placed.
    pub fn slice_on(&self, item: &str, view: &KitchenView<'_>) -> SkillStep {
        let Some(destination) = view.items.position(item) else {
            error!(agent = self.id, item, "slice_on: invalid item");
            return SkillStep::done();
        };
        if ItemKind::of(item) != ItemKind::CuttingSurface {
            error!(agent = self.id, item, "slice_on: cannot slice on this item");
            return SkillStep::done();
        }

        let resting: Vec<String> = view
            .items
            .movables_at(destination)
            .into_iter()
            .filter(|name| ItemKind::of(name) == ItemKind::Ingredient)
            .collect();
        let is_sliced = |name: &String| view.items.status(name).is_sliced();
        let sliced_here = |name: &String| {
            matches!(view.items.status(name), ItemStatus::SlicedOn(board) if board == item)
        };

        if self.held.iter().any(sliced_here) {
            return SkillStep::done();
        }
        if resting.iter().any(|name| !is_sliced(name)) {
            return self.approach(destination, view);
        }
        if resting.iter().any(is_sliced) {
            return SkillStep::done();
        }
        let carrying_raw = self
            .held
            .iter()
            .all(|name| ItemKind::of(name) == ItemKind::Ingredient)
            && self.held.iter().any(|name| !is_sliced(name));
        if carrying_raw {
            return self.approach(destination, view);
        }
        SkillStep::wait()
    }

    /// Walks to the cell just past the delivery point, then hands the dish over.
    pub fn deliver(&self, view: &KitchenView<'_>) -> SkillStep {
        let Some(destination) = view
            .items
            .position(DELIVERY_POINT)
            .and_then(|star| star.offset(1, 0))
        else {
            error!(agent = self.id, "deliver: no delivery point in this kitchen");
            return SkillStep::done();
        };
        if self.location == Some(destination) {
            return SkillStep::done_with(Action::LEFT);
        }
        self.approach(destination, view)
    }

    /// First move of a path to `destination`. An unreachable destination completes the task.
    fn approach(&self, destination: Position, view: &KitchenView<'_>) -> SkillStep {
        let Some(location) = self.location else {
            warn!(agent = self.id, "location unknown, waiting for feedback");
            return SkillStep::wait();
        };
        let grid = view.grid.carved(destination);
        match find_path(&grid, location, destination) {
            Ok(path) => {
                if !path.reaches_goal() {
                    warn!(agent = self.id, %destination, "following a partial path");
                }
                debug!(agent = self.id, path = ?path.steps(), "planned");
                match path.next_step() {
                    Some(next) => SkillStep::moving(Action::toward(location, next)),
                    None => SkillStep::wait(),
                }
            }
            Err(err) => {
                error!(agent = self.id, %err, "destination unreachable, dropping task");
                SkillStep::done()
            }
        }
    }
}

/// History line for an event: the event's own text followed by the named
/// items at the action location that it does not already mention.
fn describe(event: &InteractionEvent, at: Position, items: &ItemLocations) -> String {
    let mut description = event.description().unwrap_or_default();
    if let InteractionEvent::Moved { to } = event {
        description.push_str(&format!(" {to}"));
        return description;
    }
    let mentioned = event.items();
    let others: Vec<&str> = items
        .names_at(at)
        .into_iter()
        .filter(|name| !mentioned.iter().any(|m| m == name))
        .collect();
    if others.is_empty() {
        return description;
    }
    if matches!(event, InteractionEvent::PickedUp { .. }) {
        description.push_str(" from");
    }
    description.push(' ');
    description.push_str(&others.join(", "));
    description
}
