use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    Action, AgentId,
    agent::{AgentState, KitchenView},
    interaction::InteractionEvent,
    items::ItemLocations,
    kitchen::{ActionMap, Environment, Kitchen, StepFeedback},
    layout::Level,
    map::{Grid, Terrain},
    task::Task,
};

/// Tunables for a run of the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Environment steps allowed, the initial observation included, before the
    /// episode is abandoned.
    pub max_steps: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig { max_steps: 200 }
    }
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeOutcome {
    /// Every queued task completed.
    Success { steps: u64, delivered: usize },
    /// The step budget ran out first.
    Incomplete { steps: u64, completed_tasks: usize },
}

impl EpisodeOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, EpisodeOutcome::Success { .. })
    }

    pub fn steps(self) -> u64 {
        match self {
            EpisodeOutcome::Success { steps, .. } | EpisodeOutcome::Incomplete { steps, .. } => {
                steps
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Running,
    Finished(EpisodeOutcome),
}

/// Drives a queue of tasks through an environment, one agent acting per tick.
///
/// The owner of the head task runs its skill while every other agent waits.
/// A task leaves the queue on the tick its skill reports completion.
#[derive(Debug)]
pub struct TaskExecutor<E: Environment> {
    env: E,
    grid: Grid<Terrain>,
    config: ExecutorConfig,
    queue: Vec<Task>,
    task_index: usize,
    task_started: bool,
    agents: BTreeMap<AgentId, AgentState>,
    items: ItemLocations,
    feedback: StepFeedback,
    steps: u64,
    delivered: usize,
    outcome: Option<EpisodeOutcome>,
}

impl TaskExecutor<Kitchen> {
    pub fn from_level(level: Level, tasks: Vec<Task>, config: ExecutorConfig) -> Self {
        TaskExecutor::new(level.kitchen, level.items, tasks, config)
    }
}

impl<E: Environment> TaskExecutor<E> {
    /// Observes the environment once with every agent idle, then waits for `tick`.
    pub fn new(
        mut env: E,
        mut items: ItemLocations,
        tasks: Vec<Task>,
        config: ExecutorConfig,
    ) -> Self {
        let grid = env.walkable_grid();
        let feedback = env.step(&ActionMap::new());
        let agents = feedback
            .iter()
            .map(|(&id, observed)| {
                let mut agent = AgentState::new(id);
                agent.set_state(observed, &mut items);
                (id, agent)
            })
            .collect();
        info!(tasks = tasks.len(), max_steps = config.max_steps, "executor ready");

        TaskExecutor {
            env,
            grid,
            config,
            queue: tasks,
            task_index: 0,
            task_started: false,
            agents,
            items,
            feedback,
            // The observing step above counts against the budget.
            steps: 1,
            delivered: 0,
            outcome: None,
        }
    }

    /// Appends a task. A run that succeeded because the queue ran dry resumes.
    pub fn enqueue(&mut self, task: Task) {
        debug!(%task, "enqueued");
        self.queue.push(task);
        if self.outcome.is_some_and(EpisodeOutcome::is_success) {
            self.outcome = None;
        }
    }

    /// Advances the episode by at most one environment step.
    pub fn tick(&mut self) -> TickStatus {
        if let Some(outcome) = self.outcome {
            return TickStatus::Finished(outcome);
        }
        let Some(task) = self.queue.get(self.task_index).cloned() else {
            return self.finish(EpisodeOutcome::Success {
                steps: self.steps,
                delivered: self.delivered,
            });
        };
        let Some(agent) = self.agents.get_mut(&task.owner) else {
            error!(%task, "no such agent, dropping task");
            return self.advance();
        };

        if !self.task_started {
            info!(index = self.task_index, %task, "starting task");
            agent.reset_state(false);
            self.task_started = true;
        }
        if let Some(observed) = self.feedback.get(&task.owner) {
            agent.set_state(observed, &mut self.items);
        }
        let view = KitchenView {
            grid: &self.grid,
            items: &self.items,
        };
        let step = agent.run(&task, &view);

        let actions: ActionMap = self
            .agents
            .keys()
            .map(|&id| {
                let action = if id == task.owner {
                    step.action
                } else {
                    Action::Wait
                };
                (id, action)
            })
            .collect();
        self.feedback = self.env.step(&actions);
        self.steps += 1;

        self.delivered += self
            .feedback
            .values()
            .filter(|observed| matches!(observed.event, InteractionEvent::Delivered { .. }))
            .count();
        if let (Some(agent), Some(observed)) = (
            self.agents.get_mut(&task.owner),
            self.feedback.get(&task.owner),
        ) {
            agent.set_state(observed, &mut self.items);
        }

        if self.steps > self.config.max_steps {
            warn!(
                steps = self.steps,
                completed_tasks = self.task_index,
                "step budget exhausted"
            );
            return self.finish(EpisodeOutcome::Incomplete {
                steps: self.steps,
                completed_tasks: self.task_index,
            });
        }
        if step.complete {
            info!(%task, steps = self.steps, "task complete");
            return self.advance();
        }
        TickStatus::Running
    }

    /// Ticks until the episode ends.
    pub fn run(&mut self) -> EpisodeOutcome {
        loop {
            if let TickStatus::Finished(outcome) = self.tick() {
                return outcome;
            }
        }
    }

    fn advance(&mut self) -> TickStatus {
        self.task_index += 1;
        self.task_started = false;
        if self.task_index < self.queue.len() {
            return TickStatus::Running;
        }
        self.finish(EpisodeOutcome::Success {
            steps: self.steps,
            delivered: self.delivered,
        })
    }

    fn finish(&mut self, outcome: EpisodeOutcome) -> TickStatus {
        if self.outcome.is_none() {
            info!(?outcome, "episode finished");
        }
        self.outcome = Some(outcome);
        TickStatus::Finished(outcome)
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.values()
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.get(&id)
    }

    pub fn items(&self) -> &ItemLocations {
        &self.items
    }

    pub fn queue(&self) -> &[Task] {
        &self.queue
    }

    /// Index of the task being worked on; equals the queue length once all are done.
    pub fn task_index(&self) -> usize {
        self.task_index
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.queue.get(self.task_index)
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn outcome(&self) -> Option<EpisodeOutcome> {
        self.outcome
    }
}
