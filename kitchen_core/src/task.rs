//! Tasks, the skills they invoke, and the line-oriented plan format.
//!
//! A plan is one task per line, written as `agent<N>.<skill>(<argument>)`:
//!
//! ```text
//! # blank lines and `#` comments are skipped
//! agent2.fetch("lettuce")
//! agent1.slice_on("cutboard0")
//! agent1.deliver(None)
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::AgentId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskParseError {
    #[error("expected `agent<N>.<skill>(...)`, found `{0}`")]
    Malformed(String),
    #[error("invalid agent `{0}`")]
    InvalidOwner(String),
    #[error("unknown skill `{0}`")]
    UnknownSkill(String),
    #[error("unterminated quote in argument `{0}`")]
    UnterminatedQuote(String),
}

/// A plan line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {source}")]
pub struct PlanError {
    pub line: usize,
    #[source]
    pub source: TaskParseError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Fetch,
    PutOnto,
    SliceOn,
    Deliver,
}

impl Skill {
    pub const ALL: [Skill; 4] = [Skill::Fetch, Skill::PutOnto, Skill::SliceOn, Skill::Deliver];

    pub fn name(self) -> &'static str {
        match self {
            Skill::Fetch => "fetch",
            Skill::PutOnto => "put_onto",
            Skill::SliceOn => "slice_on",
            Skill::Deliver => "deliver",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Skill {
    type Err = TaskParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Skill::ALL
            .into_iter()
            .find(|skill| skill.name() == s)
            .ok_or_else(|| TaskParseError::UnknownSkill(s.to_string()))
    }
}

/// One queued unit of work: a skill, its item argument, and the agent that runs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    pub skill: Skill,
    pub argument: Option<String>,
    pub owner: AgentId,
}

impl Task {
    pub fn new(owner: AgentId, skill: Skill, argument: Option<&str>) -> Self {
        Task {
            skill,
            argument: argument.map(str::to_string),
            owner,
        }
    }

    pub fn fetch(owner: AgentId, item: &str) -> Self {
        Task::new(owner, Skill::Fetch, Some(item))
    }

    pub fn put_onto(owner: AgentId, item: &str) -> Self {
        Task::new(owner, Skill::PutOnto, Some(item))
    }

    pub fn slice_on(owner: AgentId, item: &str) -> Self {
        Task::new(owner, Skill::SliceOn, Some(item))
    }

    pub fn deliver(owner: AgentId) -> Self {
        Task::new(owner, Skill::Deliver, None)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "agent{}.{}(\"{argument}\")", self.owner, self.skill),
            None => write!(f, "agent{}.{}(None)", self.owner, self.skill),
        }
    }
}

impl FromStr for Task {
    type Err = TaskParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let malformed = || TaskParseError::Malformed(line.to_string());

        let (agent, call) = line.split_once('.').ok_or_else(malformed)?;
        let owner = agent
            .trim()
            .strip_prefix("agent")
            .and_then(|n| n.parse::<AgentId>().ok())
            .ok_or_else(|| TaskParseError::InvalidOwner(agent.trim().to_string()))?;
        let (skill, argument) = call
            .trim_end()
            .strip_suffix(')')
            .and_then(|call| call.split_once('('))
            .ok_or_else(malformed)?;

        Ok(Task {
            skill: skill.trim().parse()?,
            argument: parse_argument(argument.trim())?,
            owner,
        })
    }
}

/// `"x"`, `'x'` or a bare word. An empty argument or `None` means no argument.
fn parse_argument(raw: &str) -> Result<Option<String>, TaskParseError> {
    if raw.is_empty() || raw == "None" {
        return Ok(None);
    }
    let Some(quote) = raw.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return Ok(Some(raw.to_string()));
    };
    raw[1..]
        .strip_suffix(quote)
        .map(|inner| Some(inner.to_string()))
        .ok_or_else(|| TaskParseError::UnterminatedQuote(raw.to_string()))
}

/// Parses a whole plan, skipping blank lines and `#` comments.
pub fn parse_plan(text: &str) -> Result<Vec<Task>, PlanError> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, text)| text.parse().map_err(|source| PlanError { line, source }))
        .collect()
}

/// Lettuce salad for the small kitchens: agent 2 ferries the lettuce and the
/// plate across the divider, agent 1 slices, plates and serves.
pub const LETTUCE_SALAD_PLAN: &str = r#"
# agent 2 hands the lettuce over the divider
agent2.fetch("lettuce")
agent2.put_onto("counter0")

# agent 1 slices it
agent1.fetch("lettuce")
agent1.put_onto("cutboard0")
agent1.slice_on("cutboard0")

# agent 2 brings the plate to the same counter
agent2.fetch("plate0")
agent2.put_onto("counter0")

# agent 1 plates the salad and serves it
agent1.fetch("lettuce")
agent1.put_onto("plate0")
agent1.fetch("lettuce")
agent1.deliver(None)
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_and_bare_arguments() {
        assert_eq!(
            "agent2.fetch(\"lettuce\")".parse::<Task>(),
            Ok(Task::fetch(2, "lettuce"))
        );
        assert_eq!(
            "  agent1.put_onto('counter0')  ".parse::<Task>(),
            Ok(Task::put_onto(1, "counter0"))
        );
        assert_eq!(
            "agent1.slice_on(cutboard0)".parse::<Task>(),
            Ok(Task::slice_on(1, "cutboard0"))
        );
        assert_eq!("agent1.deliver(None)".parse::<Task>(), Ok(Task::deliver(1)));
        assert_eq!("agent1.deliver()".parse::<Task>(), Ok(Task::deliver(1)));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            "fetch(\"lettuce\")".parse::<Task>(),
            Err(TaskParseError::Malformed("fetch(\"lettuce\")".to_string()))
        );
        assert_eq!(
            "chef.fetch(\"lettuce\")".parse::<Task>(),
            Err(TaskParseError::InvalidOwner("chef".to_string()))
        );
        assert_eq!(
            "agent1.boil(\"lettuce\")".parse::<Task>(),
            Err(TaskParseError::UnknownSkill("boil".to_string()))
        );
        assert_eq!(
            "agent1.fetch(\"lettuce)".parse::<Task>(),
            Err(TaskParseError::UnterminatedQuote("\"lettuce".to_string()))
        );
        assert!("agent1.fetch".parse::<Task>().is_err());
    }

    #[test]
    fn display_reads_back() {
        for task in [Task::fetch(2, "plate0"), Task::deliver(1)] {
            assert_eq!(task.to_string().parse::<Task>(), Ok(task));
        }
    }

    #[test]
    fn plan_reports_line_numbers() {
        let plan = "# header\n\nagent1.fetch(\"lettuce\")\nagent3.cook()\n";
        assert_eq!(
            parse_plan(plan),
            Err(PlanError {
                line: 4,
                source: TaskParseError::UnknownSkill("cook".to_string())
            })
        );
    }

    #[test]
    fn lettuce_salad_plan_parses() {
        let tasks = parse_plan(LETTUCE_SALAD_PLAN).unwrap();
        assert_eq!(tasks.len(), 11);
        assert_eq!(tasks[0], Task::fetch(2, "lettuce"));
        assert_eq!(tasks[4], Task::slice_on(1, "cutboard0"));
        assert_eq!(tasks[10], Task::deliver(1));
        assert!(tasks.iter().all(|task| task.owner == 1 || task.owner == 2));
    }
}
