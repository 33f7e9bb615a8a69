//! Choosing the plugin or service a command operates on.

use crate::errors::CommandError;
use crate::prompt::{PromptError, Prompter};
use scaffold_ast::{EntityRef, PluginRef, ServiceRef};

/// What the caller supplied for a selection.
#[derive(Debug, Clone)]
pub enum Target<T> {
    Direct(T),
    Named(String),
    Unspecified,
}

impl<T> From<Option<String>> for Target<T> {
    fn from(name: Option<String>) -> Self {
        match name {
            Some(name) => Target::Named(name),
            None => Target::Unspecified,
        }
    }
}

pub trait Candidate: Clone {
    fn candidate_name(&self) -> &str;
}

impl Candidate for PluginRef {
    fn candidate_name(&self) -> &str {
        self.class_name()
    }
}

impl Candidate for ServiceRef {
    fn candidate_name(&self) -> &str {
        self.class_name()
    }
}

impl Candidate for EntityRef {
    fn candidate_name(&self) -> &str {
        self.name()
    }
}

#[derive(Debug)]
pub enum SelectionState<T> {
    Unresolved(Target<T>),
    AwaitingSelection,
    Resolved(T),
    Cancelled,
}

/// Fixed inputs of one selection.
pub struct Selection<'a, T> {
    /// `Plugin` or `Service`, used in messages.
    pub kind: &'a str,
    pub candidates: Vec<T>,
    pub interactive: bool,
    pub hint: &'a str,
}

impl<T: Candidate> Selection<'_, T> {
    fn names(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|c| c.candidate_name().to_string())
            .collect()
    }

    /// Advance one transition. `Err` is a terminal failure.
    pub fn step(
        &self,
        state: SelectionState<T>,
        prompter: &mut dyn Prompter,
    ) -> Result<SelectionState<T>, CommandError> {
        match state {
            SelectionState::Unresolved(Target::Direct(value)) => Ok(SelectionState::Resolved(value)),
            SelectionState::Unresolved(Target::Named(name)) => self
                .candidates
                .iter()
                .find(|c| c.candidate_name() == name)
                .cloned()
                .map(SelectionState::Resolved)
                .ok_or_else(|| CommandError::NotFound {
                    kind: self.kind.to_string(),
                    name,
                    available: self.names(),
                }),
            SelectionState::Unresolved(Target::Unspecified) if self.interactive => {
                if self.candidates.is_empty() {
                    return Err(CommandError::validation(
                        format!("No {} classes found in the project", self.kind.to_lowercase()),
                        self.hint,
                    ));
                }
                Ok(SelectionState::AwaitingSelection)
            }
            SelectionState::Unresolved(Target::Unspecified) => Err(CommandError::missing(
                format!("{} name is required", self.kind),
                self.hint,
            )),
            SelectionState::AwaitingSelection => {
                let message = format!("Select a {}", self.kind.to_lowercase());
                match prompter.select(&message, &self.names()) {
                    Ok(index) => Ok(self
                        .candidates
                        .get(index)
                        .cloned()
                        .map(SelectionState::Resolved)
                        .unwrap_or(SelectionState::Cancelled)),
                    Err(PromptError::Cancelled) => Ok(SelectionState::Cancelled),
                    Err(err) => Err(err.into()),
                }
            }
            done @ (SelectionState::Resolved(_) | SelectionState::Cancelled) => Ok(done),
        }
    }

    /// Run the machine to a terminal state.
    pub fn resolve(&self, target: Target<T>, prompter: &mut dyn Prompter) -> Result<T, CommandError> {
        let mut state = SelectionState::Unresolved(target);
        loop {
            state = match self.step(state, prompter)? {
                SelectionState::Resolved(value) => return Ok(value),
                SelectionState::Cancelled => return Err(CommandError::Cancelled),
                next => next,
            };
        }
    }
}
