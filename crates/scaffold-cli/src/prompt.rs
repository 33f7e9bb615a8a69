//! Interactive prompts.
//!
//! Commands ask questions through [`Prompter`]. The terminal implementation
//! uses `dialoguer` and gives up after an idle timeout; [`ScriptedPrompter`]
//! replays canned answers.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Checks a text answer; `Err` carries the message shown to the user.
pub type Validator = fn(&str) -> Result<(), String>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("cancelled")]
    Cancelled,
    #[error("timed out")]
    TimedOut,
    #[error("{0}")]
    Io(String),
}

pub trait Prompter {
    fn text(&mut self, message: &str, validator: Option<Validator>) -> Result<String, PromptError>;
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError>;
    fn select(&mut self, message: &str, items: &[String]) -> Result<usize, PromptError>;
}

pub struct TerminalPrompter {
    timeout: Duration,
    expired: bool,
}

impl TerminalPrompter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            expired: false,
        }
    }

    /// Run a blocking prompt on its own thread so the wait can time out.
    ///
    /// A timed-out reader thread stays blocked on stdin until the process
    /// exits. The prompter is spent after a timeout: later prompts fail with
    /// `TimedOut` at once instead of starting a second reader.
    fn run<T, F>(&mut self, prompt: F) -> Result<T, PromptError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<Option<T>, dialoguer::Error> + Send + 'static,
    {
        if self.expired {
            return Err(PromptError::TimedOut);
        }
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(prompt());
        });
        match rx.recv_timeout(self.timeout) {
            Ok(Ok(Some(value))) => Ok(value),
            Ok(Ok(None)) => Err(PromptError::Cancelled),
            Ok(Err(dialoguer::Error::IO(err))) if err.kind() == std::io::ErrorKind::Interrupted => {
                Err(PromptError::Cancelled)
            }
            Ok(Err(err)) => Err(PromptError::Io(err.to_string())),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.expired = true;
                Err(PromptError::TimedOut)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(PromptError::Cancelled),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn text(&mut self, message: &str, validator: Option<Validator>) -> Result<String, PromptError> {
        let message = message.to_string();
        self.run(move || {
            let theme = ColorfulTheme::default();
            let mut input = Input::<String>::with_theme(&theme).with_prompt(message);
            if let Some(validate) = validator {
                input = input.validate_with(move |value: &String| validate(value));
            }
            input.interact_text().map(Some)
        })
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        let message = message.to_string();
        self.run(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .default(default)
                .interact_opt()
        })
    }

    fn select(&mut self, message: &str, items: &[String]) -> Result<usize, PromptError> {
        let message = message.to_string();
        let items = items.to_vec();
        self.run(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .items(&items)
                .default(0)
                .interact_opt()
        })
    }
}

/// A canned answer for [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Confirm(bool),
    /// Select the item with this label.
    Choose(String),
    Cancel,
    TimeOut,
}

/// Replays answers in order. Running out of answers cancels.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, message: &str) -> Result<Answer, PromptError> {
        self.asked.push(message.to_string());
        match self.answers.pop_front() {
            None | Some(Answer::Cancel) => Err(PromptError::Cancelled),
            Some(Answer::TimeOut) => Err(PromptError::TimedOut),
            Some(answer) => Ok(answer),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, message: &str, validator: Option<Validator>) -> Result<String, PromptError> {
        match self.next(message)? {
            Answer::Text(text) => {
                if let Some(validate) = validator {
                    validate(&text).map_err(PromptError::Io)?;
                }
                Ok(text)
            }
            other => Err(PromptError::Io(format!("expected text for '{message}', got {other:?}"))),
        }
    }

    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(message)? {
            Answer::Confirm(value) => Ok(value),
            other => Err(PromptError::Io(format!(
                "expected a confirmation for '{message}', got {other:?}"
            ))),
        }
    }

    fn select(&mut self, message: &str, items: &[String]) -> Result<usize, PromptError> {
        match self.next(message)? {
            Answer::Choose(label) => items
                .iter()
                .position(|item| *item == label)
                .ok_or_else(|| PromptError::Io(format!("'{label}' is not one of {items:?}"))),
            other => Err(PromptError::Io(format!(
                "expected a selection for '{message}', got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_prompter_is_spent_after_timeout() {
        let mut prompter = TerminalPrompter::new(Duration::from_millis(20));
        let slow = prompter.run(|| {
            thread::sleep(Duration::from_millis(500));
            Ok(Some(1))
        });
        assert_eq!(slow, Err(PromptError::TimedOut));

        let instant = prompter.run(|| Ok(Some(2)));
        assert_eq!(instant, Err(PromptError::TimedOut));
    }

    #[test]
    fn test_terminal_prompter_returns_answer_in_time() {
        let mut prompter = TerminalPrompter::new(Duration::from_secs(5));
        assert_eq!(prompter.run(|| Ok(Some("Review".to_string()))), Ok("Review".to_string()));
        assert_eq!(prompter.run(|| Ok(None::<bool>)), Err(PromptError::Cancelled));
    }

    #[test]
    fn test_scripted_answers_in_order() {
        let mut prompter = ScriptedPrompter::new([
            Answer::Choose("B".to_string()),
            Answer::Confirm(true),
            Answer::Text("Review".to_string()),
        ]);
        let items = vec!["A".to_string(), "B".to_string()];
        assert_eq!(prompter.select("Pick", &items), Ok(1));
        assert_eq!(prompter.confirm("Sure?", false), Ok(true));
        assert_eq!(prompter.text("Name", None), Ok("Review".to_string()));
        assert_eq!(prompter.confirm("More?", false), Err(PromptError::Cancelled));
        assert_eq!(prompter.asked.len(), 4);
    }

    #[test]
    fn test_scripted_validator_and_timeout() {
        fn not_empty(value: &str) -> Result<(), String> {
            if value.is_empty() {
                Err("required".to_string())
            } else {
                Ok(())
            }
        }
        let mut prompter = ScriptedPrompter::new([Answer::Text(String::new()), Answer::TimeOut]);
        assert_eq!(
            prompter.text("Name", Some(not_empty)),
            Err(PromptError::Io("required".to_string()))
        );
        assert_eq!(prompter.text("Name", None), Err(PromptError::TimedOut));
    }
}
