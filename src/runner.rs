// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Step execution.
//!
//! The runner walks a list of steps strictly in order. Optional steps are
//! gated behind a yes/no answer first; a declined step is neither checked nor
//! run. Every remaining step has its idempotency check consulted, and only
//! steps whose end state does not hold yet get applied.
//!
//! The first failing check or action aborts the whole run. Nothing is rolled
//! back.

use crate::{
    config::Answer,
    step::{Context, OptionalStep, Step, StepError, StepKind},
};

use inquire::{Confirm, InquireError};
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{debug, error, info, warn};

/// Ask the user yes/no questions.
pub trait Prompter {
    /// Ask target question, and return whether the answer was yes.
    fn confirm(&self, question: &str) -> Result<bool, InquireError>;
}

impl<P> Prompter for &P
where
    P: Prompter + ?Sized,
{
    fn confirm(&self, question: &str) -> Result<bool, InquireError> {
        (**self).confirm(question)
    }
}

/// Prompt through the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompter;

impl InquirePrompter {
    /// Construct new terminal prompter.
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for InquirePrompter {
    fn confirm(&self, question: &str) -> Result<bool, InquireError> {
        Confirm::new(question).with_default(false).prompt()
    }
}

/// Execute provisioning steps in order.
pub struct Runner<'a, P = InquirePrompter>
where
    P: Prompter,
{
    ctx: Context<'a>,
    prompter: P,
    answer_override: Option<Answer>,
}

impl<'a, P> Runner<'a, P>
where
    P: Prompter,
{
    /// Construct new runner.
    pub fn new(ctx: Context<'a>, prompter: P) -> Self {
        Self {
            ctx,
            prompter,
            answer_override: None,
        }
    }

    /// Answer every optional step the same way, ignoring configured
    /// policies.
    pub fn with_answer_override(mut self, answer: Option<Answer>) -> Self {
        self.answer_override = answer;
        self
    }

    /// Run target steps in order.
    ///
    /// # Errors
    ///
    /// - Return [`RunError::Prompt`] if the user cannot be asked.
    /// - Return [`RunError::Step`] for the first step that fails.
    pub fn run(&self, steps: &[Step]) -> Result<Report> {
        let mut report = Report::default();
        for step in steps {
            let outcome = self.run_step(step).inspect_err(|err| {
                error!("step {:?} failed, stopping here", step.name());
                debug!("{err:?}");
            })?;
            report.entries.push((step.name().to_string(), outcome));
        }

        Ok(report)
    }

    fn run_step(&self, step: &Step) -> Result<Outcome> {
        if let StepKind::Optional(which) = step.kind() {
            if !self.accepts(step, which)? {
                info!("{}: declined", step.name());
                return Ok(Outcome::Declined);
            }
        }

        if step.is_satisfied(&self.ctx).map_err(|err| RunError::step(step, err))? {
            warn!("{}: already satisfied, skipping", step.name());
            return Ok(Outcome::AlreadySatisfied);
        }

        info!("{}: applying", step.name());
        step.apply(&self.ctx).map_err(|err| RunError::step(step, err))?;
        info!("{}: done", step.name());

        Ok(Outcome::Applied)
    }

    fn accepts(&self, step: &Step, which: OptionalStep) -> Result<bool> {
        let answer = self
            .answer_override
            .unwrap_or_else(|| self.ctx.config.optional.get(which));

        match answer {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            Answer::Ask => self
                .prompter
                .confirm(which.question())
                .map_err(|err| RunError::Prompt {
                    source: err,
                    name: step.name().to_string(),
                }),
        }
    }
}

/// What happened to a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Action ran.
    Applied,

    /// Idempotency check passed, action skipped.
    AlreadySatisfied,

    /// Optional step the user said no to.
    Declined,
}

impl Display for Outcome {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Applied => fmt.write_str("applied"),
            Self::AlreadySatisfied => fmt.write_str("already satisfied"),
            Self::Declined => fmt.write_str("declined"),
        }
    }
}

/// Outcome of each step of a finished run, in step order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    entries: Vec<(String, Outcome)>,
}

impl Report {
    /// Outcome of step with target name.
    pub fn outcome(&self, name: &str) -> Option<Outcome> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, outcome)| *outcome)
    }

    /// Iterate over step names and outcomes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Outcome)> {
        self.entries
            .iter()
            .map(|(name, outcome)| (name.as_str(), *outcome))
    }

    /// Names of steps whose action ran.
    pub fn applied(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, outcome)| *outcome == Outcome::Applied)
            .map(|(name, _)| name)
            .collect()
    }
}

impl Display for Report {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let width = self
            .entries
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or_default();

        for (name, outcome) in &self.entries {
            writeln!(fmt, "{name:<width$}  {outcome}")?;
        }

        Ok(())
    }
}

/// Run error types.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Step check or action fails.
    #[error("step {name:?} failed")]
    Step {
        #[source]
        source: StepError,
        name: String,
    },

    /// Optional step question cannot be asked.
    #[error("cannot ask whether to run step {name:?}")]
    Prompt {
        #[source]
        source: InquireError,
        name: String,
    },
}

impl RunError {
    fn step(step: &Step, source: StepError) -> Self {
        Self::Step {
            source,
            name: step.name().to_string(),
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = RunError> = std::result::Result<T, E>;
