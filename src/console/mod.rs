//! Terminal front end: renders the session on stdout and turns typed commands into
//! session actions. One loop owns the session and applies input lines, countdown ticks
//! and answer-save outcomes one at a time.

mod commands;
mod render;


use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::core::security::{CredentialStore, Credentials};
use crate::core::shutdown::shutdown_signal;
use crate::core::state::AppState;
use crate::core::time::format_remaining;
use crate::session::{
    ExamSession, PendingSave, SessionStatus, SubmitCause, SyncDisposition, SyncOutcome,
    TickOutcome,
};
use crate::tasks::answer_sync;
use crate::tasks::countdown::Countdown;
use commands::{Command, SubjectRef};

const TICK_BUFFER: usize = 64;
/// Remaining-time marks at which the student gets a reminder.
const TIME_WARNINGS: [u64; 2] = [5 * 60, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

pub(crate) async fn run(state: AppState, store: CredentialStore) -> anyhow::Result<()> {
    let (tick_tx, mut tick_rx) = mpsc::channel(TICK_BUFFER);
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let mut console = Console::new(state, store, std::io::stdout(), tick_tx, outcome_tx);
    console.intro()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let result = loop {
        let flow = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => console.handle_line(&line).await,
                Ok(None) => {
                    tracing::info!("Console input closed");
                    Ok(Flow::Exit)
                }
                Err(err) => Err(anyhow::Error::new(err).context("Failed to read console input")),
            },
            Some(()) = tick_rx.recv() => console.on_tick().await,
            Some(outcome) = outcome_rx.recv() => console.on_sync_outcome(outcome).map(|()| Flow::Continue),
            () = &mut shutdown => Ok(Flow::Exit),
        };

        match flow {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    console.teardown().await;
    result
}

pub(crate) struct Console<W: Write> {
    out: W,
    state: AppState,
    store: CredentialStore,
    session: ExamSession,
    countdown: Option<Countdown>,
    ticks: mpsc::Sender<()>,
    outcomes: mpsc::UnboundedSender<SyncOutcome>,
}

impl<W: Write> Console<W> {
    pub(crate) fn new(
        state: AppState,
        store: CredentialStore,
        out: W,
        ticks: mpsc::Sender<()>,
        outcomes: mpsc::UnboundedSender<SyncOutcome>,
    ) -> Self {
        let session = ExamSession::new(state.settings().session().page_size);
        Self { out, state, store, session, countdown: None, ticks, outcomes }
    }

    pub(crate) fn intro(&mut self) -> anyhow::Result<()> {
        render::intro(&mut self.out)?;
        self.out.flush()?;
        Ok(())
    }

    pub(crate) async fn handle_line(&mut self, line: &str) -> anyhow::Result<Flow> {
        let flow = match commands::parse(line) {
            Ok(command) => self.dispatch(command).await?,
            Err(err) => {
                render::error(&mut self.out, err)?;
                Flow::Continue
            }
        };
        self.out.flush()?;
        Ok(flow)
    }

    pub(crate) async fn on_tick(&mut self) -> anyhow::Result<Flow> {
        match self.session.tick() {
            TickOutcome::Ignored => Ok(Flow::Continue),
            TickOutcome::Running { remaining_seconds } => {
                if TIME_WARNINGS.contains(&remaining_seconds) {
                    render::notice(
                        &mut self.out,
                        format!("{} left.", format_remaining(remaining_seconds)),
                    )?;
                    self.out.flush()?;
                }
                Ok(Flow::Continue)
            }
            TickOutcome::Expired => {
                render::time_up(&mut self.out)?;
                let flow = self.finish().await?;
                self.out.flush()?;
                Ok(flow)
            }
        }
    }

    pub(crate) fn on_sync_outcome(&mut self, outcome: SyncOutcome) -> anyhow::Result<()> {
        if self.session.apply_sync_outcome(&outcome) == SyncDisposition::Failed {
            let reason = outcome.result.as_ref().err().map_or("unknown error", String::as_str);
            render::error(
                &mut self.out,
                format!(
                    "Answer for question {} was not saved ({reason}). Type `sync` to retry.",
                    outcome.save.question_id
                ),
            )?;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Stops the countdown; credentials are only cleared by a submission.
    pub(crate) async fn teardown(&mut self) {
        self.stop_countdown().await;
        if self.session.status() == SessionStatus::InProgress {
            tracing::warn!(
                unsynced = self.session.unsynced_answers().len(),
                "Console closed with the exam still in progress"
            );
        }
    }

    async fn dispatch(&mut self, command: Command) -> anyhow::Result<Flow> {
        match command {
            Command::Empty => {}
            Command::Help => render::help(&mut self.out)?,
            Command::Quit => {
                if self.session.status() == SessionStatus::InProgress {
                    render::notice(&mut self.out, "Leaving without submitting.")?;
                }
                return Ok(Flow::Exit);
            }
            Command::Start => return self.start().await,
            Command::Confirm => return self.confirm().await,
            _ if !self.session.is_loaded() => {
                render::notice(&mut self.out, "Type `start` to load the exam first.")?;
            }
            Command::Next => self.step(true)?,
            Command::Previous => self.step(false)?,
            Command::Jump { subject, question } => self.jump(subject, question)?,
            Command::Answer { slot, choice } => self.answer(slot, &choice)?,
            Command::Palette => render::palette(&mut self.out, &self.session)?,
            Command::Progress => render::progress(&mut self.out, &self.session)?,
            Command::Sync => self.sync()?,
            Command::Submit => self.request_submit()?,
            Command::Cancel => self.cancel()?,
        }
        Ok(Flow::Continue)
    }

    async fn start(&mut self) -> anyhow::Result<Flow> {
        if self.session.status() != SessionStatus::NotStarted {
            render::error(&mut self.out, "The exam has already started.")?;
            return Ok(Flow::Continue);
        }
        let Some(credentials) = self.credentials()? else {
            return Ok(Flow::Continue);
        };

        if !self.session.is_loaded() {
            render::notice(&mut self.out, "Loading your exam...")?;
            self.out.flush()?;
            if let Err(err) = self.state.loader().load(&mut self.session, &credentials).await {
                render::error(&mut self.out, format!("{err}. Type `start` to try again."))?;
                return Ok(Flow::Continue);
            }
        }

        if let Err(err) = self.session.begin() {
            render::error(&mut self.out, err)?;
            return Ok(Flow::Continue);
        }
        render::header(&mut self.out, &self.session)?;

        let period = Duration::from_millis(self.state.settings().session().tick_millis);
        self.countdown = Some(Countdown::spawn(period, self.ticks.clone()));

        if self.session.status() == SessionStatus::PendingSubmitConfirmation(SubmitCause::TimeExpired) {
            render::time_up(&mut self.out)?;
            return self.finish().await;
        }
        render::page(&mut self.out, &self.session)?;
        Ok(Flow::Continue)
    }

    fn step(&mut self, forward: bool) -> anyhow::Result<()> {
        let moved = if forward { self.session.next() } else { self.session.previous() };
        if moved {
            render::page(&mut self.out, &self.session)?;
        } else if forward {
            render::notice(&mut self.out, "This is the last page. Type `submit` to finish.")?;
        } else {
            render::notice(&mut self.out, "This is the first page.")?;
        }
        Ok(())
    }

    fn jump(&mut self, subject: SubjectRef, question: usize) -> anyhow::Result<()> {
        let subject_id = match subject {
            SubjectRef::Id(id) => id,
            SubjectRef::Number(number) => match self.session.subjects().get(number - 1) {
                Some(group) => group.id.clone(),
                None => {
                    render::error(&mut self.out, format!("There is no subject {number}."))?;
                    return Ok(());
                }
            },
        };

        match self.session.jump_to(&subject_id, question - 1) {
            Ok(_) => render::page(&mut self.out, &self.session)?,
            Err(err) => render::error(&mut self.out, err)?,
        }
        Ok(())
    }

    fn answer(&mut self, slot: usize, choice: &str) -> anyhow::Result<()> {
        let Some(question) = self.session.current_questions().get(slot - 1) else {
            render::error(&mut self.out, format!("There is no question {slot} on this page."))?;
            return Ok(());
        };
        let option_key = match commands::letter_index(choice) {
            Some(index) => question.option_key_at(index).map(str::to_string),
            None => Some(choice.to_string()),
        };
        let question_id = question.id.clone();
        let Some(option_key) = option_key else {
            render::error(&mut self.out, format!("This question has no option {choice}."))?;
            return Ok(());
        };

        match self.session.record_answer(&question_id, &option_key) {
            Ok(save) => {
                self.save_in_background(save)?;
                render::page(&mut self.out, &self.session)?;
            }
            Err(err) => render::error(&mut self.out, err)?,
        }
        Ok(())
    }

    fn sync(&mut self) -> anyhow::Result<()> {
        let backlog = self.session.unsynced_answers();
        if backlog.is_empty() {
            render::notice(&mut self.out, "All answers are saved.")?;
            return Ok(());
        }

        render::notice(
            &mut self.out,
            format!("Retrying {} unsaved answer(s)...", backlog.len()),
        )?;
        for save in backlog {
            self.save_in_background(save)?;
        }
        Ok(())
    }

    fn request_submit(&mut self) -> anyhow::Result<()> {
        if self.session.status() == SessionStatus::InProgress && !self.session.is_last_page() {
            render::notice(&mut self.out, "Go to the last page to submit.")?;
            return Ok(());
        }
        match self.session.request_submit() {
            Ok(()) => render::confirm_prompt(&mut self.out, &self.session)?,
            Err(err) => render::error(&mut self.out, err)?,
        }
        Ok(())
    }

    fn cancel(&mut self) -> anyhow::Result<()> {
        match self.session.cancel_submit() {
            Ok(()) => {
                render::notice(&mut self.out, "Back to the exam.")?;
                render::page(&mut self.out, &self.session)?;
            }
            Err(err) => render::error(&mut self.out, err)?,
        }
        Ok(())
    }

    async fn confirm(&mut self) -> anyhow::Result<Flow> {
        if !matches!(self.session.status(), SessionStatus::PendingSubmitConfirmation(_)) {
            render::error(&mut self.out, "Nothing to confirm. Type `submit` on the last page.")?;
            return Ok(Flow::Continue);
        }
        self.finish().await
    }

    /// Saves what is still unsynced, submits, signs the student out and leaves the console.
    async fn finish(&mut self) -> anyhow::Result<Flow> {
        self.flush_backlog().await;

        let receipt = match self.session.confirm_submit() {
            Ok(receipt) => receipt,
            Err(err) => {
                render::error(&mut self.out, err)?;
                return Ok(Flow::Continue);
            }
        };

        self.stop_countdown().await;
        self.store.clear();
        render::receipt(&mut self.out, &receipt)?;
        Ok(Flow::Exit)
    }

    async fn flush_backlog(&mut self) {
        let backlog = self.session.unsynced_answers();
        if backlog.is_empty() {
            return;
        }
        let credentials = match self.store.credentials() {
            Ok(credentials) => credentials.clone(),
            Err(err) => {
                tracing::warn!(error = %err, "Cannot flush answers without credentials");
                return;
            }
        };

        for outcome in answer_sync::flush(self.state.sink(), &credentials, backlog).await {
            self.session.apply_sync_outcome(&outcome);
        }

        let unsynced = self.session.unsynced_answers().len();
        if unsynced > 0 {
            tracing::warn!(unsynced, "Submitting with answers the server has not confirmed");
        }
    }

    fn save_in_background(&mut self, save: PendingSave) -> anyhow::Result<()> {
        let Some(credentials) = self.credentials()? else {
            return Ok(());
        };
        answer_sync::spawn_save(self.state.sink(), credentials, save, self.outcomes.clone());
        Ok(())
    }

    /// Current credentials, or `None` after reporting why they are unavailable.
    fn credentials(&mut self) -> anyhow::Result<Option<Credentials>> {
        match self.store.credentials() {
            Ok(credentials) => Ok(Some(credentials.clone())),
            Err(err) => {
                render::error(&mut self.out, err)?;
                Ok(None)
            }
        }
    }

    async fn stop_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.stop().await;
        }
    }
}
