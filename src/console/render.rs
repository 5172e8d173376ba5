use std::io::{self, Write};

use super::commands::option_letter;
use crate::core::time::{format_offset, format_remaining};
use crate::session::{ExamSession, SubmissionReceipt, SubmitCause};

const RULE: &str = "------------------------------------------------------------";

pub(crate) fn intro(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "Computer-based test")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Instructions:")?;
    writeln!(out, "  * The timer starts as soon as you type `start` and cannot be paused.")?;
    writeln!(out, "  * Questions are grouped by subject; move freely between them.")?;
    writeln!(out, "  * Answers are saved as you select them. You can change an answer at any time.")?;
    writeln!(out, "  * Submit from the last page. When time runs out your answers are submitted.")?;
    writeln!(out)?;
    help(out)
}

pub(crate) fn help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  start                       load the exam and begin")?;
    writeln!(out, "  n | next, p | prev          move one page")?;
    writeln!(out, "  jump <subject#|@id> <q#>    go straight to a question")?;
    writeln!(out, "  <letter> | a [q#] <letter>  answer a question on this page")?;
    writeln!(out, "  palette                     answered/unanswered grid")?;
    writeln!(out, "  progress                    answered count and time left")?;
    writeln!(out, "  sync                        retry saving unsaved answers")?;
    writeln!(out, "  submit, confirm, cancel     finish the exam")?;
    writeln!(out, "  help, quit")?;
    Ok(())
}

pub(crate) fn header(out: &mut impl Write, session: &ExamSession) -> io::Result<()> {
    let Some(exam) = session.exam() else {
        return Ok(());
    };
    writeln!(out, "{RULE}")?;
    writeln!(out, "{}", exam.title)?;
    writeln!(
        out,
        "Duration: {} | Subjects: {} | Questions: {}",
        format_remaining(exam.duration_seconds),
        session.subjects().len(),
        session.total_questions()
    )?;
    writeln!(out, "{RULE}")
}

/// The current page: subject, question numbers, options with the selection marked, time and progress.
pub(crate) fn page(out: &mut impl Write, session: &ExamSession) -> io::Result<()> {
    let Some(subject) = session.current_subject() else {
        return writeln!(out, "No questions loaded.");
    };
    let position = session.position();
    let first_index = position.page * session.page_size();

    writeln!(out)?;
    writeln!(
        out,
        "[{}] Subject {}/{} | Time left {}",
        subject.title,
        position.subject + 1,
        session.subjects().len(),
        format_remaining(session.remaining_seconds())
    )?;

    let questions = session.current_questions();
    if questions.is_empty() {
        writeln!(out, "  (this subject has no questions)")?;
    }
    for (offset, question) in questions.iter().enumerate() {
        let selected = session.selected_option(&question.id);
        writeln!(
            out,
            "Question {} of {}: {}",
            first_index + offset + 1,
            subject.questions.len(),
            question.text
        )?;
        for (index, (key, text)) in question.options.iter().enumerate() {
            let marker = if selected == Some(key.as_str()) { '*' } else { ' ' };
            writeln!(out, "  {marker} {}. {text}", option_letter(index))?;
        }
    }

    let progress = session.progress();
    writeln!(
        out,
        "Answered {}/{} ({}%){}",
        progress.total_answered,
        progress.total_questions,
        progress.percent,
        if session.is_last_page() { " | last page: type `submit` to finish" } else { "" }
    )
}

pub(crate) fn palette(out: &mut impl Write, session: &ExamSession) -> io::Result<()> {
    let grid = session.question_palette();
    for (subject, cells) in session.subjects().iter().zip(grid) {
        write!(out, "{:>2}. {:<20}", subject_number(session, &subject.id), subject.title)?;
        for cell in cells {
            let label = cell.question_index + 1;
            match (cell.current, cell.answered) {
                (true, _) => write!(out, " [{label}]")?,
                (false, true) => write!(out, " {label}*")?,
                (false, false) => write!(out, " {label}")?,
            }
        }
        writeln!(out)?;
    }
    writeln!(out, "  * answered, [n] on screen")
}

fn subject_number(session: &ExamSession, subject_id: &str) -> usize {
    session.subjects().iter().position(|subject| subject.id == subject_id).map_or(0, |index| index + 1)
}

pub(crate) fn progress(out: &mut impl Write, session: &ExamSession) -> io::Result<()> {
    let overall = session.progress();
    writeln!(
        out,
        "Answered {}/{} ({}%) | Time left {} | Status: {}",
        overall.total_answered,
        overall.total_questions,
        overall.percent,
        format_remaining(session.remaining_seconds()),
        session.status()
    )?;
    for subject in session.subject_progress() {
        writeln!(out, "  {:<20} {}/{}", subject.title, subject.answered, subject.total)?;
    }
    let unsynced = session.unsynced_answers().len();
    if unsynced > 0 {
        writeln!(out, "  {unsynced} answer(s) not yet saved; type `sync` to retry")?;
    }
    Ok(())
}

pub(crate) fn confirm_prompt(out: &mut impl Write, session: &ExamSession) -> io::Result<()> {
    let progress = session.progress();
    writeln!(
        out,
        "You have answered {} of {} questions.",
        progress.total_answered, progress.total_questions
    )?;
    writeln!(out, "Type `confirm` to submit or `cancel` to go back.")
}

pub(crate) fn time_up(out: &mut impl Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Time is up. Your answers are being submitted.")
}

pub(crate) fn receipt(out: &mut impl Write, receipt: &SubmissionReceipt) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    let reason = match receipt.cause {
        SubmitCause::UserRequested => "submitted",
        SubmitCause::TimeExpired => "submitted automatically (time expired)",
    };
    writeln!(out, "{} {reason}.", if receipt.title.is_empty() { "Exam" } else { receipt.title.as_str() })?;
    writeln!(out, "Answered {} of {} questions.", receipt.answered, receipt.total_questions)?;
    if let Some(started_at) = receipt.started_at {
        writeln!(out, "Started:   {}", format_offset(started_at))?;
    }
    writeln!(out, "Submitted: {}", format_offset(receipt.submitted_at))?;
    writeln!(out, "You have been signed out. Thank you.")?;
    writeln!(out, "{RULE}")
}

pub(crate) fn notice(out: &mut impl Write, message: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "{message}")
}

pub(crate) fn error(out: &mut impl Write, message: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "! {message}")
}
