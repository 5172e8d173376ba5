use thiserror::Error;

/// How a `jump` names its subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SubjectRef {
    /// 1-based position in the subject list.
    Number(usize),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Start,
    Next,
    Previous,
    /// `question` is 1-based.
    Jump { subject: SubjectRef, question: usize },
    /// `slot` is the 1-based question on the current page; `choice` is a letter or an option key.
    Answer { slot: usize, choice: String },
    Palette,
    Progress,
    Sync,
    Submit,
    Confirm,
    Cancel,
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum CommandError {
    #[error("unknown command `{0}`; type `help` for the list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

const JUMP_USAGE: &str = "jump <subject# | @subjectId> <question#>";
const ANSWER_USAGE: &str = "a [question#] <option letter>";

pub(crate) fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::Empty);
    };
    let rest: Vec<&str> = words.collect();
    let head = head.to_ascii_lowercase();

    let command = match (head.as_str(), rest.as_slice()) {
        ("start" | "begin", []) => Command::Start,
        ("n" | "next", []) => Command::Next,
        ("p" | "prev" | "previous", []) => Command::Previous,
        ("palette" | "grid", []) => Command::Palette,
        ("progress" | "status", []) => Command::Progress,
        ("sync", []) => Command::Sync,
        ("submit", []) => Command::Submit,
        ("confirm" | "yes" | "y", []) => Command::Confirm,
        ("cancel" | "no", []) => Command::Cancel,
        ("h" | "help" | "?", []) => Command::Help,
        ("q" | "quit" | "exit", []) => Command::Quit,
        ("jump" | "j", [subject, question]) => Command::Jump {
            subject: parse_subject(subject)?,
            question: parse_ordinal(question, JUMP_USAGE)?,
        },
        ("jump" | "j", _) => return Err(CommandError::Usage(JUMP_USAGE)),
        ("a", []) => Command::Answer { slot: 1, choice: "a".to_string() },
        ("a" | "answer", [choice]) => Command::Answer { slot: 1, choice: choice.to_string() },
        ("a" | "answer", [slot, choice]) => Command::Answer {
            slot: parse_ordinal(slot, ANSWER_USAGE)?,
            choice: choice.to_string(),
        },
        ("a" | "answer", _) => return Err(CommandError::Usage(ANSWER_USAGE)),
        (letter, []) if is_option_letter(letter) => {
            Command::Answer { slot: 1, choice: letter.to_string() }
        }
        _ => return Err(CommandError::Unknown(line.trim().to_string())),
    };
    Ok(command)
}

fn is_option_letter(word: &str) -> bool {
    let mut chars = word.chars();
    matches!((chars.next(), chars.next()), (Some(letter), None) if letter.is_ascii_alphabetic())
}

fn parse_subject(raw: &str) -> Result<SubjectRef, CommandError> {
    if let Some(id) = raw.strip_prefix('@') {
        if id.is_empty() {
            return Err(CommandError::Usage(JUMP_USAGE));
        }
        return Ok(SubjectRef::Id(id.to_string()));
    }
    match raw.parse::<usize>() {
        Ok(number) if number > 0 => Ok(SubjectRef::Number(number)),
        Ok(_) => Err(CommandError::Usage(JUMP_USAGE)),
        Err(_) => Ok(SubjectRef::Id(raw.to_string())),
    }
}

fn parse_ordinal(raw: &str, usage: &'static str) -> Result<usize, CommandError> {
    match raw.parse::<usize>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(CommandError::Usage(usage)),
    }
}

/// Maps `b`/`B` to index 1; anything longer than one letter is not a letter choice.
pub(crate) fn letter_index(choice: &str) -> Option<usize> {
    let mut chars = choice.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => {
            Some(usize::from(letter.to_ascii_lowercase() as u8 - b'a'))
        }
        _ => None,
    }
}

pub(crate) fn option_letter(index: usize) -> char {
    u8::try_from(index).ok().filter(|value| *value < 26).map_or('?', |value| char::from(b'A' + value))
}
