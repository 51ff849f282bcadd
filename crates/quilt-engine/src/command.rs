//! Slash-command parsing for draft submissions.
//!
//! A submitted draft is either a literal message or a `/`-prefixed
//! command. Unrecognized commands are not errors: they degrade to a plain
//! message carrying the original text, so a typo never swallows input.

/// Result of parsing one submitted draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Empty draft: nothing to do, the draft stays untouched.
    Ignore,
    /// Send the text verbatim to the pane's conversation.
    Message(String),
    /// Open a new pane and deliver the text as its first message.
    NewPane(String),
}

/// Command metadata for the help overlay.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    /// Command name (without the /).
    pub name: &'static str,
    /// Usage line.
    pub usage: &'static str,
    /// Brief description for help.
    pub description: &'static str,
}

/// Static registry of all available commands.
pub static COMMANDS: &[CommandInfo] = &[CommandInfo {
    name: "newpane",
    usage: "/newpane <message>",
    description: "Open a new pane seeded with <message>",
}];

/// Parse a submitted draft into a message or command.
///
/// Command names are case-insensitive; the argument is the remainder of
/// the draft with runs of whitespace collapsed to single spaces. Leading
/// and trailing whitespace of a plain message is preserved.
///
/// # Examples
///
/// ```
/// use quilt_engine::command::{parse_submission, Submission};
///
/// assert_eq!(parse_submission(""), Submission::Ignore);
/// assert_eq!(
///     parse_submission("/newpane buy milk"),
///     Submission::NewPane("buy milk".into())
/// );
/// assert_eq!(
///     parse_submission("hello"),
///     Submission::Message("hello".into())
/// );
/// ```
pub fn parse_submission(draft: &str) -> Submission {
    if draft.is_empty() {
        return Submission::Ignore;
    }

    if !draft.starts_with('/') {
        return Submission::Message(draft.to_string());
    }

    // Split into command and argument on the first run of whitespace
    let mut words = draft.split_whitespace();
    let command = words.next().unwrap_or_default().to_lowercase();
    let argument = words.collect::<Vec<_>>().join(" ");

    match command.as_str() {
        "/newpane" if !argument.is_empty() => Submission::NewPane(argument),
        // Unknown command, or /newpane without an argument: send the
        // literal slash-text as an ordinary message
        _ => Submission::Message(draft.to_string()),
    }
}
