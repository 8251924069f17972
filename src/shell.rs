//! Line-oriented user commands for the headless shell, and message rendering.

use crate::state::conversation::{Feedback, Message, MessageAuthor};
use crate::state::models::Role;
use crate::state::panels::Panel;
use std::path::PathBuf;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Plain chat text.
    Message(String),
    TogglePanel(Panel),
    ChangeRole { role: Role, model: String },
    Pull(String),
    Attach(PathBuf),
    Open(String),
    Run,
    Save,
    ToggleTheme,
    Feedback { message_id: String, feedback: Feedback },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseCommandError {
    #[error("unknown command `/{0}`")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown panel `{0}`")]
    UnknownPanel(String),
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    #[error("feedback must be `good` or `bad`, got `{0}`")]
    UnknownFeedback(String),
}

impl ShellCommand {
    /// Parse one input line. Lines not starting with `/` are chat messages.
    pub fn parse(line: &str) -> Result<Self, ParseCommandError> {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Self::Message(line.trim_end_matches(['\r', '\n']).to_owned()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match name.to_ascii_lowercase().as_str() {
            "toggle" => {
                let raw = required(args, "/toggle <sidebar|code|logs|canvas|board>")?;
                Panel::parse(raw)
                    .map(Self::TogglePanel)
                    .ok_or_else(|| ParseCommandError::UnknownPanel(raw.to_owned()))
            }
            "role" => {
                let (raw_role, model) = args
                    .split_once(char::is_whitespace)
                    .map(|(r, m)| (r, m.trim()))
                    .filter(|(_, m)| !m.is_empty())
                    .ok_or(ParseCommandError::Usage("/role <ROLE> <model>"))?;
                let role = Role::parse(raw_role)
                    .ok_or_else(|| ParseCommandError::UnknownRole(raw_role.to_owned()))?;
                Ok(Self::ChangeRole {
                    role,
                    model: model.to_owned(),
                })
            }
            "pull" => Ok(Self::Pull(required(args, "/pull <model>")?.to_owned())),
            "attach" => Ok(Self::Attach(PathBuf::from(required(args, "/attach <path>")?))),
            "open" => Ok(Self::Open(required(args, "/open <path>")?.to_owned())),
            "run" => Ok(Self::Run),
            "save" => Ok(Self::Save),
            "theme" => Ok(Self::ToggleTheme),
            "feedback" => {
                let (id, raw) = args
                    .split_once(char::is_whitespace)
                    .ok_or(ParseCommandError::Usage("/feedback <message-id> good|bad"))?;
                let feedback = Feedback::parse(raw)
                    .ok_or_else(|| ParseCommandError::UnknownFeedback(raw.trim().to_owned()))?;
                Ok(Self::Feedback {
                    message_id: id.to_owned(),
                    feedback,
                })
            }
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseCommandError::UnknownCommand(other.to_owned())),
        }
    }
}

fn required<'a>(args: &'a str, usage: &'static str) -> Result<&'a str, ParseCommandError> {
    if args.is_empty() {
        Err(ParseCommandError::Usage(usage))
    } else {
        Ok(args)
    }
}

/// Render a message as printable lines.
#[must_use]
pub fn render_message(message: &Message) -> String {
    let label = match message.author {
        MessageAuthor::User => "you",
        MessageAuthor::Agent => "agent",
        MessageAuthor::System => "system",
    };
    let mut out = format!("[{label}] {}", message.content);
    for attachment in &message.attachments {
        out.push_str(&format!(
            "\n  + {} ({} bytes, {})",
            attachment.name, attachment.size, attachment.mime_type
        ));
    }
    out
}
