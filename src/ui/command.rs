use std::path::PathBuf;
use thiserror::Error;

use crate::domain::ChatSession;

pub const HELP: &str = "\
Commands:
  /new               start a new chat
  /chats             list chats
  /open <n|id>       switch to a chat
  /rename <title>    rename the current chat
  /delete [n|id]     delete a chat (the current one by default)
  /image <path>      attach an image and ask for a description
  /signout           sign out
  /help              show this help
  /quit              exit
Anything else is sent to the model.";

/// A chat picked by its position in `/chats` (1-based) or by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    Index(usize),
    Id(String),
}

impl SessionRef {
    fn parse(arg: &str) -> Self {
        match arg.parse::<usize>() {
            Ok(n) if n > 0 => SessionRef::Index(n),
            _ => SessionRef::Id(arg.to_string()),
        }
    }

    pub fn resolve<'a>(&self, sessions: &'a [ChatSession]) -> Option<&'a ChatSession> {
        match self {
            SessionRef::Index(n) => n.checked_sub(1).and_then(|i| sessions.get(i)),
            SessionRef::Id(id) => sessions.iter().find(|s| &s.id == id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    Chats,
    Open(SessionRef),
    Rename(String),
    Delete(Option<SessionRef>),
    Image(PathBuf),
    SignOut,
    Help,
    Quit,
    Send(String),
    Empty,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Usage: {0}")]
    MissingArgument(&'static str),

    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Send(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "new" => Ok(Command::New),
        "chats" | "ls" => Ok(Command::Chats),
        "open" if arg.is_empty() => Err(CommandError::MissingArgument("/open <n|id>")),
        "open" => Ok(Command::Open(SessionRef::parse(arg))),
        "rename" if arg.is_empty() => Err(CommandError::MissingArgument("/rename <title>")),
        "rename" => Ok(Command::Rename(arg.to_string())),
        "delete" | "rm" if arg.is_empty() => Ok(Command::Delete(None)),
        "delete" | "rm" => Ok(Command::Delete(Some(SessionRef::parse(arg)))),
        "image" | "img" if arg.is_empty() => Err(CommandError::MissingArgument("/image <path>")),
        "image" | "img" => Ok(Command::Image(PathBuf::from(arg))),
        "signout" | "logout" => Ok(Command::SignOut),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}
