//! Command-line parsing.

use thiserror::Error;

pub const USAGE: &str = "usage: rowkeep [--config PATH] <command>

commands:
  add <login>           insert a user and print it with its new id
  list                  print every user
  get <id>              print one user (id 0 and empty login if absent)
  update <id> <login>   change a user's login
  delete <id>           remove a user";

/// A CRUD request read from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { login: String },
    List,
    Get { id: i64 },
    Update { id: i64, login: String },
    Delete { id: i64 },
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Value of `--config`, if given.
    pub config_path: Option<String>,
    pub command: Command,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("no command given")]
    MissingCommand,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

impl Invocation {
    /// Parses arguments, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter().peekable();

        let mut config_path = None;
        if args.peek().map(String::as_str) == Some("--config") {
            args.next();
            config_path = Some(args.next().ok_or(UsageError::MissingArgument("config path"))?);
        }

        let name = args.next().ok_or(UsageError::MissingCommand)?;
        let command = match name.as_str() {
            "add" => Command::Add {
                login: required(&mut args, "login")?,
            },
            "list" => Command::List,
            "get" => Command::Get {
                id: parse_id(required(&mut args, "id")?)?,
            },
            "update" => Command::Update {
                id: parse_id(required(&mut args, "id")?)?,
                login: required(&mut args, "login")?,
            },
            "delete" => Command::Delete {
                id: parse_id(required(&mut args, "id")?)?,
            },
            _ => return Err(UsageError::UnknownCommand(name)),
        };

        if let Some(extra) = args.next() {
            return Err(UsageError::UnexpectedArgument(extra));
        }

        Ok(Self {
            config_path,
            command,
        })
    }
}

fn required(
    args: &mut impl Iterator<Item = String>,
    name: &'static str,
) -> Result<String, UsageError> {
    args.next().ok_or(UsageError::MissingArgument(name))
}

fn parse_id(raw: String) -> Result<i64, UsageError> {
    raw.parse().map_err(|_| UsageError::InvalidId(raw))
}
