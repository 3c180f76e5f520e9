use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A parsed request line. Names are single whitespace-free tokens, and so is
/// the data of an `append`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mkdir(String),
    Cd(String),
    Home,
    Rmdir(String),
    Ls,
    Create(String),
    Append(String, String),
    Cat(String),
    Head(String, u32),
    Rm(String),
    Stat(String),
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command line")]
    Empty,
    #[error("{0} is not a command")]
    UnknownCommand(String),
    #[error("{0} has improper number of arguments")]
    Arity(String),
    #[error("{0} is not a valid number of bytes")]
    InvalidCount(String),
    #[error("{0:?} is not a valid file name")]
    InvalidName(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, ParseError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, args) = match tokens.split_first() {
            Some((name, args)) => (*name, args),
            None => return Err(ParseError::Empty),
        };

        let expected = match name {
            "ls" | "home" | "quit" => 0,
            "mkdir" | "cd" | "rmdir" | "create" | "cat" | "rm" | "stat" => 1,
            "append" | "head" => 2,
            _ => return Err(ParseError::UnknownCommand(name.to_string())),
        };
        if args.len() != expected {
            return Err(ParseError::Arity(name.to_string()));
        }

        let arg = |i: usize| args[i].to_string();
        if let Some(target) = args.first() {
            if target.contains('\0') {
                return Err(ParseError::InvalidName(arg(0)));
            }
        }
        let command = match name {
            "ls" => Command::Ls,
            "home" => Command::Home,
            "quit" => Command::Quit,
            "mkdir" => Command::Mkdir(arg(0)),
            "cd" => Command::Cd(arg(0)),
            "rmdir" => Command::Rmdir(arg(0)),
            "create" => Command::Create(arg(0)),
            "cat" => Command::Cat(arg(0)),
            "rm" => Command::Rm(arg(0)),
            "stat" => Command::Stat(arg(0)),
            "append" => Command::Append(arg(0), arg(1)),
            "head" => {
                let count = args[1]
                    .parse::<u32>()
                    .map_err(|_| ParseError::InvalidCount(arg(1)))?;
                Command::Head(arg(0), count)
            }
            _ => return Err(ParseError::UnknownCommand(name.to_string())),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Mkdir(_) => "mkdir",
            Command::Cd(_) => "cd",
            Command::Home => "home",
            Command::Rmdir(_) => "rmdir",
            Command::Ls => "ls",
            Command::Create(_) => "create",
            Command::Append(..) => "append",
            Command::Cat(_) => "cat",
            Command::Head(..) => "head",
            Command::Rm(_) => "rm",
            Command::Stat(_) => "stat",
            Command::Quit => "quit",
        }
    }

    /// The request as sent on the wire, terminator included.
    pub fn to_line(&self) -> String {
        format!("{}\r\n", self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        match self {
            Command::Home | Command::Ls | Command::Quit => Ok(()),
            Command::Mkdir(name)
            | Command::Cd(name)
            | Command::Rmdir(name)
            | Command::Create(name)
            | Command::Cat(name)
            | Command::Rm(name)
            | Command::Stat(name) => write!(f, " {}", name),
            Command::Append(name, data) => write!(f, " {} {}", name, data),
            Command::Head(name, count) => write!(f, " {} {}", name, count),
        }
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}
