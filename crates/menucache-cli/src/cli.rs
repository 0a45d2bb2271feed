//! Command-line argument parsing.

use anyhow::{anyhow, bail, Result};

pub const USAGE: &str = "\
Usage: menucache <command> [options]

Commands:
  login [email]                Sign in and remember the business
  logout                       Forget the session and stored password
  status                       Show the current session and settings
  menu [--category <id>]       Hydrate and print menu categories
  campaigns [--category <id>]  Hydrate and print campaign categories
  help                         Show this message

Environment:
  MENUCACHE_API_URL, MENUCACHE_PAGE_SIZE, MENUCACHE_BULK_DELAY_MS, RUST_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: Option<String> },
    Logout,
    Status,
    Menu { category: Option<String> },
    Campaigns { category: Option<String> },
    Help,
}

impl Command {
    /// Parse the arguments after the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        match name.as_str() {
            "login" => {
                if rest.len() > 1 {
                    bail!("login takes at most one argument");
                }
                Ok(Command::Login {
                    email: rest.first().cloned(),
                })
            }
            "logout" => no_args(rest, Command::Logout),
            "status" => no_args(rest, Command::Status),
            "menu" => Ok(Command::Menu {
                category: parse_category(rest)?,
            }),
            "campaigns" => Ok(Command::Campaigns {
                category: parse_category(rest)?,
            }),
            "help" | "--help" | "-h" => Ok(Command::Help),
            other => Err(anyhow!("Unknown command: {}", other)),
        }
    }
}

fn no_args(rest: &[String], command: Command) -> Result<Command> {
    if let Some(extra) = rest.first() {
        bail!("Unexpected argument: {}", extra);
    }
    Ok(command)
}

fn parse_category(rest: &[String]) -> Result<Option<String>> {
    match rest {
        [] => Ok(None),
        [flag, id] if flag == "--category" || flag == "-c" => Ok(Some(id.clone())),
        [flag] if flag == "--category" || flag == "-c" => Err(anyhow!("--category needs an id")),
        [other, ..] => Err(anyhow!("Unexpected argument: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args_shows_help() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn test_login_with_and_without_email() {
        assert_eq!(
            Command::parse(&args(&["login"])).unwrap(),
            Command::Login { email: None }
        );
        assert_eq!(
            Command::parse(&args(&["login", "owner@trattoria.test"])).unwrap(),
            Command::Login {
                email: Some("owner@trattoria.test".to_string())
            }
        );
        assert!(Command::parse(&args(&["login", "a", "b"])).is_err());
    }

    #[test]
    fn test_browse_commands_take_category() {
        assert_eq!(
            Command::parse(&args(&["menu"])).unwrap(),
            Command::Menu { category: None }
        );
        assert_eq!(
            Command::parse(&args(&["campaigns", "--category", "promo"])).unwrap(),
            Command::Campaigns {
                category: Some("promo".to_string())
            }
        );
        assert_eq!(
            Command::parse(&args(&["menu", "-c", "drinks"])).unwrap(),
            Command::Menu {
                category: Some("drinks".to_string())
            }
        );
        assert!(Command::parse(&args(&["menu", "--category"])).is_err());
        assert!(Command::parse(&args(&["menu", "drinks"])).is_err());
    }

    #[test]
    fn test_unknown_and_extra_arguments() {
        assert!(Command::parse(&args(&["orders"])).is_err());
        assert!(Command::parse(&args(&["status", "now"])).is_err());
        assert_eq!(
            Command::parse(&args(&["--help"])).unwrap(),
            Command::Help
        );
    }
}
