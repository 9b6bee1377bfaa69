//! Parsing of `cmd` envelopes.

use crate::error::CommandError;

/// A tokenized command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Deal a three-player game.
    Start,
    /// Deal a four-player game with two decks.
    Start4,
    List,
    /// Ratings of the named players, or of the issuer when empty.
    Rating(Vec<String>),
    /// Hand sizes of the named players, or of the issuer when empty.
    Remain(Vec<String>),
    ToggleSpectator,
    Undo,
    BecomeLandlord,
    Help,
}

pub const HELP: &str = "\
start              deal a 3-player game
start4             deal a 4-player game (two decks)
become_landlord    claim the reserve and play first
undo               take back your last play
list               show everyone at the table
rating [names...]  show ratings
remain [names...]  show how many cards are left
toggle_spectator   opt in or out of being dealt
help               show this message";

impl Command {
    /// Splits `line` on whitespace and recognises the first token.
    ///
    /// An empty line yields `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut tokens = line.split_whitespace();
        let Some(head) = tokens.next() else {
            return Ok(None);
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let command = match head {
            "start" => Command::Start,
            "start4" => Command::Start4,
            "list" => Command::List,
            "rating" => Command::Rating(args),
            "remain" => Command::Remain(args),
            "toggle_spectator" => Command::ToggleSpectator,
            "undo" => Command::Undo,
            "become_landlord" => Command::BecomeLandlord,
            "help" => Command::Help,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("start"), Ok(Some(Command::Start)));
        assert_eq!(Command::parse("  start4 "), Ok(Some(Command::Start4)));
        assert_eq!(
            Command::parse("rating alice  bob"),
            Ok(Some(Command::Rating(vec!["alice".into(), "bob".into()])))
        );
        assert_eq!(Command::parse("remain"), Ok(Some(Command::Remain(vec![]))));
        assert_eq!(Command::parse("become_landlord"), Ok(Some(Command::BecomeLandlord)));
    }

    #[test]
    fn test_empty_line_is_ignored() {
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        assert_eq!(
            Command::parse("shuffle now"),
            Err(CommandError::Unknown("shuffle".into()))
        );
    }
}
