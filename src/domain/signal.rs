//! Turning entry/exit signals into a single action.
//!
//! The evaluator reports entry and exit independently; when both fire on
//! the same bar the consumer picks a winner with a `Precedence`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    #[default]
    ExitFirst,
    EntryFirst,
}

impl Precedence {
    pub fn resolve(&self, entry: bool, exit: bool) -> SignalAction {
        match (entry, exit) {
            (true, true) => match self {
                Precedence::ExitFirst => SignalAction::Exit,
                Precedence::EntryFirst => SignalAction::Enter,
            },
            (true, false) => SignalAction::Enter,
            (false, true) => SignalAction::Exit,
            (false, false) => SignalAction::Hold,
        }
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precedence::ExitFirst => f.write_str("exit_first"),
            Precedence::EntryFirst => f.write_str("entry_first"),
        }
    }
}

impl FromStr for Precedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "exit_first" | "exit" => Ok(Precedence::ExitFirst),
            "entry_first" | "entry" => Ok(Precedence::EntryFirst),
            other => Err(format!(
                "unknown precedence '{}', expected exit_first or entry_first",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Enter,
    Exit,
    Hold,
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Enter => f.write_str("ENTER"),
            SignalAction::Exit => f.write_str("EXIT"),
            SignalAction::Hold => f.write_str("HOLD"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_wins_by_default() {
        assert_eq!(Precedence::default().resolve(true, true), SignalAction::Exit);
        assert_eq!(Precedence::EntryFirst.resolve(true, true), SignalAction::Enter);
    }

    #[test]
    fn single_signals_are_unambiguous() {
        for p in [Precedence::ExitFirst, Precedence::EntryFirst] {
            assert_eq!(p.resolve(true, false), SignalAction::Enter);
            assert_eq!(p.resolve(false, true), SignalAction::Exit);
            assert_eq!(p.resolve(false, false), SignalAction::Hold);
        }
    }

    #[test]
    fn precedence_parsing() {
        assert_eq!("exit_first".parse(), Ok(Precedence::ExitFirst));
        assert_eq!("Entry-First".parse(), Ok(Precedence::EntryFirst));
        assert!("random".parse::<Precedence>().is_err());
    }
}
