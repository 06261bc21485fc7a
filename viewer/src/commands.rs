//! Stdin command parsing.

use georoute_core::{LatLng, SessionCommand, UserId};

/// One line of viewer input.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    /// Forwarded to the running session
    Session(SessionCommand),
    /// Print the node topology
    Nodes,
    Quit,
}

pub const HELP: &str = "commands: place <lat> <lng> | ping | clear | hover <user-id> | unhover | delete <user-id> | nodes | quit";

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ViewerCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_lowercase().as_str(), args.as_slice()) {
        ("place", [lat, lng]) => {
            let lat: f64 = lat.parse().map_err(|_| format!("invalid latitude: {lat}"))?;
            let lng: f64 = lng.parse().map_err(|_| format!("invalid longitude: {lng}"))?;
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(format!("coordinates out of range: {lat}, {lng}"));
            }
            ViewerCommand::Session(SessionCommand::PlaceUser(LatLng::new(lat, lng)))
        }
        ("ping", []) => ViewerCommand::Session(SessionCommand::PingAll),
        ("clear", []) => ViewerCommand::Session(SessionCommand::Clear),
        ("hover", [id]) => ViewerCommand::Session(SessionCommand::Hover(Some(UserId::new(*id)))),
        ("unhover", []) => ViewerCommand::Session(SessionCommand::Hover(None)),
        ("delete", [id]) => ViewerCommand::Session(SessionCommand::DeleteUser(UserId::new(*id))),
        ("nodes", []) => ViewerCommand::Nodes,
        ("quit" | "exit", []) => ViewerCommand::Quit,
        _ => return Err(format!("unrecognised input '{}'; {}", line.trim(), HELP)),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_place() {
        assert_eq!(
            parse("place 40.7 -74.0"),
            Ok(Some(ViewerCommand::Session(SessionCommand::PlaceUser(LatLng::new(40.7, -74.0)))))
        );
        assert!(parse("place 91 0").is_err());
        assert!(parse("place north 0").is_err());
        assert!(parse("place 1").is_err());
    }

    #[test]
    fn test_parse_simple_verbs() {
        assert_eq!(parse("ping"), Ok(Some(ViewerCommand::Session(SessionCommand::PingAll))));
        assert_eq!(parse("  CLEAR "), Ok(Some(ViewerCommand::Session(SessionCommand::Clear))));
        assert_eq!(parse("nodes"), Ok(Some(ViewerCommand::Nodes)));
        assert_eq!(parse("exit"), Ok(Some(ViewerCommand::Quit)));
        assert_eq!(parse(""), Ok(None));
    }

    #[test]
    fn test_parse_user_commands() {
        assert_eq!(
            parse("hover abc"),
            Ok(Some(ViewerCommand::Session(SessionCommand::Hover(Some(UserId::new("abc"))))))
        );
        assert_eq!(parse("unhover"), Ok(Some(ViewerCommand::Session(SessionCommand::Hover(None)))));
        assert_eq!(
            parse("delete abc"),
            Ok(Some(ViewerCommand::Session(SessionCommand::DeleteUser(UserId::new("abc")))))
        );
        assert!(parse("hover").is_err());
        assert!(parse("teleport").is_err());
    }
}
