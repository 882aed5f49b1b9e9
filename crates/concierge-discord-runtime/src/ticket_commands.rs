//! Prefix command parsing for plain channel messages.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketCommand {
    /// `<prefix>ticket panel`: re-publish the entry panel.
    PublishPanel,
}

/// Parses `content` as a prefixed command. Returns `None` for anything that is not a recognised
/// command, including unknown `ticket` subcommands.
pub fn parse_ticket_command(prefix: &str, content: &str) -> Option<TicketCommand> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return None;
    }
    let body = content.trim().strip_prefix(prefix)?;
    let mut tokens = body.split_whitespace();
    let command = tokens.next()?;
    if !command.eq_ignore_ascii_case("ticket") {
        return None;
    }
    let subcommand = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    subcommand
        .eq_ignore_ascii_case("panel")
        .then_some(TicketCommand::PublishPanel)
}

#[cfg(test)]
mod tests {
    use super::{parse_ticket_command, TicketCommand};

    #[test]
    fn unit_parse_ticket_panel_is_case_insensitive() {
        assert_eq!(
            parse_ticket_command("!", "!ticket panel"),
            Some(TicketCommand::PublishPanel)
        );
        assert_eq!(
            parse_ticket_command("!", "  !TICKET   Panel "),
            Some(TicketCommand::PublishPanel)
        );
        assert_eq!(
            parse_ticket_command("?", "?ticket panel"),
            Some(TicketCommand::PublishPanel)
        );
    }

    #[test]
    fn unit_parse_rejects_other_messages() {
        assert_eq!(parse_ticket_command("!", "ticket panel"), None);
        assert_eq!(parse_ticket_command("!", "!ticket"), None);
        assert_eq!(parse_ticket_command("!", "!ticket close"), None);
        assert_eq!(parse_ticket_command("!", "!ticket panel now"), None);
        assert_eq!(parse_ticket_command("!", "!help"), None);
        assert_eq!(parse_ticket_command("", "ticket panel"), None);
    }
}
