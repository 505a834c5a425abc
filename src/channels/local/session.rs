use crate::channels::{ButtonAction, Inbound, InboundKind, Screen};
use crate::orders::{MediaItem, MediaKind};
use crate::shared::{ChatId, MessageId};

pub const CHAT_EXIT_COMMANDS: &[&str] = &["/exit", "exit", "quit"];

pub fn is_chat_exit_command(line: &str) -> bool {
    CHAT_EXIT_COMMANDS
        .iter()
        .any(|command| line.trim().eq_ignore_ascii_case(command))
}

/// Reads one line typed into the local chat.
///
/// `:token` presses a button on the current screen, `@lat,lon` shares a
/// location, `+photo <file_id>` / `+video <file_id>` attach media and
/// `/start` opens the main menu. Anything else is plain text.
pub fn parse_chat_line(
    chat: ChatId,
    line: &str,
    current: Option<MessageId>,
) -> Result<Option<Inbound>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let kind = if line == "/start" {
        InboundKind::Start
    } else if let Some(token) = line.strip_prefix(':') {
        InboundKind::Token {
            token: token.trim().to_string(),
            message: current,
        }
    } else if let Some(coordinates) = line.strip_prefix('@') {
        let (latitude, longitude) = coordinates
            .split_once(',')
            .ok_or_else(|| format!("location must look like `@lat,lon`, got `{line}`"))?;
        InboundKind::Location {
            latitude: parse_coordinate(latitude)?,
            longitude: parse_coordinate(longitude)?,
        }
    } else if let Some(rest) = line.strip_prefix('+') {
        let (kind, file_id) = rest
            .split_once(' ')
            .ok_or_else(|| format!("media must look like `+photo <file_id>`, got `{line}`"))?;
        let kind = match kind {
            "photo" => MediaKind::Photo,
            "video" => MediaKind::Video,
            other => return Err(format!("unknown media kind `{other}`")),
        };
        InboundKind::Media(MediaItem {
            kind,
            file_id: file_id.trim().to_string(),
            group_id: None,
        })
    } else {
        InboundKind::Text(line.to_string())
    };
    Ok(Some(Inbound {
        chat,
        first_name: None,
        kind,
    }))
}

fn parse_coordinate(raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid coordinate `{}`", raw.trim()))
}

/// Plain-text rendering of a screen: the text, then one line per keyboard
/// row listing what to type for each button.
pub fn render_screen(screen: &Screen) -> String {
    let mut lines = vec![screen.text.clone()];
    for row in &screen.keyboard {
        let buttons: Vec<String> = row
            .iter()
            .map(|button| match &button.action {
                ButtonAction::Token(token) => format!("[{}] :{token}", button.label),
                ButtonAction::Url(url) => format!("[{}] {url}", button.label),
            })
            .collect();
        lines.push(buttons.join("   "));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Button;

    #[test]
    fn exit_commands_are_case_insensitive() {
        assert!(is_chat_exit_command("QUIT"));
        assert!(is_chat_exit_command(" /exit "));
        assert!(!is_chat_exit_command("exit now"));
    }

    #[test]
    fn lines_map_to_inbound_kinds() {
        let chat = ChatId::new(1);
        let current = Some(MessageId::new(4));
        let token = parse_chat_line(chat, ":new_order", current)
            .expect("parse")
            .expect("inbound");
        assert_eq!(
            token.kind,
            InboundKind::Token {
                token: "new_order".to_string(),
                message: current,
            }
        );
        let location = parse_chat_line(chat, "@55.7,37.6", None)
            .expect("parse")
            .expect("inbound");
        assert_eq!(
            location.kind,
            InboundKind::Location {
                latitude: 55.7,
                longitude: 37.6
            }
        );
        let text = parse_chat_line(chat, "Lenina 1", None)
            .expect("parse")
            .expect("inbound");
        assert_eq!(text.kind, InboundKind::Text("Lenina 1".to_string()));
        assert!(parse_chat_line(chat, "   ", None).expect("parse").is_none());
        assert!(parse_chat_line(chat, "@north", None).is_err());
        assert!(parse_chat_line(chat, "+gif abc", None).is_err());
    }

    #[test]
    fn rendering_lists_button_tokens() {
        let screen = Screen::new("Menu").row(vec![
            Button::token("New order", "new_order"),
            Button::token("My orders", "my_orders_0"),
        ]);
        assert_eq!(
            render_screen(&screen),
            "Menu\n[New order] :new_order   [My orders] :my_orders_0"
        );
    }
}
