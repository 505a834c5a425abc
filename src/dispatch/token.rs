use super::catalog::{Arg, ArgKind, CommandDef, COMMANDS};
use super::command::Command;
use crate::shared::{ChatId, OrderId};
use chrono::NaiveDate;

pub const TOKEN_SEPARATOR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("unknown command `{token}`")]
    Unknown { token: String },
    #[error("`{name}` expects {expected} argument(s), got {actual}")]
    Arity {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid argument for `{name}`: {message}")]
    Argument { name: &'static str, message: String },
}

/// Resolves `token` against the registration table and builds the typed
/// command. The longest registered name that prefixes the token on a
/// separator boundary wins.
pub fn decode(token: &str) -> Result<(&'static CommandDef, Command), TokenError> {
    let token = token.trim();
    let def = resolve(token).ok_or_else(|| TokenError::Unknown {
        token: token.to_string(),
    })?;
    let rest = token[def.name.len()..].trim_start_matches(TOKEN_SEPARATOR);
    let args = split_args(def, rest)?;
    let command = (def.build)(&args).map_err(|message| TokenError::Argument {
        name: def.name,
        message,
    })?;
    Ok((def, command))
}

fn resolve(token: &str) -> Option<&'static CommandDef> {
    COMMANDS
        .iter()
        .filter(|def| {
            token == def.name
                || token
                    .strip_prefix(def.name)
                    .is_some_and(|rest| rest.starts_with(TOKEN_SEPARATOR))
        })
        .max_by_key(|def| def.name.len())
}

fn split_args(def: &'static CommandDef, rest: &str) -> Result<Vec<Arg>, TokenError> {
    let parts: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(TOKEN_SEPARATOR).collect()
    };
    let arity = TokenError::Arity {
        name: def.name,
        expected: def.args.len(),
        actual: parts.len(),
    };

    let has_text = def.args.contains(&ArgKind::Text);
    if parts.len() < def.args.len() || (!has_text && parts.len() > def.args.len()) {
        return Err(arity);
    }

    // A text argument absorbs any extra separator-joined parts.
    let extra = parts.len() - def.args.len();
    let mut args = Vec::with_capacity(def.args.len());
    let mut cursor = 0;
    for kind in def.args {
        let raw = if *kind == ArgKind::Text {
            let joined = parts[cursor..=cursor + extra].join("_");
            cursor += extra + 1;
            joined
        } else {
            let raw = parts[cursor].to_string();
            cursor += 1;
            raw
        };
        args.push(parse_arg(def.name, *kind, &raw)?);
    }
    Ok(args)
}

fn parse_arg(name: &'static str, kind: ArgKind, raw: &str) -> Result<Arg, TokenError> {
    let invalid = |message: String| TokenError::Argument { name, message };
    match kind {
        ArgKind::OrderId => OrderId::parse_persisted(raw)
            .map(Arg::Order)
            .map_err(invalid),
        ArgKind::ChatId => ChatId::parse(raw).map(Arg::Chat).map_err(invalid),
        ArgKind::Number => raw
            .parse::<u32>()
            .map(Arg::Number)
            .map_err(|_| invalid(format!("expected a number, got `{raw}`"))),
        ArgKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Arg::Date)
            .map_err(|_| invalid(format!("expected YYYY-MM-DD, got `{raw}`"))),
        ArgKind::Text if raw.is_empty() => Err(invalid("expected text".to_string())),
        ArgKind::Text => Ok(Arg::Text(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::catalog::names;
    use crate::orders::{EditableField, OrderStatus, PaymentPreference, Subcategory};

    fn sample_args(def: &CommandDef) -> Vec<String> {
        def.args
            .iter()
            .map(|kind| match (def.name, kind) {
                (names::BACK_TO, ArgKind::Text) => "date".to_string(),
                (names::CATEGORY, ArgKind::Text) => "waste_removal".to_string(),
                (names::SUBCATEGORY, ArgKind::Text) => "other_waste".to_string(),
                (names::SELECT_TIME, ArgKind::Text) => "14:30".to_string(),
                (names::EDIT_FIELD, ArgKind::Text) => "phone".to_string(),
                (names::ORDERS_BY_STATUS, ArgKind::Text) => "awaiting_cost".to_string(),
                (_, ArgKind::Text) => panic!("no sample text for {}", def.name),
                (_, ArgKind::OrderId) => "12".to_string(),
                (_, ArgKind::ChatId) => "3400".to_string(),
                (_, ArgKind::Number) => "2".to_string(),
                (_, ArgKind::Date) => "2030-01-02".to_string(),
            })
            .collect()
    }

    #[test]
    fn every_registered_command_decodes_back_to_itself() {
        for def in COMMANDS {
            let mut token = def.name.to_string();
            for arg in sample_args(def) {
                token.push('_');
                token.push_str(&arg);
            }
            let (resolved, command) =
                decode(&token).unwrap_or_else(|err| panic!("{token}: {err}"));
            assert_eq!(resolved.name, def.name, "token {token}");
            assert_eq!(command.name(), def.name, "token {token}");
        }
    }

    #[test]
    fn longest_registered_prefix_wins() {
        let (_, command) = decode("cancel_order_operator_7").expect("decode");
        assert_eq!(command, Command::CancelOrderOperator(OrderId::new(7)));
        let (_, command) = decode("select_date_asap").expect("decode");
        assert_eq!(command, Command::SelectDateAsap);
        let (_, command) = decode("cancel_flow_confirmed").expect("decode");
        assert_eq!(command, Command::CancelFlowConfirmed);
    }

    #[test]
    fn text_argument_absorbs_underscores() {
        let (_, command) = decode("orders_by_status_awaiting_confirmation_3").expect("decode");
        assert_eq!(
            command,
            Command::OrdersByStatus {
                status: OrderStatus::AwaitingConfirmation,
                page: 3
            }
        );
        let (_, command) = decode("subcategory_other_demolition").expect("decode");
        assert_eq!(command, Command::Subcategory(Subcategory::OtherDemolition));
        let (_, command) = decode("edit_field_subcategory_5").expect("decode");
        assert_eq!(
            command,
            Command::EditField {
                field: EditableField::Category,
                order_id: OrderId::new(5)
            }
        );
        let (_, command) = decode("payment_now").expect("decode");
        assert_eq!(command, Command::Payment(PaymentPreference::Now));
    }

    #[test]
    fn unknown_and_malformed_tokens_are_rejected() {
        assert!(matches!(
            decode("teleport_5"),
            Err(TokenError::Unknown { .. })
        ));
        assert!(matches!(decode("newx_order"), Err(TokenError::Unknown { .. })));
        assert!(matches!(
            decode("view_order"),
            Err(TokenError::Arity { expected: 1, actual: 0, .. })
        ));
        assert!(matches!(
            decode("view_order_1_2"),
            Err(TokenError::Arity { .. })
        ));
        assert!(matches!(
            decode("view_order_abc"),
            Err(TokenError::Argument { .. })
        ));
        assert!(matches!(
            decode("view_order_0"),
            Err(TokenError::Argument { .. })
        ));
        assert!(matches!(
            decode("select_hour_25"),
            Err(TokenError::Argument { .. })
        ));
        assert!(matches!(
            decode("category_spaceships"),
            Err(TokenError::Argument { .. })
        ));
    }
}
