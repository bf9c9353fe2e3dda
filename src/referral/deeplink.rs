//! Parsing and formatting of the `inviter_<id>` start parameter.

/// Prefix carried by referral deep links in the /start payload.
pub const INVITER_PREFIX: &str = "inviter_";

/// Extract the inviter id from a /start argument.
///
/// Returns `None` for anything that is not `inviter_<numeric id>`.
pub fn parse_start_param(arg: &str) -> Option<i64> {
    let suffix = arg.strip_prefix(INVITER_PREFIX)?;
    suffix.parse::<i64>().ok()
}

/// The deep link handed out to a user: opening it sends the bot
/// `/start inviter_<user_id>` from the new member's account.
pub fn referral_deep_link(bot_username: &str, user_id: i64) -> String {
    format!("https://t.me/{bot_username}?start={INVITER_PREFIX}{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_valid_param() {
        assert_eq!(parse_start_param("inviter_12345"), Some(12345));
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        assert_eq!(parse_start_param("foo_123"), None);
        assert_eq!(parse_start_param("invitee_123"), None);
    }

    #[test]
    fn test_rejects_non_numeric_suffix() {
        assert_eq!(parse_start_param("inviter_abc"), None);
        assert_eq!(parse_start_param("inviter_"), None);
        assert_eq!(parse_start_param("inviter_12a"), None);
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(parse_start_param(""), None);
    }

    #[test]
    fn test_deep_link_round_trips() {
        let link = referral_deep_link("davat_bot", 98765);
        assert_eq!(link, "https://t.me/davat_bot?start=inviter_98765");
        let param = link.split("?start=").nth(1).unwrap();
        assert_eq!(parse_start_param(param), Some(98765));
    }
}
