//! Module shared by the components.
//!
//! Contains the persistence layer and a few helper functions.

pub mod data;
pub use data::Data;

use lazy_static::lazy_static;
use regex::Regex;
use serenity::client::Context;
use serenity::model::guild::Member;
use ticketio_core::{ApplicationCommandEmbed, message};
use crate::log_error;

#[inline]
pub fn user_fullname(user: &serenity::model::user::User) -> String {
    format!("{}#{:0>4}", user.name, user.discriminator)
}

lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(
        r"(?i)^(?:http|ftp)s?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$"
    ).unwrap();
}

/// Check whether a string looks like an http/ftp URL.
pub fn is_valid_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

/// Parse a channel reference as typed in a text input: a raw id or a `<#id>` mention.
pub fn parse_channel_ref(input: &str) -> Option<u64> {
    let input = input.trim();
    let input = input.strip_prefix("<#").and_then(|s| s.strip_suffix('>')).unwrap_or(input);
    input.parse::<u64>().ok()
}

/// True when the member carries the administrator permission.
///
/// Members attached to an interaction carry their computed permissions.
pub fn member_is_admin(member: Option<&Member>) -> bool {
    member.and_then(|m| m.permissions).map(|p| p.administrator()).unwrap_or(false)
}

/// True when the member holds one of the configured staff roles.
pub fn member_is_staff(member: &Member, staff_role_ids: &[u64]) -> bool {
    member.roles.iter().any(|role| staff_role_ids.contains(&role.0))
}

/// Report an error to the command invoker and to the log.
pub async fn send_error<D: std::fmt::Display>(ctx: &Context, app_cmd: ApplicationCommandEmbed<'_>, error: D) {
    log_error!("{}", error);
    if let Err(e) = app_cmd.direct_response(ctx, message::error(error).set_ephemeral(true)).await {
        log_error!("Error while sending the response: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation() {
        assert!(is_valid_url("https://discord.gg/abcdef"));
        assert!(is_valid_url("http://localhost:8080/path"));
        assert!(is_valid_url("https://192.168.0.1/"));
        assert!(!is_valid_url("discord.gg/abcdef"));
        assert!(!is_valid_url("not a link"));
        assert!(!is_valid_url("ssh://example.com"));
    }

    #[test]
    fn channel_refs() {
        assert_eq!(parse_channel_ref("123456789"), Some(123456789));
        assert_eq!(parse_channel_ref("<#123456789>"), Some(123456789));
        assert_eq!(parse_channel_ref("  <#42>  "), Some(42));
        assert_eq!(parse_channel_ref("#general"), None);
        assert_eq!(parse_channel_ref("<#notanumber>"), None);
    }
}
