//! Identifier codec. Translates addresses between the protocol library's
//! internal form and the API form the front-end speaks, and
//! serialises/parses message keys. Addresses are kept as structured values
//! everywhere except at store and HTTP boundaries.

use crate::error::{Error, Result};

const INTERNAL_SUFFIX: &str = "@s.whatsapp.net";
const API_SUFFIX: &str = "@c.us";
const GROUP_SUFFIX: &str = "@g.us";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Server {
    UserInternal,
    UserApi,
    Group,
    Lid,
    Broadcast,
    Other(String),
}

impl Server {
    fn as_str(&self) -> &str {
        match self {
            Server::UserInternal => "s.whatsapp.net",
            Server::UserApi => "c.us",
            Server::Group => "g.us",
            Server::Lid => "lid",
            Server::Broadcast => "broadcast",
            Server::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub user: String,
    pub server: Server,
}

impl Address {
    pub fn new(user: impl Into<String>, server: Server) -> Self {
        Self {
            user: user.into(),
            server,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.server, Server::Group)
    }

    pub fn is_lid(&self) -> bool {
        matches!(self.server, Server::Lid)
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self.server, Server::Broadcast)
    }
}

/// `USER_INTERNAL` -> `user@c.us`; `GROUP` -> `user@g.us`; anything else ->
/// `user@<server>`.
pub fn address_to_api(address: &Address) -> String {
    match address.server {
        Server::UserInternal => format!("{}{API_SUFFIX}", address.user),
        Server::Group => format!("{}{GROUP_SUFFIX}", address.user),
        _ => format!("{}@{}", address.user, address.server.as_str()),
    }
}

/// Replace a trailing `@s.whatsapp.net` with `@c.us`; any other string
/// (already API form, a group, a lid) is returned unchanged.
pub fn string_to_api(raw: &str) -> String {
    match raw.strip_suffix(INTERNAL_SUFFIX) {
        Some(user) => format!("{user}{API_SUFFIX}"),
        None => raw.to_string(),
    }
}

/// Inverse of `string_to_api` for the `@c.us` case.
pub fn string_to_internal(raw: &str) -> String {
    match raw.strip_suffix(API_SUFFIX) {
        Some(user) => format!("{user}{INTERNAL_SUFFIX}"),
        None => raw.to_string(),
    }
}

/// Reverse `@c.us` -> `@s.whatsapp.net`, then parse into a structured
/// address. Recognises the suffixes the rest of this codec knows about;
/// anything else is preserved as `Server::Other`.
pub fn parse_api(raw: &str) -> Result<Address> {
    let internal = string_to_internal(raw);
    parse_any(&internal)
}

fn parse_any(raw: &str) -> Result<Address> {
    if raw.is_empty() {
        return Err(Error::Invalid("empty address".to_string()));
    }
    let (user, server) = raw
        .split_once('@')
        .ok_or_else(|| Error::Invalid(format!("address missing '@': {raw}")))?;
    if user.is_empty() {
        return Err(Error::Invalid(format!("address missing user: {raw}")));
    }
    let server = match server {
        "s.whatsapp.net" => Server::UserInternal,
        "c.us" => Server::UserApi,
        "g.us" => Server::Group,
        "lid" => Server::Lid,
        "broadcast" => Server::Broadcast,
        other => Server::Other(other.to_string()),
    };
    Ok(Address::new(user, server))
}

/// Prefix before `@`, or the whole string if there is none.
pub fn extract_number(raw: &str) -> String {
    match raw.split_once('@') {
        Some((user, _)) => user.to_string(),
        None => raw.to_string(),
    }
}

const KEY_SUFFIXES: [&str; 3] = ["@c.us_", "@g.us_", "@s.whatsapp.net_"];

/// A message key is `(fromMe, chatAddress (API form), rawId)`, serialised
/// as `"<fromMe>_<chatAPI>_<rawId>"`. The split point is the first of the
/// suffix tokens after the first underscore, so the raw id can itself
/// contain underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub from_me: bool,
    pub chat_api: String,
    pub raw_id: String,
}

impl MessageKey {
    pub fn new(from_me: bool, chat_api: impl Into<String>, raw_id: impl Into<String>) -> Self {
        Self {
            from_me,
            chat_api: chat_api.into(),
            raw_id: raw_id.into(),
        }
    }

    pub fn format(&self) -> String {
        format!("{}_{}_{}", self.from_me, self.chat_api, self.raw_id)
    }

    pub fn parse(serialised: &str) -> Result<Self> {
        let rest = serialised
            .strip_prefix("true_")
            .map(|r| (true, r))
            .or_else(|| serialised.strip_prefix("false_").map(|r| (false, r)));
        let (from_me, rest) = rest
            .ok_or_else(|| Error::Invalid(format!("malformed message key: {serialised}")))?;

        let split_at = KEY_SUFFIXES
            .iter()
            .filter_map(|suffix| rest.find(suffix).map(|idx| idx + suffix.len()))
            .min()
            .ok_or_else(|| Error::Invalid(format!("malformed message key: {serialised}")))?;

        let chat_api = rest[..split_at - 1].to_string();
        let raw_id = rest[split_at..].to_string();
        Ok(MessageKey {
            from_me,
            chat_api,
            raw_id,
        })
    }
}

impl std::fmt::Display for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_form_of_internal_address() {
        let addr = Address::new("10000000001", Server::UserInternal);
        assert_eq!(address_to_api(&addr), "10000000001@c.us");
    }

    #[test]
    fn api_form_of_group_address() {
        let addr = Address::new("12345", Server::Group);
        assert_eq!(address_to_api(&addr), "12345@g.us");
    }

    #[test]
    fn api_form_passes_through_lid_and_broadcast() {
        assert_eq!(string_to_api("123@lid"), "123@lid");
        assert_eq!(string_to_api("status@broadcast"), "status@broadcast");
    }

    #[test]
    fn string_round_trip_for_internal_and_group() {
        let internal = "10000000001@s.whatsapp.net";
        assert_eq!(string_to_internal(&string_to_api(internal)), internal);

        let group = "12345@g.us";
        assert_eq!(string_to_api(group), group);
    }

    #[test]
    fn parse_api_reverses_c_us_suffix() {
        let addr = parse_api("10000000001@c.us").unwrap();
        assert_eq!(addr.server, Server::UserInternal);
        assert_eq!(addr.user, "10000000001");
    }

    #[test]
    fn extract_number_strips_server() {
        assert_eq!(extract_number("10000000001@c.us"), "10000000001");
        assert_eq!(extract_number("noserver"), "noserver");
    }

    #[test]
    fn message_key_round_trips_through_format_and_parse() {
        let key = MessageKey::new(true, "10000000001@c.us", "ABCDEF123");
        let formatted = key.format();
        assert_eq!(formatted, "true_10000000001@c.us_ABCDEF123");
        assert_eq!(MessageKey::parse(&formatted).unwrap(), key);
    }

    #[test]
    fn message_key_raw_id_may_contain_underscores() {
        let key = MessageKey::new(false, "12345@g.us", "RAW_WITH_UNDERSCORES_42");
        let formatted = key.format();
        assert_eq!(MessageKey::parse(&formatted).unwrap(), key);
    }

    #[test]
    fn message_key_parse_rejects_malformed_input() {
        assert!(MessageKey::parse("not_a_valid_key").is_err());
        assert!(MessageKey::parse("true_missingchatsuffix_raw").is_err());
    }
}
