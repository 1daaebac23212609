//! Request bodies sent to the bug tracker, date handling for landings, and
//! avatar URLs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use md5::{Digest, Md5};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use super::status::FlagStatus;

/// Comment posted when the reviewer did not type one.
pub const DEFAULT_COMMENT: &str = "Modified from Uplift Dashboard.";

/// Pending-edit key holding the reviewer's comment.
pub const COMMENT_KEY: &str = "comment";

/// Prefix the tracker expects on custom (status/tracking) fields.
pub const CUSTOM_FIELD_PREFIX: &str = "cf_";

/// Body for `PUT /bug/{id}`: a markdown comment plus one `cf_` field per
/// pending edit.
#[must_use]
pub fn flags_update_body(pending: &BTreeMap<String, String>, default_comment: &str) -> Value {
    let mut body = Map::new();
    body.insert(
        "comment".to_string(),
        json!({
            "body": comment_or_default(pending, default_comment),
            "is_markdown": true,
        }),
    );
    for (key, value) in pending.iter().filter(|(k, _)| k.as_str() != COMMENT_KEY) {
        body.insert(
            format!("{CUSTOM_FIELD_PREFIX}{key}"),
            Value::String(value.clone()),
        );
    }
    Value::Object(body)
}

/// Body for `PUT /bug/attachment/{id}`.
#[must_use]
pub fn attachment_update_body(comment: &str, versions: &BTreeMap<String, FlagStatus>) -> Value {
    let flags: Vec<Value> = versions
        .iter()
        .map(|(name, status)| json!({ "name": name, "status": status.as_str() }))
        .collect();
    json!({ "comment": comment, "flags": flags })
}

/// The typed comment, or `default_comment` when empty or absent.
#[must_use]
pub fn comment_or_default<'a>(
    pending: &'a BTreeMap<String, String>,
    default_comment: &'a str,
) -> &'a str {
    pending
        .get(COMMENT_KEY)
        .map(String::as_str)
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(default_comment)
}

/// Parse a landing date: RFC 3339, a naive ISO datetime, or a plain date.
pub fn parse_landing_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("unrecognised landing date '{raw}'"))
}

/// Gravatar image for an email: MD5 of the trimmed, lowercased address.
#[must_use]
pub fn gravatar_url(email: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{:x}", hasher.finalize())
}

pub(crate) mod landing_dates {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (channel, date) in map {
            out.serialize_entry(channel, &date.to_rfc3339())?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, DateTime<Utc>>, D::Error> {
        let raw = Option::<BTreeMap<String, String>>::deserialize(deserializer)?;
        raw.unwrap_or_default()
            .into_iter()
            .map(|(channel, value)| {
                super::parse_landing_date(&value)
                    .map(|date| (channel, date))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}
