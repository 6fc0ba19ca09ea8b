//! Number fields the REST API emits either as JSON strings or numbers.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

fn parse<E: de::Error>(raw: NumberOrString) -> Result<i64, E> {
    match raw {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| E::custom(format!("expected an integer, got {:?}", s))),
    }
}

pub fn i64_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    parse(NumberOrString::deserialize(deserializer)?)
}

pub fn opt_i64_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(raw) => parse(raw).map(Some),
    }
}
