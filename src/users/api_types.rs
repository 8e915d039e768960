//! Serde-deserializable types matching the users API response.
//!
//! Kept apart from `User` so that wire quirks stay out of the domain type.

use serde::{Deserialize, Deserializer};

use super::types::User;

/// Text fields may be missing or `null`; both read as empty.
#[derive(Debug, Deserialize)]
pub struct ApiUser {
  #[serde(deserialize_with = "deserialize_id")]
  pub id: i64,
  #[serde(default)]
  pub img: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub username: Option<String>,
}

impl From<ApiUser> for User {
  fn from(api: ApiUser) -> Self {
    User {
      id: api.id,
      name: api.name.unwrap_or_default(),
      username: api.username.unwrap_or_default(),
      img: api.img.unwrap_or_default(),
    }
  }
}

/// Parse the body of `GET /users` into domain records, keeping server order.
pub fn parse_users(body: &[u8]) -> serde_json::Result<Vec<User>> {
  let users: Vec<ApiUser> = serde_json::from_slice(body)?;
  Ok(users.into_iter().map(User::from).collect())
}

/// Mock API backends sometimes send numeric ids as strings ("1001").
fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Int(i64),
    Str(String),
  }

  match RawId::deserialize(deserializer)? {
    RawId::Int(id) => Ok(id),
    RawId::Str(s) => s
      .trim()
      .parse()
      .map_err(|_| serde::de::Error::custom(format!("invalid user id: {:?}", s))),
  }
}
