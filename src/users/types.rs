/// A user profile as listed by the roster.
///
/// `id` is the natural key: the store upserts by it and two records with the
/// same id describe the same person.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
  pub id: i64,
  pub name: String,
  pub username: String,
  /// Avatar image URL
  pub img: String,
}

#[cfg(test)]
impl User {
  pub fn new(
    id: i64,
    name: impl Into<String>,
    username: impl Into<String>,
    img: impl Into<String>,
  ) -> Self {
    Self {
      id,
      name: name.into(),
      username: username.into(),
      img: img.into(),
    }
  }
}

impl User {
  /// Case-insensitive match against name or username
  pub fn matches(&self, filter: &str) -> bool {
    if filter.is_empty() {
      return true;
    }
    let needle = filter.to_lowercase();
    self.name.to_lowercase().contains(&needle) || self.username.to_lowercase().contains(&needle)
  }
}
