/// Identifier of a running container, as printed by `docker ps -q`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle(String);

impl Handle {
    /// First non-blank line of `docker ps -q` output, if any.
    pub fn first(listing: &str) -> Option<Self> {
        listing
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from)
            .map(Self)
    }
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Handle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
