/// How the database container is picked out of the running set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Name(String),
    Ancestor(String),
}

impl Filter {
    /// Argument for `docker ps --filter`.
    pub fn arg(&self) -> String {
        match self {
            Self::Name(name) => format!("name={}", name),
            Self::Ancestor(image) => format!("ancestor={}", image),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.arg())
    }
}
