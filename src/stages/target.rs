/// Websites the pipeline collects events from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Riba,
    Nla,
    BcoOrg,
    EventBright,
}

impl Source {
    pub const fn all() -> [Self; 4] {
        [Self::Riba, Self::Nla, Self::BcoOrg, Self::EventBright]
    }
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Riba => "riba",
            Self::Nla => "nla",
            Self::BcoOrg => "bco-org",
            Self::EventBright => "event-bright",
        }
    }
}

/// Which sources a stage runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Target {
    #[default]
    All,
    One(Source),
}

impl std::str::FromStr for Target {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            name => Source::all()
                .into_iter()
                .find(|source| source.name() == name)
                .map(Self::One)
                .ok_or_else(|| {
                    format!(
                        "unknown source '{}', expected one of: all, {}",
                        name,
                        Source::all().map(|s| s.name()).join(", ")
                    )
                }),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::One(source) => write!(f, "{}", source),
        }
    }
}
