/// One unit of the content pipeline.
///
/// Variants are declared in execution order; [`Stage::all`] is the only
/// sequence the orchestrator ever walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Collect event URLs from each source's listing pages.
    Urls,
    /// Download and normalise event images.
    Images,
    /// Scrape the event pages' web content.
    Content,
    /// Generate titles, intros and copy from the scraped content.
    Generate,
    /// Upload processed images to the CMS media library.
    Upload,
    /// Create CMS events for newly generated content.
    Create,
    /// Sync event categories to the CMS.
    Categorize,
    /// Push updated content and status to existing CMS events.
    Update,
}

impl Stage {
    pub const fn all() -> [Self; 8] {
        [
            Self::Urls,
            Self::Images,
            Self::Content,
            Self::Generate,
            Self::Upload,
            Self::Create,
            Self::Categorize,
            Self::Update,
        ]
    }

    /// Name passed to the stage command.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Urls => "event-url",
            Self::Images => "process-image",
            Self::Content => "event-web-content",
            Self::Generate => "generate-content",
            Self::Upload => "upload-media",
            Self::Create => "create-event",
            Self::Categorize => "update-event-category",
            Self::Update => "update-event",
        }
    }

    /// 1-based position in the pipeline.
    pub fn ordinal(&self) -> usize {
        *self as usize + 1
    }
}

impl TryFrom<&str> for Stage {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::all()
            .into_iter()
            .find(|stage| stage.name() == s.trim())
            .ok_or_else(|| format!("unknown stage: {}", s))
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn fixed_order() {
        let names = Stage::all().map(|s| s.name());
        assert_eq!(
            names,
            [
                "event-url",
                "process-image",
                "event-web-content",
                "generate-content",
                "upload-media",
                "create-event",
                "update-event-category",
                "update-event",
            ]
        );
    }
    #[test]
    fn ordinals_follow_declaration() {
        assert!(Stage::all().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Stage::Urls.ordinal(), 1);
        assert_eq!(Stage::Update.ordinal(), 8);
    }
    #[test]
    fn parse_by_name() {
        for stage in Stage::all() {
            assert_eq!(Stage::try_from(stage.name()), Ok(stage));
        }
        assert!(Stage::try_from("delete-event").is_err());
    }
}
