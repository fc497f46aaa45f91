use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use serde::{Deserialize, Serialize};

/// Output options for the tools that do not take screenshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    pub output_path: String,
    pub title: Option<String>,
    pub publish: bool,
}

impl RunOptions {
    pub fn new(output_path: impl Into<String>) -> Self {
        Self {
            output_path: output_path.into(),
            title: None,
            publish: false,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_publish(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }
}

impl ConfigProvider for RunOptions {
    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn page_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn publish_enabled(&self) -> bool {
        self.publish
    }
}

impl Validate for RunOptions {
    fn validate(&self) -> Result<()> {
        validate_path("output_path", &self.output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_is_ignored() {
        let options = RunOptions::new("outputs").with_title(Some("  ".to_string()));
        assert_eq!(options.page_title(), None);
        assert!(!options.publish_enabled());
        assert!(options.validate().is_ok());
    }
}
