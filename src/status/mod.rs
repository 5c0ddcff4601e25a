//! Text lines for the two overlay panels.

use anyhow::Result;

pub mod host;
pub mod services;

pub use host::{HostInfo, HostSnapshot};
pub use services::{ServicesSource, ServicesSummary};

/// Something that can produce the lines of one panel.
pub trait StatusSource {
    fn name(&self) -> &'static str;
    fn lines(&self) -> Result<Vec<String>>;
}

/// Fixed lines, used for previews and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLines(pub Vec<String>);

impl StaticLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(lines.into_iter().map(Into::into).collect())
    }
}

impl StatusSource for StaticLines {
    fn name(&self) -> &'static str {
        "static"
    }

    fn lines(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}
