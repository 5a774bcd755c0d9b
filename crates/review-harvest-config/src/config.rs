use anyhow::{anyhow, Context, Result};
use review_harvest_models::Subject;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestOptions,
    #[serde(default)]
    pub sources: SourceConfig,
    #[serde(default)]
    pub subjects: Vec<SubjectEntry>,
}

/// Pacing and sizing knobs shared by every source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestOptions {
    /// Items a non-final page is expected to return.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Safety ceiling on pages per (subject, bucket).
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Inter-page delay is drawn uniformly from this range.
    #[serde(default = "default_delay_min_secs")]
    pub delay_min_secs: u64,
    #[serde(default = "default_delay_max_secs")]
    pub delay_max_secs: u64,
    /// Bound on one page fetch or render wait.
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
    /// Bound on one item's content-expansion wait.
    #[serde(default = "default_item_timeout_secs")]
    pub item_timeout_secs: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub comments: Option<CommentFeedConfig>,
    #[serde(default)]
    pub reviews: Option<ReviewFeedConfig>,
}

/// Server-rendered short-comment feed.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentFeedConfig {
    pub enabled: bool,
}

/// Client-rendered long-review feed.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewFeedConfig {
    pub enabled: bool,
    /// Rating partitions to walk, in order. The listing cannot mix
    /// ratings, so each bucket is paginated separately.
    #[serde(default = "default_review_buckets")]
    pub buckets: Vec<u8>,
}

/// One media item to harvest: platform id and display title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectEntry {
    pub id: String,
    pub title: String,
}

impl SubjectEntry {
    pub fn to_subject(&self) -> Subject {
        Subject::new(self.id.clone(), self.title.clone())
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_max_pages() -> u32 {
    100
}

fn default_delay_min_secs() -> u64 {
    5
}

fn default_delay_max_secs() -> u64 {
    10
}

fn default_page_timeout_secs() -> u64 {
    15
}

fn default_item_timeout_secs() -> u64 {
    5
}

fn default_review_buckets() -> Vec<u8> {
    vec![1, 2]
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            delay_min_secs: default_delay_min_secs(),
            delay_max_secs: default_delay_max_secs(),
            page_timeout_secs: default_page_timeout_secs(),
            item_timeout_secs: default_item_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let contents = self.to_toml_string()?;
        std::fs::write(path, contents)
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing config")
    }

    pub fn validate(&self) -> Result<()> {
        if self.harvest.page_size == 0 {
            return Err(anyhow!("harvest.page_size must be at least 1"));
        }
        if self.harvest.max_pages == 0 {
            return Err(anyhow!("harvest.max_pages must be at least 1"));
        }
        if self.harvest.delay_min_secs > self.harvest.delay_max_secs {
            return Err(anyhow!(
                "harvest.delay_min_secs ({}) exceeds harvest.delay_max_secs ({})",
                self.harvest.delay_min_secs,
                self.harvest.delay_max_secs
            ));
        }
        if let Some(reviews) = &self.sources.reviews {
            if reviews.enabled && reviews.buckets.is_empty() {
                return Err(anyhow!("sources.reviews.buckets must not be empty"));
            }
            if let Some(bad) = reviews.buckets.iter().find(|b| **b < 1 || **b > 5) {
                return Err(anyhow!("sources.reviews.buckets entry {} outside 1-5", bad));
            }
        }
        for subject in &self.subjects {
            if subject.id.trim().is_empty() {
                return Err(anyhow!(
                    "subject \"{}\" has an empty id",
                    subject.title
                ));
            }
        }
        Ok(())
    }

    pub fn subjects(&self) -> Vec<Subject> {
        self.subjects.iter().map(SubjectEntry::to_subject).collect()
    }

    /// Starter configuration written by `config init`.
    pub fn example() -> Self {
        Self {
            harvest: HarvestOptions::default(),
            sources: SourceConfig {
                comments: Some(CommentFeedConfig { enabled: true }),
                reviews: Some(ReviewFeedConfig {
                    enabled: false,
                    buckets: default_review_buckets(),
                }),
            },
            subjects: vec![SubjectEntry {
                id: "1652587".to_string(),
                title: "Avatar".to_string(),
            }],
        }
    }
}
