use serde::Serialize;

use crate::filehost::FileInfo;
use crate::quality;
use crate::user_config::UserConfig;

/// Shown (and encoded into playback URLs) when the file host gave no name.
pub const UNKNOWN_FILE_NAME: &str = "unknown";

/// A raw source link plus whatever the file host told us about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub link: String,
    pub file_name: Option<String>,
    pub size_bytes: u64,
    pub quality: String,
}

impl Candidate {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            file_name: None,
            size_bytes: 0,
            quality: String::new(),
        }
    }

    /// Attach file host metadata and classify the file name.
    pub fn enrich(&mut self, info: FileInfo) {
        self.quality = quality::detect_quality(&info.filename).to_string();
        self.size_bytes = info.size;
        self.file_name = Some(info.filename);
    }

    pub fn size_gb(&self) -> f64 {
        quality::size_gb(self.size_bytes)
    }

    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(UNKNOWN_FILE_NAME)
    }

    fn passes(&self, config: &UserConfig) -> bool {
        if let Some(max_gb) = config.max_size
            && self.size_gb() > f64::from(max_gb)
        {
            return false;
        }
        !config.excludes_quality(&self.quality)
    }
}

/// Split candidates into the ranked survivors (largest first) and the ones
/// rejected by the size ceiling or quality exclusions, in input order.
pub fn partition_ranked(
    candidates: &[Candidate],
    config: &UserConfig,
) -> (Vec<Candidate>, Vec<Candidate>) {
    let (mut ranked, rejected): (Vec<Candidate>, Vec<Candidate>) =
        candidates.iter().cloned().partition(|c| c.passes(config));

    // sort_by is stable, so equal sizes keep their index order
    ranked.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));

    (ranked, rejected)
}

pub fn filter_and_rank(candidates: &[Candidate], config: &UserConfig) -> Vec<Candidate> {
    partition_ranked(candidates, config).0
}
