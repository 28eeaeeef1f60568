//! Suite-level test options.

use serde::{Deserialize, Serialize};

/// Options governing an entire conformance-suite run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Accept empty record captures for every stream.
    #[serde(default)]
    pub ignore_no_records: bool,

    /// Accept empty record captures for the named streams only.
    #[serde(default)]
    pub ignore_no_records_for_streams: Vec<String>,

    /// Cap on captured records examined per stream, when set.
    #[serde(default)]
    pub max_records_limit: Option<usize>,
}

impl SuiteConfig {
    /// Whether an empty capture is acceptable for `stream_name`.
    pub fn ignores_no_records_for(&self, stream_name: &str) -> bool {
        self.ignore_no_records
            || self
                .ignore_no_records_for_streams
                .iter()
                .any(|name| name == stream_name)
    }
}
