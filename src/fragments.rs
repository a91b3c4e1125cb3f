// Segmented-stream detection and fragment download policy

use serde::{Deserialize, Serialize};

use crate::models::Format;

/// Whole-file retry count passed to the resolver for non-segmented
/// transfers.
pub const WHOLE_FILE_RETRIES: u32 = 10;

/// Socket timeout for transfers, in seconds. Longer than the probe timeout
/// so slow CDN fragments do not abort a healthy download.
pub const TRANSFER_TIMEOUT_SECS: u64 = 60;

/// How fragmented resources are downloaded. Tuned for correctness over
/// throughput: one fragment at a time, generous retries, and a missing
/// fragment is a hard failure rather than a silently corrupted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentPolicy {
    /// Parallel fragment transfers. Kept at 1 for stability.
    pub concurrent_downloads: u32,
    /// Per-fragment retry count, higher than the whole-file count.
    pub fragment_retries: u32,
    /// Never skip an unavailable fragment.
    pub skip_unavailable: bool,
}

impl Default for FragmentPolicy {
    fn default() -> Self {
        Self {
            concurrent_downloads: 1,
            fragment_retries: 15,
            skip_unavailable: false,
        }
    }
}

/// Delivery mode resolved from a format list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    WholeFile,
    Segmented(FragmentPolicy),
}

impl Delivery {
    pub fn is_segmented(&self) -> bool {
        matches!(self, Self::Segmented(_))
    }

    pub fn fragment_policy(&self) -> Option<FragmentPolicy> {
        match self {
            Self::WholeFile => None,
            Self::Segmented(policy) => Some(*policy),
        }
    }
}

/// A resource is segmented if any resolved format is fragment-delivered.
pub fn classify(formats: &[Format]) -> Delivery {
    if formats.iter().any(|f| f.is_fragmented) {
        Delivery::Segmented(FragmentPolicy::default())
    } else {
        Delivery::WholeFile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(id: &str, fragmented: bool) -> Format {
        Format {
            format_id: id.to_string(),
            container: "mp4".to_string(),
            height: Some(720),
            filesize: None,
            is_fragmented: fragmented,
            fragment_count: if fragmented { Some(120) } else { None },
        }
    }

    #[test]
    fn any_fragmented_format_means_segmented() {
        let delivery = classify(&[format("137", false), format("hls-720", true)]);
        assert!(delivery.is_segmented());

        let policy = delivery.fragment_policy().unwrap();
        assert_eq!(policy.concurrent_downloads, 1);
        assert!(policy.fragment_retries > WHOLE_FILE_RETRIES);
        assert!(!policy.skip_unavailable);
    }

    #[test]
    fn all_whole_file_formats_mean_whole_file() {
        let delivery = classify(&[format("137", false), format("140", false)]);
        assert!(!delivery.is_segmented());
        assert!(delivery.fragment_policy().is_none());
    }

    #[test]
    fn empty_format_list_is_whole_file() {
        assert!(!classify(&[]).is_segmented());
    }
}
