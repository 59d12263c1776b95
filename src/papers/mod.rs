pub mod manager;

use crate::artifact::ArtifactId;
use crate::error::{FilesystemError, TransferError, ValidationError};
use crate::report::Report;
use crate::transfer::format_bytes;
use std::collections::{BTreeMap, BTreeSet};

pub use manager::AcquisitionManager;

/// Result of fetching a single artifact
#[derive(Debug)]
pub enum FetchOutcome {
    /// Written to its final path; carries the number of bytes transferred
    Success(u64),
    /// The remote answered 404 for this artifact
    RemoteNotFound,
    Failed(TransferError),
    /// The ID cannot name a file in the papers directory; nothing was requested
    Rejected(ValidationError),
}

impl FetchOutcome {
    pub(crate) fn from_transfer(result: Result<u64, TransferError>) -> Self {
        match result {
            Ok(bytes) => Self::Success(bytes),
            Err(e) if e.status() == Some(404) => Self::RemoteNotFound,
            Err(e) => Self::Failed(e),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Aggregate result of one batch of concurrent fetches
#[derive(Debug, Default)]
pub struct BatchResult {
    pub requested: BTreeSet<ArtifactId>,
    /// Already present locally, never refetched
    pub skipped: BTreeSet<ArtifactId>,
    /// `requested - skipped`; each has exactly one entry in `outcomes`
    pub attempted: BTreeSet<ArtifactId>,
    pub outcomes: BTreeMap<ArtifactId, FetchOutcome>,
}

impl BatchResult {
    /// IDs whose transfer completed
    #[must_use]
    pub fn succeeded(&self) -> Vec<&ArtifactId> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_success())
            .map(|(id, _)| id)
            .collect()
    }

    /// IDs whose transfer did not complete, with their outcome
    #[must_use]
    pub fn failed(&self) -> Vec<(&ArtifactId, &FetchOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !o.is_success())
            .collect()
    }

    /// Sum of bytes over successful transfers
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.outcomes
            .values()
            .map(|o| match o {
                FetchOutcome::Success(bytes) => *bytes,
                _ => 0,
            })
            .sum()
    }

    /// True when every attempted transfer succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(FetchOutcome::is_success)
    }

    #[must_use]
    pub fn report(&self) -> Report {
        if self.attempted.is_empty() {
            return Report::info(format!(
                "All {} requested papers already downloaded",
                self.requested.len()
            ));
        }

        let failed = self.failed();
        if failed.is_empty() {
            return Report::info(format!(
                "Downloaded {} papers ({}), skipped {} already present",
                self.attempted.len(),
                format_bytes(self.total_bytes()),
                self.skipped.len()
            ));
        }

        let details: Vec<String> = failed
            .iter()
            .map(|(id, outcome)| match outcome {
                FetchOutcome::Failed(e) => format!("{id}: {e}"),
                FetchOutcome::Rejected(e) => format!("{id}: {e}"),
                _ => format!("{id}: not found on remote"),
            })
            .collect();

        let message = format!(
            "{} of {} papers failed to download:\n{}",
            failed.len(),
            self.attempted.len(),
            details.join("\n")
        );

        if failed.len() == self.attempted.len() {
            Report::error(message)
        } else {
            Report::warning(message)
        }
    }
}

/// Result of deleting a single artifact
#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted,
    /// Not present locally, nothing to delete
    NotFound,
    Failed(FilesystemError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;

    fn batch(outcomes: Vec<(&str, FetchOutcome)>, skipped: &[&str]) -> BatchResult {
        let skipped: BTreeSet<ArtifactId> = skipped.iter().copied().map(ArtifactId::from).collect();
        let attempted: BTreeSet<ArtifactId> =
            outcomes.iter().map(|(id, _)| ArtifactId::from(*id)).collect();
        BatchResult {
            requested: skipped.union(&attempted).cloned().collect(),
            skipped,
            attempted,
            outcomes: outcomes
                .into_iter()
                .map(|(id, o)| (ArtifactId::from(id), o))
                .collect(),
        }
    }

    #[test]
    fn test_from_transfer_maps_404() {
        let outcome = FetchOutcome::from_transfer(Err(TransferError::HttpStatus {
            url: "http://arxiv.org/pdf/x.pdf".to_string(),
            status: 404,
        }));
        assert!(matches!(outcome, FetchOutcome::RemoteNotFound));

        let outcome = FetchOutcome::from_transfer(Err(TransferError::HttpStatus {
            url: "http://arxiv.org/pdf/x.pdf".to_string(),
            status: 502,
        }));
        assert!(matches!(outcome, FetchOutcome::Failed(_)));

        assert!(FetchOutcome::from_transfer(Ok(10)).is_success());
    }

    #[test]
    fn test_totals_and_report() {
        let result = batch(
            vec![
                ("a", FetchOutcome::Success(1000)),
                ("b", FetchOutcome::Success(24)),
                ("c", FetchOutcome::RemoteNotFound),
            ],
            &["d"],
        );

        assert_eq!(result.total_bytes(), 1024);
        assert_eq!(result.succeeded().len(), 2);
        assert_eq!(result.failed().len(), 1);
        assert!(!result.is_success());

        let report = result.report();
        assert_eq!(report.severity, Severity::Warning);
        assert!(report.message.contains("c: not found on remote"));
    }

    #[test]
    fn test_report_all_skipped() {
        let result = batch(vec![], &["a", "b"]);
        assert!(result.is_success());
        let report = result.report();
        assert_eq!(report.severity, Severity::Info);
        assert!(report.message.contains("already downloaded"));
    }

    #[test]
    fn test_report_all_failed() {
        let result = batch(
            vec![(
                "a",
                FetchOutcome::Failed(TransferError::Timeout {
                    url: "http://arxiv.org/pdf/a.pdf".to_string(),
                }),
            )],
            &[],
        );
        assert_eq!(result.report().severity, Severity::Error);
    }

    #[test]
    fn test_rejected_id_is_a_failure() {
        let result = batch(
            vec![
                ("a", FetchOutcome::Success(10)),
                (
                    "../a",
                    FetchOutcome::Rejected(ValidationError::InvalidId {
                        id: "../a".to_string(),
                    }),
                ),
            ],
            &[],
        );
        assert!(!result.is_success());
        assert_eq!(result.failed().len(), 1);

        let report = result.report();
        assert_eq!(report.severity, Severity::Warning);
        assert!(report.message.contains("Invalid ID '../a'"));
    }
}
