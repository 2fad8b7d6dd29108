//! Error types for the FDTD solver
//!
//! Configuration and allocation failures are fatal and surface before the time
//! loop starts. Export failures are reported per snapshot and never interrupt
//! stepping. Exchange failures only occur when a neighboring rank has already
//! aborted.

use thiserror::Error;

/// Result alias used throughout the crate
pub type FdtdResult<T> = Result<T, FdtdError>;

/// Solver error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FdtdError {
    /// Invalid run configuration, detected before any field is allocated
    #[error("configuration parameter {parameter}: {message}")]
    Configuration {
        /// Name of the offending parameter (e.g. `"nsubdomains"`)
        parameter: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// A field or coefficient buffer could not be allocated
    #[error("failed to allocate buffer of {cells} cells")]
    Allocation {
        /// Requested number of cells
        cells: usize,
    },

    /// A snapshot could not be written (non-fatal)
    #[error("snapshot {icnt} export failed: {message}")]
    Export {
        /// Iteration index of the snapshot
        icnt: u64,
        /// Description from the writer
        message: String,
    },

    /// A halo row could not be sent or received
    #[error("rank {rank} halo exchange failed: {message}")]
    Exchange {
        /// Rank that observed the failure
        rank: usize,
        /// Description of the failure
        message: String,
    },

    /// A rank worker thread panicked
    #[error("rank {rank} worker panicked")]
    RankPanicked {
        /// Rank whose worker panicked
        rank: usize,
    },
}

impl FdtdError {
    /// Create a configuration error for `parameter`
    pub fn configuration(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            parameter,
            message: message.into(),
        }
    }

    /// Create an export error for snapshot `icnt`
    pub fn export(icnt: u64, message: impl Into<String>) -> Self {
        Self::Export {
            icnt,
            message: message.into(),
        }
    }

    /// Create an exchange error observed by `rank`
    pub fn exchange(rank: usize, message: impl Into<String>) -> Self {
        Self::Exchange {
            rank,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message() {
        let err = FdtdError::configuration("nsubdomains", "must divide ny = 10, got 3");
        assert_eq!(
            err.to_string(),
            "configuration parameter nsubdomains: must divide ny = 10, got 3"
        );
    }

    #[test]
    fn test_export_message() {
        let err = FdtdError::export(200, "disk full");
        assert_eq!(err.to_string(), "snapshot 200 export failed: disk full");
    }
}
