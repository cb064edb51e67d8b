//! # Provision
//!
//! Idempotent provisioning of users, groups, spaces and content against a
//! remote collaboration service.
//!
//! A [`Manifest`] declares the desired resources. The [`Orchestrator`]
//! walks them in four ordered stages (users, groups, spaces, content),
//! creating what is missing, resolving what already exists, and applying a
//! named permission [`Policy`] to each newly created space or content item.
//! Every item ends up with exactly one [`ProvisioningOutcome`] in the
//! [`RunReport`].
//!
//! ## Core Concepts
//!
//! - **ResourceSpec**: Immutable description of a desired resource
//! - **ResourceClient**: The service boundary; every failure is classified
//!   into an [`ErrorKind`]
//! - **Policy**: A named intent resolved into concrete permission entries
//! - **Orchestrator**: Reconciles the manifest and aggregates the report
//!
//! ## Example
//!
//! ```
//! use provision::{Manifest, MockClient, NoProgress, Orchestrator, RunOptions};
//!
//! let manifest = Manifest::from_toml_str(r#"
//!     [[users]]
//!     username = "admin"
//!     admin = true
//!
//!     [[spaces]]
//!     key = "TEAM"
//!     name = "Team Space"
//!     policy = "public_read"
//! "#)?;
//!
//! let client = MockClient::new();
//! let report = Orchestrator::new(&client, RunOptions::immediate())
//!     .run(&manifest, &mut NoProgress)?;
//!
//! assert!(report.is_success());
//! assert_eq!(report.totals().created, 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`ResourceClient`]: Performs remote operations
//! - [`ProgressCallback`]: Receives progress updates
//!
//! This allows the crate to be used without hard dependencies on a
//! specific HTTP client or terminal UI.

pub mod context;
pub mod error;
pub mod manifest;
pub mod mock;
pub mod orchestrator;
pub mod policy;
pub mod registry;
pub mod report;
pub mod types;

// Re-export main types at crate root
pub use context::{NoProgress, ProgressCallback, ResourceClient};
pub use error::{ClientError, ErrorKind, ManifestError, PolicyError, ProvisionError};
pub use manifest::{
    BlogPostEntry, GroupEntry, Manifest, ManifestIssue, PageEntry, Severity, SpaceEntry, UserEntry,
};
pub use mock::{MockCall, MockClient, MockOp};
pub use orchestrator::{Orchestrator, provision_simple};
pub use policy::{Operation, PermissionEntry, Policy, PolicyContext, SubjectType};
pub use registry::HandleRegistry;
pub use report::{
    ErrorDetail, FailureKind, MembershipOutcome, OutcomeCounts, OutcomeStatus,
    ProvisioningOutcome, RunReport, StageReport,
};
pub use types::{
    Attributes, NaturalKey, ResourceHandle, ResourceKind, ResourceSpec, RunOptions, Stage,
    TargetType,
};
