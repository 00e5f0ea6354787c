//! Prelude module - commonly used types for convenient import.
//!
//! Use `use chainwarden_audit::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuditError, AuditResult};

// Data model
pub use crate::{Anchor, ChainEntry, ChainManifest, EntryLocator};

// Storage
pub use crate::{AnchorStore, BlobChainStorage, ChainStorage, discover_chains};

// Producing chains
pub use crate::ChainWriter;

// Verification
pub use crate::{
    AnchorCheck, AnchorSelection, BatchRunner, ChainTarget, Status, VerificationResult, Verifier,
    VerifyOptions, Violation, ViolationKind,
};

// Reporting
pub use crate::{ReportFormat, exit_code, render, write_artifact};
