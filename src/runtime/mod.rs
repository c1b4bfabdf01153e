//! Minimal in-process inference runtime
//!
//! The probes treat the inference runtime as an opaque collaborator with a
//! narrow surface: create a core handle, query device capabilities, read a
//! model container. This module provides that surface backed by a
//! self-contained CPU implementation so the harnesses run end to end without
//! an external runtime installation.
//!
//! Every resource is an owning type: [`Core`] and [`ModelArtifact`] report
//! their creation and release to the process-wide [`ResourceLedger`], which is
//! what leak tests assert against. Release happens on `Drop`, at iteration
//! scope exit, never through a collector.

pub mod core;
pub mod ledger;

pub use self::core::{Core, DeviceVersion, ModelArtifact, TensorDtype, TensorInfo};
pub use self::ledger::{LedgerSnapshot, ResourceLedger};
