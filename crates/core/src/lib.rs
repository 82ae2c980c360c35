//! Core business logic for Bilans.
//!
//! This crate contains pure business logic with ZERO database dependencies.
//! All domain types, match predicates, and reconciliation planning live here.
//!
//! # Modules
//!
//! - `matching` - Payment/invoice match predicates and amount parsing
//! - `reconcile` - Forward and reverse reconciliation planning
//! - `audit` - Self-healing of settlement/invoice references
//! - `statement` - Deterministic bank-CSV statement parsing
//! - `extraction` - Document extraction collaborator (AI model)
//! - `registry` - National e-invoice registry collaborator
//! - `storage` - Uploaded-document storage

pub mod audit;
pub mod extraction;
pub mod matching;
pub mod reconcile;
pub mod registry;
pub mod statement;
pub mod storage;
