//! # MI Transaction Service
//!
//! Adapter for the Infor M3 MI REST API. The core only ever talks to the
//! [`TransactionService`] trait; the [`MiClient`] implementation handles
//! `.ionapi` service-account credentials, OAuth2 token acquisition and the
//! `execute/{program}/{transaction}` call surface.
//!
//! Parameter and response shapes are step-specific and opaque to this
//! module: a call carries a flat string parameter set and yields a
//! structured [`MiResponse`].

pub mod client;
pub mod credentials;
pub mod response;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;

pub use client::MiClient;
pub use credentials::{find_ionapi_path, IonApiCredentials};
pub use response::{MiMessage, MiResponse, TransactionResult};

/// The remote transaction service seam.
///
/// One implementation talks to the real MI REST endpoint; tests substitute
/// a scripted mock that records invocations.
#[async_trait]
pub trait TransactionService: Send + Sync {
    /// Execute one MI transaction with a flat key-value parameter set.
    ///
    /// Transport-level failures surface as [`crate::SparepartError::Remote`];
    /// business-level failures are carried inside the returned response and
    /// classified by the caller.
    async fn call(
        &self,
        program: &str,
        transaction: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<MiResponse>;
}
