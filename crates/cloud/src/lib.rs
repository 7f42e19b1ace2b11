//! `alertstack-cloud` -- submits alert stack plans to AWS.
//!
//! The [`provisioner::StackProvisioner`] trait abstracts the provider. The
//! CloudFormation implementation creates or updates a stack from the
//! rendered template; the dry-run implementation only records requests.

pub mod cloudformation;
pub mod deploy;
pub mod error;
pub mod provisioner;
pub mod status;

pub use deploy::{deploy_plan, DeployOptions};
pub use error::CloudError;
pub use provisioner::{DeployOutcome, DeployRequest, DryRunProvisioner, StackProvisioner};
