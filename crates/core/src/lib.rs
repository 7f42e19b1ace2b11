//! `alertstack-core` -- pure alert stack resolution.
//!
//! Turns an [`config::AlertConfig`] into typed CloudWatch alarms, a log
//! metric filter and the SNS/Lambda notification target, then renders the
//! whole thing as a concrete CloudFormation template. Nothing in this crate
//! performs I/O.

pub mod alarm;
pub mod config;
pub mod error;
pub mod metric_names;
pub mod notification;
pub mod parameters;
pub mod resolver;
pub mod stack;
pub mod template;
pub mod validation;
