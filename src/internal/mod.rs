// SPDX-License-Identifier: MPL-2.0

//! Non-public solver machinery: the domain store, the compiled problem, the
//! search engine and the failure diagnoser.

pub(crate) mod diagnose;
pub(crate) mod domain;
pub(crate) mod problem;
pub(crate) mod solve;
