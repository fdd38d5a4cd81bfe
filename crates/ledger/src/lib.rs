// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod access;
mod aggregator;
mod contexts;
mod coordinator;
mod error;
mod ledger;
mod lifecycle;
mod repo;
mod reveal;
mod reveal_writer;
mod store;
mod verifier;

pub use access::*;
pub use aggregator::*;
pub use contexts::*;
pub use coordinator::*;
pub use error::*;
pub use ledger::*;
pub use lifecycle::*;
pub use repo::*;
pub use reveal::*;
pub use reveal_writer::*;
pub use store::*;
pub use verifier::*;
