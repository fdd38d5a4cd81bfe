// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod bus_handle;
mod event_id;
mod eventbus;
mod ids;
mod ledger_event;
pub mod prelude;
mod traits;

pub use bus_handle::*;
pub use event_id::*;
pub use eventbus::*;
pub use ids::*;
pub use ledger_event::*;
pub use traits::*;
