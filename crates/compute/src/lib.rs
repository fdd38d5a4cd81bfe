// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod capability;
mod handle;
mod local;
mod relay;
mod repo;

pub use capability::*;
pub use handle::*;
pub use local::*;
pub use relay::*;
pub use repo::*;
