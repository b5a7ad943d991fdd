//! Remote-imagery protocol abstraction
//!
//! A mini-driver is a pure strategy that turns one tile request into
//! the URL(s) a specific service understands. The block coordinator
//! depends only on the [`MiniDriver`] trait; one implementation exists
//! per protocol.

mod tms;
mod types;
mod wms;
mod worldwind;

pub use tms::TmsDriver;
pub use types::{DriverError, MiniDriver, TileRequest};
pub use wms::WmsDriver;
pub use worldwind::WorldWindDriver;
