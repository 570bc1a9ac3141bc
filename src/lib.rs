pub mod atom;
pub mod boundary;
pub mod cell;
pub mod config;
pub mod error;
pub mod io;
pub mod probe;
pub mod search;
pub mod sort;
pub mod stats;
pub mod store;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

pub use atom::{Atom, UNSET_MARKER};
pub use boundary::PeriodicBox;
pub use cell::{CellIndex, Chain};
pub use error::{AtomError, Result};
pub use io::{Format, VtkFields};
pub use probe::FieldProbe;
pub use search::{NeighborList, brute_force_nborlist};
pub use sort::{SortAxis, SortDirection};
pub use stats::{SimulationBox, Sizes};
pub use store::AtomStore;

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber. `RUST_LOG` takes precedence over
/// `level`; without either the filter defaults to `info`. Calling this more
/// than once is harmless.
pub fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_thread_ids(true)
        .try_init();
}
