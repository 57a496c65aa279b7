pub mod availability;
pub mod catalog;
pub mod clock;
pub mod orders;
pub mod pricing;
pub mod refund;
pub mod validation;

pub use catalog::CatalogService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use orders::{OrderPolicy, OrderService};
