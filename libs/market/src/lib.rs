mod instrument;
mod observation_store;
mod quote_client;
mod trend;

pub mod report;
pub mod tracker;

pub use instrument::Instrument;
pub use observation_store::{ObservationStore, Observations};
pub use quote_client::{Bar, QuoteClient, QuoteSource};
pub use tracker::{PriceTracker, Quote};
pub use trend::{Trend, round_price};
