use futures_util::{StreamExt, stream};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use tracing_futures::Instrument as _;

use crate::{
    Instrument, QuoteClient,
    observation_store::{ObservationStore, Observations},
    quote_client::QuoteSource,
    trend::{Trend, round_price},
};

const CONCURRENCY: usize = 4;

/// One instrument's line in a snapshot. `price` is `None` when the fetch failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub instrument: Instrument,
    pub price: Option<f64>,
    pub trend: Trend,
}

pub struct PriceTracker<Q = QuoteClient> {
    instruments: Vec<Instrument>,
    source: Q,
    store: ObservationStore,
    last: Mutex<Observations>,
}

impl<Q: QuoteSource> PriceTracker<Q> {
    /// Seeds the last-seen prices from the store.
    pub async fn load(instruments: Vec<Instrument>, source: Q, store: ObservationStore) -> Self {
        let last = store.load().await;
        info!(
            path = %store.path().display(),
            known = last.len(),
            "loaded last observed prices"
        );

        Self {
            instruments,
            source,
            store,
            last: Mutex::new(last),
        }
    }

    pub async fn last_observations(&self) -> Observations {
        self.last.lock().await.clone()
    }

    /// Fetch every instrument, derive trends against the last observation and
    /// persist the updated set. Always returns one quote per instrument.
    #[instrument(name = "snapshot", skip(self), fields(instruments = self.instruments.len()))]
    pub async fn snapshot(&self) -> Vec<Quote> {
        // held for the whole cycle so concurrent callers compare against a consistent set
        let mut last = self.last.lock().await;

        let fetched: Vec<(Instrument, Option<f64>)> = stream::iter(self.instruments.iter().cloned())
            .map(|instrument| {
                let span = tracing::info_span!("fetch", code = %instrument.code, symbol = %instrument.symbol);

                async move {
                    let price = match self.source.latest_close(&instrument.symbol).await {
                        Ok(Some(close)) => Some(round_price(close)),
                        Ok(None) => {
                            warn!("no data returned");
                            None
                        }
                        Err(e) => {
                            warn!(error = ?e, "latest_close failed");
                            None
                        }
                    };
                    (instrument, price)
                }
                .instrument(span)
            })
            .buffered(CONCURRENCY)
            .collect()
            .await;

        let mut quotes = Vec::with_capacity(fetched.len());
        for (instrument, price) in fetched {
            let trend = match price {
                Some(current) => {
                    let trend = Trend::between(last.get(&instrument.code).copied(), current);
                    last.insert(instrument.code.clone(), current);
                    trend
                }
                None => Trend::Unknown,
            };
            debug!(code = %instrument.code, ?price, ?trend, "quoted");
            quotes.push(Quote {
                instrument,
                price,
                trend,
            });
        }

        if let Err(e) = self.store.save(&last).await {
            error!(error = ?e, "failed to persist observed prices");
        }

        let available = quotes.iter().filter(|q| q.price.is_some()).count();
        info!(available, total = quotes.len(), "snapshot complete");

        quotes
    }
}
