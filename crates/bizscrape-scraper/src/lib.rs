pub mod dedup;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod request;
mod retry;
pub mod session;

pub use dedup::{DedupeKey, FoldOutcome, JunkFilter, RecordSet};
pub use error::{FetchError, ParseError, ScraperError, ValidationError};
pub use extract::{
    CandidateFields, ExtractionSignal, ExtractionStrategy, Extractor, HeuristicStrategy, Page,
    StructuredStrategy,
};
pub use fetch::{
    FetchController, FetchOutcome, FetchedPage, ReqwestTransport, Transport, TransportRequest,
    TransportResponse,
};
pub use request::ScrapeRequest;
pub use session::Orchestrator;
pub use tokio_util::sync::CancellationToken;
