//! Playback: candidate URLs, their Stremio presentation and the stream proxy
//!
//! [`stream_urls`] decides which playback URLs exist for a media item and
//! whether they are routed through [`proxy::StreamProxy`]; [`public_url`]
//! decides whether a request came in over a public address at all.

pub mod presentation;
pub mod proxy;
pub mod public_url;
pub mod stream_urls;

pub use presentation::streams_for;
pub use proxy::{HttpTransport, ProxyMethod, ProxyTransport, StreamProxy};
pub use public_url::{public_base_url, public_streaming_base_url};
pub use stream_urls::{CandidateKind, OriginUrl, StreamCandidate, UrlRewrite};
