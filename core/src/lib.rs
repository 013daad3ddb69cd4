//! Blocking client for the Xandr (AppNexus) console REST API.
//!
//! # Overview
//! A [`Session`] logs in with username and password, keeps the returned
//! token, and attaches it to every request. Resource facades borrow the
//! session and map one method call to one HTTP request:
//!
//! | facade | endpoint |
//! |---|---|
//! | [`ReportApi`] | `/report`, `/report-download` |
//! | [`SegmentApi`] | `/segment` |
//! | [`AdvertiserApi`] | `/advertiser` |
//! | [`ProfileApi`] | `/profile` |
//! | [`InsertionOrderApi`] | `/insertion-order` |
//! | [`LineItemApi`] | `/line-item` |
//!
//! ```no_run
//! use xandr_core::{ReportDownload, Session, SessionConfig};
//!
//! # fn main() -> xandr_core::Result<()> {
//! let session = Session::new(SessionConfig::from_env()?)?;
//! session.login()?;
//!
//! let name = session.advertisers().get_name(51)?;
//! match session.reports().download("097f59fc3ab7d02c5d60db42081d9b69")? {
//!     ReportDownload::Ready(csv) => println!("{name}: {} bytes", csv.len()),
//!     other => println!("{name}: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Every operation has a `build_*` method producing a plain
//!   [`HttpRequest`]; the session runs it through a [`Transport`] and the
//!   facade decodes the [`HttpResponse`]. Request shaping is testable
//!   without a network.
//! - Facades return decoded JSON: the `response` envelope or the entity
//!   inside it. Resource documents stay `serde_json::Value`.
//! - Failures are typed ([`ApiError`]) and never swallowed.

pub mod advertiser;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod insertion_order;
pub mod line_item;
pub mod profile;
pub mod report;
pub mod segment;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use advertiser::AdvertiserApi;
pub use config::SessionConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use insertion_order::InsertionOrderApi;
pub use line_item::{assemble_line_item, LineItemApi};
pub use profile::ProfileApi;
pub use report::{submitted_report_id, ReportApi};
pub use segment::SegmentApi;
pub use session::Session;
pub use types::ReportDownload;
