//! Tourpack Worker
//!
//! The extraction pipeline: trigger records go through the [`EventDispatcher`], each
//! eligible archive is unpacked by the [`ArchiveExtractor`] (keys decided by the
//! [`mapper`]), the [`aggregator`] picks the notification to send and
//! [`TourProcessor`] ties it together for one invocation.

pub mod aggregator;
pub mod dispatcher;
pub mod extractor;
pub mod handler;
pub mod mapper;
pub mod setup;

pub use aggregator::{aggregate, NotificationDecision};
pub use dispatcher::EventDispatcher;
pub use extractor::ArchiveExtractor;
pub use handler::TourProcessor;
pub use mapper::{EntryMapper, EntryMapping, SkipReason};
pub use setup::{build_gateway, build_processor};
