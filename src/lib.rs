//! Message-to-HTTP adapter: turn broker deliveries into declaratively mapped outbound HTTP
//! calls with distributed rate limiting, classified retries, and dead-letter escalation.
//!
//! The pipeline for one delivery is
//! [`intake`] → [`config`] lookup → [`ratelimit`] → [`compile`] → [`retry`] ⇄ [`http`] →
//! [`ack`] → acknowledgment or [`dead_letter`] escalation, with [`audit`] records emitted
//! on the side. Shared mutable state (rate limit windows, cross-delivery retry counters)
//! lives behind the [`store::CounterStore`] contract so several adapter instances can
//! share it safely.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod ack;
pub mod adapter;
pub mod audit;
pub mod compile;
pub mod config;
pub mod dead_letter;
pub mod error;
pub mod http;
pub mod intake;
pub mod model;
pub mod obs;
pub mod ratelimit;
pub mod retry;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
