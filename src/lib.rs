//! `kvs-client` is an async HTTP client for the KVS key-value service.
//!
//! The service exposes typed storages (integer, unsigned, float, string,
//! map) and a few diagnostic procedures. The crate provides:
//! - [`KvsClient`] and [`Session`] for scoped connection handling
//! - [`Session::execute`], the retrying request executor
//! - generic storage operations ([`Session::put`], [`Session::get`],
//!   [`Session::delete`]) over the [`Storage`] implementations
//! - [`Session::batch`] for concurrent fan-out with per-call deadlines

mod batch;
pub mod codec;
mod error;
mod executor;
mod memo;
mod ops;
mod options;
mod result;
mod session;
mod value;

pub use batch::{with_deadline, Batch, BatchOutcome, Deadline, Deadlined};
pub use codec::{Float, Int, Map, Storage, Str, Uint};
pub use error::KvsError;
pub use executor::RawResponse;
pub use memo::Memoized;
pub use ops::{map_from_pairs, DELETED_HEADER};
pub use options::{ClientOptions, RetryPolicy, RETRYABLE_STATUSES};
pub use result::{OpResult, Params};
pub use session::{service_url, KvsClient, Session, DEFAULT_SERVICE_URL};
pub use value::{MapValue, Value};

pub type Result<T> = std::result::Result<T, KvsError>;
