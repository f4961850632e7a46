//! Client-side session, request authorization and navigation guarding.
//!
//! SYSTEM CONTEXT
//! ==============
//! The document manager front end talks to its backend through one HTTP
//! pipeline. This crate owns the pieces of that client with real decision
//! logic:
//!
//! - `session`: the signed-in state (token, refresh token, user) and its
//!   durable mirror.
//! - `net`: credential injection, transport, and classification of every
//!   response into a single outcome taxonomy.
//! - `nav`: route table, navigation guard and router.
//! - `app`: wiring that turns session events into navigation.
//!
//! Storage, transport, notification rendering and navigation are capability
//! traits so the core runs without a browser.

pub mod app;
pub mod auth;
pub mod config;
pub mod events;
pub mod nav;
pub mod net;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::{App, AppShell};
pub use auth::{AuthClient, AuthError, Credentials, RegisterRequest};
pub use config::{ClientConfig, ConfigError};
pub use events::{SessionEvent, SessionEvents};
pub use nav::guard::{NavigationGuard, Verdict};
pub use nav::router::{Navigation, Router};
pub use nav::routes::{RouteMatch, RouteRecord, RouteTable};
pub use nav::NavigationSink;
pub use net::classify::{ApiError, Effect, ErrorClassifier, FailureClass, Outcome};
pub use net::messages::{Locale, Notice, NoticeLevel, Notifier, TracingNotifier};
pub use net::pipeline::HttpPipeline;
pub use net::transport::{HttpTransport, Transport, TransportError};
pub use net::types::{Method, RawResponse, RequestDescriptor};
pub use session::types::{Session, User, UserPatch};
pub use session::{SessionError, SessionStore};
pub use storage::file::FileStore;
pub use storage::{KeyValueStore, MemoryStore, StorageError};
