pub(crate) mod api;
pub mod auth;
pub mod backend;
pub mod error;
pub mod frontend;
pub mod http_rules;
pub mod link;
pub mod manager;
pub mod naming;
pub mod records;
pub mod redirect;
pub mod ssl;
pub mod switching;
pub mod transaction;

pub use backend::BackendSpec;
pub use error::{ManagerError, ManagerResult};
pub use link::{CertificateBundle, Credential, RouteSpec};
pub use manager::HaproxyManager;
pub use naming::Mode;
pub use transaction::Transaction;
