pub mod password;
pub mod retry;

pub use password::{PasswordError, hash_password};
pub use retry::{RetryPolicy, retry_on_version_conflict};
