pub mod retry;
pub mod time;

pub use retry::RetryPolicy;
