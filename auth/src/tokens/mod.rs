pub mod blacklist;
pub mod service;

pub use blacklist::TokenBlacklist;
pub use service::IssuedToken;
pub use service::TokenConfig;
pub use service::TokenService;
