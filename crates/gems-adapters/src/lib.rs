//! GemLedger - External Adapters
//!
//! One module per external system: the repository contents API used as the
//! blob store, the platform site (login and profile comments), and the
//! cloud-variable channel that delivers polled requests.

pub mod cloud;
pub mod github;
pub mod site;

pub use cloud::CloudChannel;
pub use github::GitHubStore;
pub use site::SiteClient;
