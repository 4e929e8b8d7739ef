//! Connection signing.
//!
//! Every connection attempt needs its own [`SignedEndpoint`]: the URL embeds
//! an HTTP-date and the server rejects signatures outside a short clock-skew
//! window, so a signed URL is never cached or reused.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use twister_eval::auth::sign_endpoint;
//! use twister_eval::config::Credentials;
//!
//! let creds = Credentials {
//!     app_id: "app".into(),
//!     api_key: "key".into(),
//!     api_secret: "secret".into(),
//!     ..Credentials::default()
//! };
//! let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
//! let endpoint = sign_endpoint(now, &creds, "GET").unwrap();
//! assert!(endpoint.url().starts_with("wss://ise-api.xfyun.cn/v2/open-ise?authorization="));
//! ```

pub mod signer;

pub use signer::{sign_endpoint, SignError, SignedEndpoint};
