//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Session token verification, token exchange, webhook HMAC
//! - `prompts` - Built-in prompts for every pipeline
//! - `descriptions` - Product title and description rewrites
//! - `alt_text` - Image alt text
//! - `ads` - Ad copy stored as a product metafield
//! - `pipeline` - Gated runs tying quota, selection and billing together

pub mod ads;
pub mod alt_text;
pub mod auth;
pub mod descriptions;
pub mod pipeline;
pub mod prompts;

pub use ads::{AdCopy, AdCopyTransform};
pub use alt_text::{AltTextTransform, ImageAlt};
pub use auth::{AuthError, ShopAuthService};
pub use descriptions::{DescriptionTransform, OptimizedCopy};
pub use pipeline::{Pipeline, PipelineContext, PipelineError, PipelineOutcome};
