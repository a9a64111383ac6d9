//! Domain models for Shelfwise.

pub mod settings;

pub use settings::{SettingsError, SettingsUpdate, ShopSettings};
