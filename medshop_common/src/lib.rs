//! Value types shared by the medicine shop crates.
//!
//! * [`Money`] stores every currency amount as an integer number of minor units (paise), so that prices and
//!   totals never pass through floating point.
//! * [`Secret`] wraps credentials so that they don't leak into logs.
pub mod helpers;
mod money;

pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, DEFAULT_CURRENCY_CODE};
pub use secret::Secret;
