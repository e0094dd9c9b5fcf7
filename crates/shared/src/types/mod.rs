//! Common types used across the application.

pub mod id;
pub mod money;

pub use id::*;
pub use money::{
    MONEY_SCALE, QUANTITY_SCALE, convert_at_rate, line_total, percent_of, round_money,
    round_quantity, zero_money,
};
