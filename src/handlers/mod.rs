pub mod callback_data;
pub mod callbacks;
pub mod commands;
pub mod executor;
pub mod messages;
pub mod payment_control;
pub mod utils;
