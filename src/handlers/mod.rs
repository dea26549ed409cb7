pub mod group_handlers;
pub mod health_handlers;
pub mod qr_handlers;
pub mod redirect_handlers;
pub mod stats_handlers;
