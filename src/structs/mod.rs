pub mod group_request;
pub mod qr_request;
