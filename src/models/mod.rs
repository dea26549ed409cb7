pub mod qr_code;
pub mod qr_group;
pub mod user;

pub use qr_code::{NewQrCode, QrCode, QrCodePatch};
pub use qr_group::{GroupPatch, NewGroup, QrCodeGroup};
pub use user::User;
