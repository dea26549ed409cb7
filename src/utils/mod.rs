pub mod jwt;
pub mod short_code;
pub mod validation;
