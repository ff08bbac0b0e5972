pub mod base64;
pub mod string;
pub mod url;
