pub mod directory;
pub mod navigation;
pub mod otp;
