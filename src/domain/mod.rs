pub mod feed;
pub mod props;
pub mod transfer;
