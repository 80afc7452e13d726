pub mod connection;
pub mod constants;
pub mod decode;
pub mod dispatch;
pub mod encode;
pub mod scanner;
pub mod transport;
pub mod types;
pub mod wand;
