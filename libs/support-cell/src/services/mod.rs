pub mod relay;

pub use relay::SupportRelay;
