pub mod bitmap;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod framebuffer;
pub mod presentation;
pub mod source;
pub mod surface;
pub mod processing {
    pub mod composite;
    pub mod glitch;
}
pub mod tasks {
    pub mod ticker;
}

pub use error::Error;
