//! Backend integration.

pub mod client {
    pub use crate::client::*;
}

pub mod download {
    pub use crate::download::*;
}
