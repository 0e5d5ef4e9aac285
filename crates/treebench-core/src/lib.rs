pub mod artifact;
pub mod backend;
pub mod dataset;
pub mod error;
pub mod tensor;

pub use artifact::*;
pub use backend::*;
pub use dataset::*;
pub use error::*;
pub use tensor::*;
