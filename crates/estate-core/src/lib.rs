pub mod compiler;
pub mod errors;
pub mod model;
pub mod normalize;
pub mod query;
pub mod taxonomy;
pub mod util;

pub use compiler::{compile, compile_for};
pub use errors::*;
pub use model::*;
pub use query::*;
pub use taxonomy::{registry, CategoricalField, FieldOption, PropertyTypeGroup, Registry, StoredType};
