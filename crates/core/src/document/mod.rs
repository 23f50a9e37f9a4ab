pub mod id;
pub mod model;
pub mod reference;
pub mod validate;
