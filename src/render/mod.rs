pub mod scope;
pub mod text;
