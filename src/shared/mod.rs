pub mod constants;
pub mod form;
pub mod normalize;
pub mod test_helpers;
pub mod types;
