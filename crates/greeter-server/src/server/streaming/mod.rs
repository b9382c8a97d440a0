pub mod bidi;
pub mod feeder;
