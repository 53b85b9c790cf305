pub mod analysis;
pub mod chords;
pub mod decode;
pub mod features;
pub mod output;
