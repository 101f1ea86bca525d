mod models;
mod parser;

pub use models::{Cue, CueTrack};
pub use parser::{CueParser, CueSource, SrtSource, SubtitleFormat, VttSource};
