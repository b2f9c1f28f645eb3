/// Built-in engine backed by whisper.cpp.
pub mod whisper;
