pub mod bar;
pub mod bar_sequence;
pub mod tick;
