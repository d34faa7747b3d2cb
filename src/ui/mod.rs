/// Presentation helpers that carry no rendering of their own

pub mod slider;
