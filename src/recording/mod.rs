pub mod stats_writer;

pub use stats_writer::StatsWriter;
