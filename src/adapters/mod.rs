// Adapters layer: sinks for mapped offers.

pub mod csv;
pub mod discard;
pub mod postgres;

pub use self::csv::CsvSink;
pub use self::discard::DiscardSink;
pub use self::postgres::PostgresSink;
