// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Upload decoding, header validation and numeric coercion

mod csv_parser;

pub use csv_parser::CsvParser;
