pub mod converter;
pub mod flatten;
pub mod polygon;

pub use converter::{zone_to_polygon, FlatteningConverter, ShapeConverter};
pub use polygon::{Accumulator, AccumulatorStats, Loop, LoopKind, PolygonSet};
