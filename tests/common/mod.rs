use captionviz::typeface::{GlyphMetrics, Typeface, VerticalMetrics};

include!("block_face.rs");
