mod document;
mod line_map;

pub(crate) use document::document_parser;
pub(crate) use line_map::LineMap;
