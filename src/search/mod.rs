pub mod engine;
pub mod extract;
pub mod matcher;
pub mod suggest;
pub mod types;

#[cfg(test)]
mod tests;

pub use engine::{
    filter_by_date_range, filter_by_size, filter_by_type, get_file_path, search_by_name,
    SearchEngine,
};
pub use extract::{
    extract_pdf_text, CachingExtractor, ExtractError, PdfiumExtractor, TextExtractor,
    DEFAULT_TEXT_CACHE_SIZE,
};
pub use matcher::{highlight_text, QueryMatcher};
pub use suggest::get_search_suggestions;
pub use types::{MatchType, SearchFilters, SearchResult};
