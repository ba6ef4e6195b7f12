pub mod formatter;

pub use formatter::{
    format_profile_list, format_report, format_score, format_source, format_tsv, format_weight,
    format_weights, should_use_colors,
};
