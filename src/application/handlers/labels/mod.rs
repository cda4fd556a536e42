//! Area label handlers.

mod suggest_area_labels;

pub use suggest_area_labels::{build_area_label_prompt, SuggestAreaLabelsHandler};
