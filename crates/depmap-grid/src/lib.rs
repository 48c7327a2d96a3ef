pub mod codec;
pub mod grid;

pub use codec::{compress, decompress, get_char_at, set_char_at};
pub use grid::{
    canonical_key_order, create_initial_grid, dependencies_from_grid, format_grid_for_display,
    remove_dependency, set_dependency, validate_grid, Grid,
};
