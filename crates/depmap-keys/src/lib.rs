pub mod generate;
pub mod global_map;
pub mod lookup;
pub mod validate;

pub use generate::{generate_keys, ExclusionSet};
pub use global_map::{
    global_map_dir, load_global_key_map, load_old_global_key_map, save_global_key_map,
    GLOBAL_KEY_MAP_FILENAME, OLD_GLOBAL_KEY_MAP_FILENAME,
};
pub use lookup::{get_key_from_path, get_path_from_key};
pub use validate::{sort_key_strings_hierarchically, sort_keys, validate_key};
