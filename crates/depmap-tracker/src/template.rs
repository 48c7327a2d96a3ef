use crate::parse::MINI_TRACKER_START_MARKER;

/// Seed template for a mini-tracker that doesn't exist yet, ending in the
/// start marker so the first write falls through the same
/// prefix/suffix-preserving path as every later rewrite.
pub fn default_mini_tracker_template(module_name: &str) -> String {
    format!(
        "# Module: {module_name}\n\n\
         ## Purpose & Responsibility\n\
         _Describe what this module is for and why it exists._\n\n\
         ## Interfaces\n\
         * `Name`: purpose\n\
         * Input: what it receives\n\
         * Output: what it produces\n\n\
         ## Implementation Notes\n\
         * Files: \n\
         * Key algorithms: \n\n\
         ## Status\n\
         * Completed: \n\
         * In progress: \n\
         * Pending: \n\n\
         ## Dependencies\n\
         {MINI_TRACKER_START_MARKER}"
    )
}
